//! Minimal mortar example: a users module, the health module, request logs.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl http://localhost:3000/users/0
//!   curl -X POST http://localhost:3000/users \
//!        -H 'content-type: application/json' \
//!        -H 'authorization: Bearer secret' \
//!        -d '{"name":"alice","password":"hunter2"}'
//!   curl http://localhost:3000/healthz
//!
//! Load only some modules:
//!   MODULES=health cargo run --example basic

use http::Method;
use mortar::{
    App, BoxError, Config, Context, Error, Loader, Module, Next, Request, Server, handle,
    handle_next, health, reply,
};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct CreateUser {
    name: String,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt::init();

    let app = App::new(Config::from_env()?);

    let users = Module::new("users", |app: App| async move {
        app.route(Method::GET, "/users/{id}", handle(get_user))?
            .route(Method::POST, "/users", handle(create_user))?
            .route(Method::DELETE, "/users/{id}", handle_next(delete_user))?;
        Ok::<(), BoxError>(())
    });

    let installed = Loader::new(app.clone())
        .register([users, health::module()])
        .load_phased(&["users"], &[health::NAME])
        .await?;
    tracing::info!(?installed, "modules installed");

    Server::bind(([0, 0, 0, 0], 3000).into()).serve(app).await?;
    Ok(())
}

// GET /users/{id}
async fn get_user(req: Request, ctx: Context) -> Result<(), Error> {
    let id: u64 = req.param("id").unwrap_or_default().parse().map_err(|e| Error::with_status(400, e))?;
    if id == 0 {
        return Err(Error::http(404, "user.not_found", "there is no user 0"));
    }

    ctx.logger().with([("userId", id.to_string())], true).info("user fetched");
    reply(&ctx).json(json!({ "id": id, "name": "alice" }))?;
    ctx.logger().flush();
    Ok(())
}

// POST /users
async fn create_user(req: Request, ctx: Context) -> Result<(), Error> {
    let input: CreateUser = req.json()?;

    ctx.logger()
        .mask(["Request.Headers.authorization", "Request.Body.password"], true)
        .info(format!("creating {}", input.name));
    reply(&ctx)
        .status(201)
        .set("location", "/users/99")
        .json(json!({ "id": 99, "name": input.name }))?;
    ctx.logger().flush();
    Ok(())
}

// DELETE /users/{id} → 204, then hands on so later stages could audit it.
async fn delete_user(_req: Request, ctx: Context, next: Next) -> Result<(), Error> {
    reply(&ctx).status(204).body("").send()?;
    next.proceed();
    Ok(())
}
