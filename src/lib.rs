//! # mortar
//!
//! Glue for modular HTTP services: request-scoped logging, a response
//! builder, error translation, and a loader that installs named modules
//! into an app concurrently.
//!
//! ## The pieces
//!
//! - [`App`] owns routes and settings; [`Server`] serves it over hyper.
//! - [`Module`] is a named installer; [`Loader`] picks which modules run
//!   (with a `MODULES` environment override) and installs them in phases.
//! - [`Context`] travels with every request and carries the trace id, the
//!   [`RequestLogger`] and the response slot.
//! - [`reply`] builds and sends the one response a request gets.
//! - [`handle`] and [`handle_next`] turn async functions into handlers whose
//!   errors reach the [`ErrorHandler`] instead of vanishing.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::Method;
//! use mortar::{App, BoxError, Config, Context, Error, Loader, Module, Request, Server, handle, health, reply};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), BoxError> {
//!     let app = App::new(Config::from_env()?);
//!
//!     let users = Module::new("users", |app: App| async move {
//!         app.route(Method::GET, "/users/{id}", handle(get_user))?;
//!         Ok::<(), BoxError>(())
//!     });
//!
//!     Loader::new(app.clone())
//!         .register([users, health::module()])
//!         .load::<&str>(&[])
//!         .await?;
//!
//!     Server::bind(([0, 0, 0, 0], 3000).into()).serve(app).await?;
//!     Ok(())
//! }
//!
//! async fn get_user(req: Request, ctx: Context) -> Result<(), Error> {
//!     let id = req.param("id").unwrap_or_default();
//!     ctx.logger().info(format!("looking up user {id}"));
//!     reply(&ctx).json(serde_json::json!({ "id": id }))?;
//!     Ok(())
//! }
//! ```

mod app;
mod config;
mod context;
mod error;
mod handler;
mod loader;
mod logger;
mod module;
mod reply;
mod request;
mod response;
mod router;
mod server;
mod sink;
mod status;

pub mod health;
pub mod metadata;
pub mod middleware;

pub use app::App;
pub use config::Config;
pub use context::{Context, DEFAULT_LOGGER_NAME};
pub use error::{BoxError, Error, HttpError, ResultExt};
pub use handler::{Handle, HandleNext, Handler, handle, handle_next};
pub use loader::{LoadError, Loader};
pub use logger::{Level, MASK, RequestLogger, TraceEntry};
pub use middleware::{ErrorHandler, Next};
pub use module::{BuildError, InstallFuture, Module, ModuleBuilder};
pub use reply::{Reply, ReplyError, TRACE_ID_HEADER, reply};
pub use request::Request;
pub use response::{ContentType, Payload, Response};
pub use router::{RouteError, Router};
pub use server::Server;
pub use sink::{LogSink, MemorySink, StdoutSink, TracingSink};
