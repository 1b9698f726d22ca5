//! Built-in Kubernetes health-check module.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can the pod serve traffic? Failure → pulled from load-balancer. |
//!
//! Register it with the rest of your modules:
//!
//! ```rust,no_run
//! use mortar::{App, Config, Loader, health};
//!
//! # async fn run() -> Result<(), mortar::LoadError> {
//! let app = App::new(Config::new());
//! Loader::new(app).register([health::module()]).load::<&str>(&[]).await?;
//! # Ok(())
//! # }
//! ```
//!
//! Need readiness to gate on a database or a downstream service? Write your
//! own module with the same routes and register it instead of this one.

use http::Method;

use crate::app::App;
use crate::context::Context;
use crate::error::{BoxError, Error};
use crate::handler::handle;
use crate::module::Module;
use crate::reply::reply;
use crate::request::Request;

pub const NAME: &str = "health";

/// A module named `health` serving `/healthz` and `/readyz`.
pub fn module() -> Module {
    Module::new(NAME, install)
}

async fn install(app: App) -> Result<(), BoxError> {
    app.route(Method::GET, "/healthz", handle(liveness))?
        .route(Method::GET, "/readyz", handle(readiness))?;
    Ok(())
}

/// Always `200 OK` with body `"ok"`. If the process can answer HTTP at all,
/// it is alive.
pub async fn liveness(_req: Request, ctx: Context) -> Result<(), Error> {
    reply(&ctx).body("ok").send()?;
    Ok(())
}

pub async fn readiness(_req: Request, ctx: Context) -> Result<(), Error> {
    reply(&ctx).body("ready").send()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::config::Config;
    use crate::loader::Loader;
    use crate::sink::MemorySink;

    #[tokio::test]
    async fn probes_answer_with_plain_text() {
        let app = App::with_sink(Config::new(), MemorySink::new());
        Loader::new(app.clone()).register([module()]).load(&[NAME]).await.unwrap();

        for (path, expected) in [("/healthz", "ok"), ("/readyz", "ready")] {
            let req = http::Request::get(path).body(Bytes::new()).unwrap();
            let res = app.dispatch(req, None).await;
            assert_eq!(res.status(), 200);
            assert_eq!(res.body(), expected.as_bytes());
            assert!(res.header("content-type").unwrap().starts_with("text/plain"));
        }
    }
}
