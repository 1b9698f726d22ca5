//! The application handle.
//!
//! An [`App`] owns the route table and the per-request settings. It is the
//! value module installers receive, so it is cheap to clone and every clone
//! registers into the same table, even from installers running concurrently.
//!
//! Each request runs through three stages:
//!
//! ```text
//! handler ──proceed──────────────────────────► fallback ──► response
//!    └─────fail──► error translator ─proceed──┘
//! ```
//!
//! The fallback only acts when nothing has been sent yet: a request that
//! proceeded gets `404`, one whose error was never answered gets `500`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::Method;
use parking_lot::RwLock;

use crate::config::Config;
use crate::context::{Context, Shared};
use crate::error::HttpError;
use crate::handler::Handler;
use crate::middleware::{ErrorHandler, Flow, Next};
use crate::reply::reply;
use crate::request::Request;
use crate::response::Response;
use crate::router::{RouteError, Router};
use crate::sink::{LogSink, StdoutSink};

#[derive(Clone)]
pub struct App {
    inner: Arc<Inner>,
}

struct Inner {
    router: RwLock<Router>,
    shared: Arc<Shared>,
    errors: ErrorHandler,
}

impl App {
    /// An app whose request logs go to standard output.
    pub fn new(config: Config) -> Self {
        Self::with_sink(config, StdoutSink)
    }

    pub fn with_sink(config: Config, sink: impl LogSink) -> Self {
        let errors = ErrorHandler::new(config.quiet);
        Self {
            inner: Arc::new(Inner {
                router: RwLock::new(Router::new()),
                shared: Arc::new(Shared { config, sink: Arc::new(sink) }),
                errors,
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.shared.config
    }

    /// Registers one route.
    pub fn route(&self, method: Method, path: &str, handler: impl Handler) -> Result<&Self, RouteError> {
        self.inner.router.write().add(method, path, handler.into_boxed_handler())?;
        Ok(self)
    }

    /// Mounts every route of `router` under `prefix`.
    pub fn nest(&self, prefix: &str, router: Router) -> Result<&Self, RouteError> {
        self.inner.router.write().merge(prefix, router)?;
        Ok(self)
    }

    /// Number of registered routes.
    pub fn routes(&self) -> usize {
        self.inner.router.read().len()
    }

    /// Runs one request through the app and returns its response.
    pub async fn dispatch(&self, req: http::Request<Bytes>, remote_addr: Option<SocketAddr>) -> Response {
        let (parts, body) = req.into_parts();
        let found = self.inner.router.read().lookup(&parts.method, parts.uri.path());
        let (handler, params) = match found {
            Some((handler, params)) => (Some(handler), params),
            None => (None, HashMap::new()),
        };

        let request = Request::new(parts, body, params, remote_addr);
        let ctx = Context::new(&request, Arc::clone(&self.inner.shared));

        let flow = match handler {
            Some(handler) => {
                let next = Next::new();
                let outcome = next.fork();
                handler.call(request, ctx.clone(), next).await;
                outcome.take()
            }
            None => Some(Flow::Continue),
        };

        let flow = match flow {
            Some(Flow::Fail(err)) => {
                let next = Next::new();
                let outcome = next.fork();
                self.inner.errors.handle(err, &ctx, next);
                outcome.take()
            }
            other => other,
        };

        fallback(&ctx, flow);
        ctx.response()
            .unwrap_or_else(|| Response::new(500, Vec::new(), Bytes::new()))
    }
}

fn fallback(ctx: &Context, flow: Option<Flow>) {
    if ctx.is_sent() {
        return;
    }
    let status = match flow {
        Some(Flow::Continue) => 404,
        Some(Flow::Fail(err)) => {
            tracing::error!(trace_id = ctx.trace_id(), error = %err, "unhandled request error");
            500
        }
        None => {
            tracing::warn!(trace_id = ctx.trace_id(), "handler finished without a response");
            500
        }
    };
    let http = HttpError::from_status(status);
    if let Err(e) = reply(ctx).status(status).strict(false).json(&http) {
        tracing::warn!(trace_id = ctx.trace_id(), error = %e, "unable to send fallback response");
    }
}
