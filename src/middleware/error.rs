//! Centralized error-to-response translation.

use crate::context::Context;
use crate::error::Error;
use crate::middleware::Next;
use crate::reply::reply;

/// Turns a failed request into a `{code, message}` JSON response.
///
/// Every [`App`](crate::App) runs one. After answering, it logs the error at
/// `ERROR` through the request logger and flushes the record (unless the
/// configuration is quiet), then resumes the chain so the fallback stage
/// still runs and finds the response already sent.
#[derive(Clone, Copy, Debug, Default)]
pub struct ErrorHandler {
    quiet: bool,
}

impl ErrorHandler {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn handle(&self, err: Error, ctx: &Context, next: Next) {
        tracing::debug!(trace_id = ctx.trace_id(), error = %err, "catch error");

        let http = err.to_http();
        if let Err(e) = reply(ctx).status(http.status).json(&http) {
            tracing::warn!(trace_id = ctx.trace_id(), error = %e, "unable to send error response");
        }

        if !self.quiet {
            let log = ctx.logger();
            log.error(err.to_string());
            log.flush();
        }

        next.proceed();
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::config::Config;
    use crate::context::tests::context;
    use crate::logger::Level;
    use crate::middleware::Flow;
    use crate::sink::MemorySink;

    fn body(ctx: &Context) -> Value {
        serde_json::from_slice(ctx.response().unwrap().body()).unwrap()
    }

    #[test]
    fn opaque_errors_become_generic_500s() {
        let sink = MemorySink::new();
        let ctx = context("GET", "/", &[], "", Config::new(), &sink);
        ErrorHandler::new(false).handle(Error::opaque("db password is hunter2"), &ctx, Next::new());

        assert_eq!(ctx.response().unwrap().status(), 500);
        assert_eq!(body(&ctx), json!({"code": "server.error", "message": "Internal Server Error"}));

        let record = &sink.records()[0];
        assert_eq!(record["Traces"][0]["Message"], "db password is hunter2");
        assert_eq!(record["Response"]["StatusCode"], 500);
    }

    #[test]
    fn http_errors_are_sent_verbatim_and_logged_once() {
        let sink = MemorySink::new();
        let ctx = context("GET", "/users/9", &[], "", Config::new(), &sink);
        let next = Next::new();
        let outcome = next.fork();
        ErrorHandler::new(false).handle(Error::http(404, "not.found", "Not Found"), &ctx, next);

        assert_eq!(ctx.response().unwrap().status(), 404);
        assert_eq!(body(&ctx), json!({"code": "not.found", "message": "Not Found"}));

        let errors: Vec<_> = ctx.logger().traces().into_iter().filter(|t| t.level == Level::Error).collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(sink.lines().len(), 1);
        assert!(matches!(outcome.take(), Some(Flow::Continue)));
    }

    #[test]
    fn status_errors_keep_their_status() {
        let sink = MemorySink::new();
        let ctx = context("GET", "/", &[], "", Config::new(), &sink);
        ErrorHandler::new(false).handle(Error::with_status(409, "version mismatch"), &ctx, Next::new());

        assert_eq!(ctx.response().unwrap().status(), 409);
        assert_eq!(body(&ctx), json!({"code": "conflict", "message": "Conflict"}));
    }

    #[test]
    fn quiet_mode_skips_logging() {
        let sink = MemorySink::new();
        let ctx = context("GET", "/", &[], "", Config::new(), &sink);
        ErrorHandler::new(true).handle(Error::opaque("boom"), &ctx, Next::new());

        assert!(ctx.is_sent());
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn an_already_sent_response_is_left_alone() {
        let sink = MemorySink::new();
        let ctx = context("GET", "/", &[], "", Config::new(), &sink);
        reply(&ctx).status(200).json(json!({"ok": true})).unwrap();
        ErrorHandler::new(false).handle(Error::opaque("late"), &ctx, Next::new());

        assert_eq!(ctx.response().unwrap().status(), 200);
        assert_eq!(sink.records()[0]["Traces"][0]["Level"], "ERROR");
    }
}
