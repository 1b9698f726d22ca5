//! Per-request context.
//!
//! One [`Context`] is created when a request arrives and handed to the
//! handler, the reply builder and the error translator. It owns the request's
//! trace id, its single [`RequestLogger`] and the slot the finished response
//! is written into. Cloning is cheap; every clone sees the same state.

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::config::Config;
use crate::logger::{RequestLogger, RequestSnapshot};
use crate::request::Request;
use crate::response::Response;
use crate::sink::LogSink;

/// Name given to a logger created by [`Context::logger`].
pub const DEFAULT_LOGGER_NAME: &str = "logger.application";

/// Settings shared by every request of one [`App`](crate::App).
pub(crate) struct Shared {
    pub(crate) config: Config,
    pub(crate) sink: Arc<dyn LogSink>,
}

/// State for one request/response cycle.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

struct Inner {
    shared: Arc<Shared>,
    trace_id: String,
    request: Request,
    logger: OnceLock<RequestLogger>,
    slot: Arc<ResponseSlot>,
}

impl Context {
    pub(crate) fn new(req: &Request, shared: Arc<Shared>) -> Self {
        Self {
            inner: Arc::new(Inner {
                shared,
                trace_id: Uuid::new_v4().to_string(),
                request: req.clone(),
                logger: OnceLock::new(),
                slot: Arc::new(ResponseSlot::default()),
            }),
        }
    }

    /// The request's trace identifier (UUID v4), also sent as `Trace-ID`.
    pub fn trace_id(&self) -> &str {
        &self.inner.trace_id
    }

    pub fn config(&self) -> &Config {
        &self.inner.shared.config
    }

    /// The request's logger, created on first use as `logger.application`.
    pub fn logger(&self) -> &RequestLogger {
        self.logger_named(DEFAULT_LOGGER_NAME)
    }

    /// The request's logger, created on first use under `name`.
    ///
    /// Once a logger exists, `name` is ignored: there is exactly one logger
    /// per request.
    pub fn logger_named(&self, name: &str) -> &RequestLogger {
        self.inner.logger.get_or_init(|| {
            let ignored = &self.inner.shared.config.ignored_headers;
            let snapshot = RequestSnapshot::capture(&self.inner.request, ignored);
            RequestLogger::new(
                Arc::new(snapshot),
                Arc::clone(&self.inner.slot),
                Arc::clone(&self.inner.shared.sink),
                name,
                self.inner.trace_id.clone(),
            )
        })
    }

    /// `true` once a response has been sent for this request.
    pub fn is_sent(&self) -> bool {
        self.inner.slot.is_sent()
    }

    /// The response sent for this request, if any.
    pub fn response(&self) -> Option<Response> {
        self.inner.slot.response()
    }

    pub(crate) fn slot(&self) -> &ResponseSlot {
        &self.inner.slot
    }
}

// ── ResponseSlot ─────────────────────────────────────────────────────────────

/// Where the one response of a request lands.
#[derive(Default)]
pub(crate) struct ResponseSlot {
    state: Mutex<SlotState>,
}

#[derive(Default)]
struct SlotState {
    response: Option<Response>,
    body: Option<Value>,
}

impl ResponseSlot {
    pub(crate) fn is_sent(&self) -> bool {
        self.state.lock().response.is_some()
    }

    /// Stores `response` unless one was already stored. Returns whether it did.
    pub(crate) fn fill(&self, response: Response, body: Value) -> bool {
        let mut state = self.state.lock();
        if state.response.is_some() {
            return false;
        }
        state.response = Some(response);
        state.body = Some(body);
        true
    }

    pub(crate) fn response(&self) -> Option<Response> {
        self.state.lock().response.clone()
    }

    /// `{StatusCode, Headers, Body}` as the request log records it.
    pub(crate) fn snapshot(&self) -> Value {
        let state = self.state.lock();
        let Some(res) = &state.response else {
            return json!({"StatusCode": 200, "Headers": {}, "Body": {}});
        };
        let headers: Map<String, Value> = res
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        json!({
            "StatusCode": res.status,
            "Headers": headers,
            "Body": state.body.clone().unwrap_or_else(|| json!({})),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::sink::MemorySink;

    /// A context for `method url` with the given headers and body, logging into `sink`.
    pub(crate) fn context(
        method: &str,
        url: &str,
        headers: &[(&str, &str)],
        body: &str,
        config: Config,
        sink: &MemorySink,
    ) -> Context {
        let mut builder = http::Request::builder().method(method).uri(url);
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        let (parts, ()) = builder.body(()).unwrap().into_parts();
        let req = Request::new(
            parts,
            Bytes::from(body.to_owned()),
            Default::default(),
            Some("10.0.0.7:4242".parse().unwrap()),
        );
        let shared = Arc::new(Shared { config, sink: Arc::new(sink.clone()) });
        Context::new(&req, shared)
    }

    #[test]
    fn requests_that_never_log_build_no_logger() {
        let sink = MemorySink::new();
        let ctx = context("POST", "/", &[], r#"{"big":"payload"}"#, Config::new(), &sink);
        assert!(ctx.inner.logger.get().is_none());

        crate::reply::reply(&ctx).json(["done"]).unwrap();
        assert!(ctx.inner.logger.get().is_none());

        assert_eq!(ctx.logger().get("RemoteAddress"), "10.0.0.7");
        assert!(ctx.inner.logger.get().is_some());
    }

    #[test]
    fn logger_is_created_once_per_context() {
        let sink = MemorySink::new();
        let ctx = context("GET", "/", &[], "", Config::new(), &sink);
        let first = ctx.logger_named("orders") as *const RequestLogger;
        let second = ctx.clone().logger() as *const RequestLogger;
        assert_eq!(first, second);
        assert_eq!(ctx.logger().get("Name"), "orders");
        assert_eq!(ctx.logger().get("TraceID"), ctx.trace_id());
    }

    #[test]
    fn slot_accepts_a_single_response() {
        let slot = ResponseSlot::default();
        assert!(!slot.is_sent());
        assert!(slot.fill(Response::new(201, vec![], Bytes::new()), json!({"a": 1})));
        assert!(!slot.fill(Response::new(500, vec![], Bytes::new()), json!({})));
        assert_eq!(slot.response().unwrap().status(), 201);
        assert_eq!(slot.snapshot()["Body"], json!({"a": 1}));
    }
}
