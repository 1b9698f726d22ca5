//! Fluent response builder.
//!
//! ```rust,no_run
//! use mortar::{Context, Error, Request, reply};
//! use serde_json::json;
//!
//! async fn create_user(_req: Request, ctx: Context) -> Result<(), Error> {
//!     reply(&ctx)
//!         .status(201)
//!         .set("location", "/users/99")
//!         .json(json!({"id": 99}))?;
//!     Ok(())
//! }
//! ```
//!
//! A request gets at most one response. The first `send`/`json` wins; later
//! ones are silently ignored unless the reply is strict (see
//! [`Config::strict_reply`](crate::Config::strict_reply)), in which case they
//! return [`ReplyError::AlreadySent`].

use bytes::Bytes;
use serde::Serialize;
use serde_json::json;

use crate::context::Context;
use crate::error::Error;
use crate::response::{ContentType, Payload, Response};

/// Header carrying the request's trace id on every response.
pub const TRACE_ID_HEADER: &str = "Trace-ID";

#[derive(Debug, thiserror::Error)]
pub enum ReplyError {
    #[error("response already sent")]
    AlreadySent,

    #[error("unable to serialize response body: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<ReplyError> for Error {
    fn from(e: ReplyError) -> Self {
        Error::opaque(e)
    }
}

/// Starts a [`Reply`] for the request behind `ctx`.
pub fn reply(ctx: &Context) -> Reply {
    Reply::new(ctx)
}

/// Builder for the single response of a request.
///
/// Defaults to `200`, no extra headers and an empty JSON object body.
#[must_use = "a Reply does nothing until `send` or `json` is called"]
pub struct Reply {
    ctx: Context,
    status: u16,
    headers: Vec<(String, String)>,
    body: Option<Payload>,
    strict: bool,
}

impl Reply {
    pub fn new(ctx: &Context) -> Self {
        Self {
            ctx: ctx.clone(),
            status: 200,
            headers: Vec::new(),
            body: None,
            strict: ctx.config().strict_reply,
        }
    }

    pub fn status(mut self, code: u16) -> Self {
        self.status = code;
        self
    }

    /// Replaces every header set so far.
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers = headers.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self
    }

    /// Sets one header, replacing any value it had.
    pub fn set(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_owned(), value.into()));
        self
    }

    pub fn unset(mut self, name: &str) -> Self {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self
    }

    /// Sets the body: a JSON value, text, or raw bytes.
    pub fn body(mut self, body: impl Into<Payload>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets a raw body with an explicit content type (XML, HTML, SSE, ...).
    pub fn bytes(mut self, content_type: ContentType, body: impl Into<Bytes>) -> Self {
        self.body = Some(Payload::Raw(content_type, body.into()));
        self
    }

    /// Overrides the configured strictness for this reply.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_sent(&self) -> bool {
        self.ctx.is_sent()
    }

    /// Serializes `body` as JSON and sends.
    pub fn json<T: Serialize>(self, body: T) -> Result<(), ReplyError> {
        if self.ctx.is_sent() {
            return self.already_sent();
        }
        match serde_json::to_value(body) {
            Ok(value) => self.body(value).send(),
            Err(e) => self.failed(e.into()),
        }
    }

    /// Sends the response. Only the first send of a request is written.
    pub fn send(self) -> Result<(), ReplyError> {
        if self.ctx.is_sent() {
            return self.already_sent();
        }

        let payload = self.body.clone().unwrap_or_else(|| Payload::Json(json!({})));
        let snapshot = payload.snapshot();
        let content_type = payload.content_type();
        let body = match payload.into_bytes() {
            Ok(body) => body,
            Err(e) => return self.failed(e.into()),
        };

        let mut headers = Vec::with_capacity(self.headers.len() + 2);
        if !self.headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("content-type")) {
            headers.push(("content-type".to_owned(), content_type.as_str().to_owned()));
        }
        headers.extend(
            self.headers
                .iter()
                .filter(|(k, _)| !k.eq_ignore_ascii_case(TRACE_ID_HEADER))
                .cloned(),
        );
        headers.push((TRACE_ID_HEADER.to_owned(), self.ctx.trace_id().to_owned()));

        let response = Response::new(self.status, headers, body);
        if !self.ctx.slot().fill(response, snapshot) {
            return self.already_sent();
        }
        Ok(())
    }

    fn already_sent(&self) -> Result<(), ReplyError> {
        if self.strict {
            return Err(ReplyError::AlreadySent);
        }
        tracing::debug!(trace_id = self.ctx.trace_id(), "response already sent, ignoring");
        Ok(())
    }

    fn failed(&self, e: ReplyError) -> Result<(), ReplyError> {
        if self.strict {
            return Err(e);
        }
        tracing::warn!(trace_id = self.ctx.trace_id(), error = %e, "unable to send response");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;
    use crate::config::Config;
    use crate::context::tests::context;
    use crate::sink::MemorySink;

    fn ctx(config: Config) -> Context {
        context("GET", "/", &[], "", config, &MemorySink::new())
    }

    #[test]
    fn send_writes_status_headers_and_trace_id() {
        let ctx = ctx(Config::new());
        reply(&ctx)
            .status(202)
            .headers([("x-a", "1"), ("x-b", "2")])
            .set("x-a", "3")
            .unset("x-b")
            .body(json!({"queued": true}))
            .send()
            .unwrap();

        let res = ctx.response().unwrap();
        assert_eq!(res.status(), 202);
        assert_eq!(res.header("x-a"), Some("3"));
        assert_eq!(res.header("x-b"), None);
        assert_eq!(res.header("content-type"), Some("application/json"));
        assert_eq!(res.header("trace-id"), Some(ctx.trace_id()));
        assert_eq!(res.body(), br#"{"queued":true}"#);
    }

    #[test]
    fn second_send_is_a_no_op() {
        let ctx = ctx(Config::new());
        reply(&ctx).status(200).json(json!({"n": 1})).unwrap();
        reply(&ctx).status(500).json(json!({"n": 2})).unwrap();

        assert!(reply(&ctx).is_sent());
        let res = ctx.response().unwrap();
        assert_eq!(res.status(), 200);
        assert_eq!(res.body(), br#"{"n":1}"#);
    }

    #[test]
    fn strict_replies_report_double_sends() {
        let ctx = ctx(Config::new().strict_reply(true));
        reply(&ctx).send().unwrap();
        assert!(matches!(reply(&ctx).send(), Err(ReplyError::AlreadySent)));
        assert!(reply(&ctx).strict(false).send().is_ok());
    }

    #[test]
    fn empty_body_defaults_to_json_object() {
        let ctx = ctx(Config::new());
        reply(&ctx).status(204).send().unwrap();
        assert_eq!(ctx.response().unwrap().body(), b"{}");
    }

    #[test]
    fn raw_bodies_keep_their_content_type() {
        let ctx = ctx(Config::new());
        reply(&ctx).bytes(ContentType::Xml, "<ok/>").send().unwrap();
        let res = ctx.response().unwrap();
        assert_eq!(res.header("content-type"), Some("application/xml"));
        assert_eq!(res.body(), b"<ok/>");
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("nope"))
        }
    }

    #[test]
    fn serialization_failures_only_surface_when_strict() {
        let lenient = ctx(Config::new());
        assert!(reply(&lenient).json(Unserializable).is_ok());
        assert!(!lenient.is_sent());

        let strict = ctx(Config::new().strict_reply(true));
        assert!(matches!(reply(&strict).json(Unserializable), Err(ReplyError::Serialize(_))));
    }

    #[test]
    fn json_accepts_any_serializable_value() {
        let ctx = ctx(Config::new());
        let body: BTreeMap<&str, u32> = [("a", 1)].into_iter().collect();
        reply(&ctx).json(body).unwrap();
        assert_eq!(ctx.response().unwrap().body(), br#"{"a":1}"#);
    }
}
