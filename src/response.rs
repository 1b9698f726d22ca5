//! Outgoing HTTP response type and the payloads a [`Reply`](crate::Reply) can carry.
//!
//! You should not need to build a [`Response`] by hand. Handlers send through
//! [`Reply`](crate::Reply), which stores the finished response in the request's
//! [`Context`](crate::Context); the server picks it up from there.

use bytes::Bytes;
use http::{HeaderName, HeaderValue, StatusCode};
use http_body_util::Full;
use serde_json::Value;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`Reply::bytes`](crate::Reply::bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentType {
    Csv,          // text/csv
    EventStream,  // text/event-stream  (SSE)
    FormData,     // application/x-www-form-urlencoded
    Html,         // text/html; charset=utf-8
    Json,         // application/json
    MsgPack,      // application/msgpack
    OctetStream,  // application/octet-stream  (binary / file download)
    Pdf,          // application/pdf
    Text,         // text/plain; charset=utf-8
    Xml,          // application/xml
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv         => "text/csv",
            Self::EventStream => "text/event-stream",
            Self::FormData    => "application/x-www-form-urlencoded",
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::MsgPack     => "application/msgpack",
            Self::OctetStream => "application/octet-stream",
            Self::Pdf         => "application/pdf",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Xml         => "application/xml",
        }
    }
}

// ── Payload ───────────────────────────────────────────────────────────────────

/// A response body before it is written.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// Serialized as `application/json`.
    Json(Value),
    /// Sent as-is with the given content type.
    Raw(ContentType, Bytes),
}

impl Payload {
    /// What the request log records for this body.
    pub(crate) fn snapshot(&self) -> Value {
        match self {
            Self::Json(v) => v.clone(),
            Self::Raw(_, bytes) if bytes.is_empty() => Value::Object(Default::default()),
            Self::Raw(_, bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    pub(crate) fn content_type(&self) -> ContentType {
        match self {
            Self::Json(_) => ContentType::Json,
            Self::Raw(ct, _) => *ct,
        }
    }

    pub(crate) fn into_bytes(self) -> Result<Bytes, serde_json::Error> {
        match self {
            Self::Json(v) => serde_json::to_vec(&v).map(Bytes::from),
            Self::Raw(_, bytes) => Ok(bytes),
        }
    }
}

impl From<Value> for Payload {
    fn from(v: Value) -> Self { Self::Json(v) }
}

impl From<&'static str> for Payload {
    fn from(s: &'static str) -> Self { Self::Raw(ContentType::Text, Bytes::from_static(s.as_bytes())) }
}

impl From<String> for Payload {
    fn from(s: String) -> Self { Self::Raw(ContentType::Text, Bytes::from(s)) }
}

impl From<Vec<u8>> for Payload {
    fn from(b: Vec<u8>) -> Self { Self::Raw(ContentType::OctetStream, Bytes::from(b)) }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// A finished HTTP response.
#[derive(Clone, Debug)]
pub struct Response {
    pub(crate) status: u16,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Bytes,
}

impl Response {
    pub(crate) fn new(status: u16, headers: Vec<(String, String)>, body: Bytes) -> Self {
        Self { status, headers, body }
    }

    pub fn status(&self) -> u16 { self.status }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Converts into the hyper response type.
    ///
    /// Header pairs that are not valid HTTP are dropped with a warning; an
    /// out-of-range status becomes `500`.
    pub fn into_inner(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(self.body));
        *res.status_mut() = StatusCode::from_u16(self.status)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let headers = res.headers_mut();
        for (name, value) in self.headers {
            match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
                (Ok(n), Ok(v)) => {
                    headers.append(n, v);
                }
                _ => tracing::warn!(header = %name, "dropping invalid response header"),
            }
        }
        res
    }
}
