//! Request-scoped structured logger.
//!
//! A [`RequestLogger`] collects trace entries while a request is handled and
//! writes a single JSON record when it is flushed:
//!
//! ```json
//! {
//!   "Name": "logger.application",
//!   "TraceID": "7f1c…",
//!   "RemoteAddress": "203.0.113.9",
//!   "Request":  {"Method": "POST", "Url": "/users?x=1", "Headers": {…}, "Body": {…}},
//!   "Response": {"StatusCode": 201, "Headers": {…}, "Body": {…}},
//!   "Duration": 12,
//!   "Traces": [{"Level": "INFO", "Message": "created", "Duration": 3}]
//! }
//! ```
//!
//! Each trace's `Duration` is the gap in milliseconds since the previous log
//! call (or since the logger was created); the top-level `Duration` is the
//! whole span up to the flush.
//!
//! Obtain the logger through [`Context::logger`](crate::Context::logger).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value, json};
use tokio::time::Instant;

use crate::context::ResponseSlot;
use crate::metadata;
use crate::request::Request;
use crate::sink::LogSink;

/// Replacement written over masked values.
pub const MASK: &str = "******";

// ── Trace entries ─────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Debug => "DEBUG",
            Self::Info  => "INFO",
            Self::Warn  => "WARN",
            Self::Error => "ERROR",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TraceEntry {
    pub level: Level,
    pub message: Value,
    /// Milliseconds since the previous entry.
    pub duration: u64,
}

// ── Request snapshot ──────────────────────────────────────────────────────────

/// What the log records about the inbound request.
pub(crate) struct RequestSnapshot {
    method: String,
    url: String,
    headers: Map<String, Value>,
    body: Value,
    remote_address: String,
}

impl RequestSnapshot {
    pub(crate) fn capture(req: &Request, ignored_headers: &[String]) -> Self {
        let mut headers = Map::new();
        for name in req.headers().keys() {
            if ignored_headers.iter().any(|i| i.eq_ignore_ascii_case(name.as_str())) {
                continue;
            }
            let joined = req
                .headers()
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(", ");
            headers.insert(name.as_str().to_owned(), Value::String(joined));
        }

        Self {
            method: req.method().as_str().to_owned(),
            url: req.url().to_owned(),
            headers,
            body: body_value(req.body()),
            remote_address: remote_address(req),
        }
    }

    fn to_value(&self) -> Value {
        json!({
            "Method": self.method,
            "Url": self.url,
            "Headers": self.headers,
            "Body": self.body,
        })
    }
}

/// JSON when the body parses as JSON, text otherwise, `{}` when empty.
fn body_value(body: &[u8]) -> Value {
    if body.is_empty() {
        return json!({});
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}

/// First hop of `x-forwarded-for`, else the socket peer, else empty.
fn remote_address(req: &Request) -> String {
    req.header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .or_else(|| req.remote_addr().map(|a| a.ip().to_string()))
        .unwrap_or_default()
}

// ── RequestLogger ─────────────────────────────────────────────────────────────

/// Collects traces for one request and emits them as one record.
pub struct RequestLogger {
    request: Arc<RequestSnapshot>,
    response: Arc<ResponseSlot>,
    sink: Arc<dyn LogSink>,
    state: Mutex<State>,
}

struct State {
    metadata: BTreeMap<String, String>,
    traces: Vec<TraceEntry>,
    last: Instant,
    duration: u64,
    masked: Vec<String>,
    omitted: Vec<String>,
    flushed: bool,
}

impl RequestLogger {
    pub(crate) fn new(
        request: Arc<RequestSnapshot>,
        response: Arc<ResponseSlot>,
        sink: Arc<dyn LogSink>,
        name: &str,
        trace_id: String,
    ) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert("Name".to_owned(), name.to_owned());
        metadata.insert("TraceID".to_owned(), trace_id);
        metadata.insert("RemoteAddress".to_owned(), request.remote_address.clone());

        Self {
            request,
            response,
            sink,
            state: Mutex::new(State {
                metadata,
                traces: Vec::new(),
                last: Instant::now(),
                duration: 0,
                masked: Vec::new(),
                omitted: Vec::new(),
                flushed: false,
            }),
        }
    }

    pub fn debug(&self, message: impl Into<Value>) -> &Self {
        self.log(Level::Debug, message.into())
    }

    pub fn info(&self, message: impl Into<Value>) -> &Self {
        self.log(Level::Info, message.into())
    }

    pub fn warn(&self, message: impl Into<Value>) -> &Self {
        self.log(Level::Warn, message.into())
    }

    pub fn error(&self, message: impl Into<Value>) -> &Self {
        self.log(Level::Error, message.into())
    }

    fn log(&self, level: Level, message: Value) -> &Self {
        let mut state = self.state.lock();
        let now = Instant::now();
        let duration = millis(now.duration_since(state.last));
        state.traces.push(TraceEntry { level, message, duration });
        state.last = now;
        state.duration += duration;
        self
    }

    /// Adds `metadata` to the record, or replaces all of it when `merge` is false.
    pub fn with<I, K, V>(&self, metadata: I, merge: bool) -> &Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let incoming = metadata.into_iter().map(|(k, v)| (k.into(), v.into()));
        let mut state = self.state.lock();
        if merge {
            state.metadata.extend(incoming);
        } else {
            state.metadata = incoming.collect();
        }
        self
    }

    /// A metadata value, or `""` when unset.
    pub fn get(&self, key: &str) -> String {
        self.state.lock().metadata.get(key).cloned().unwrap_or_default()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) -> &Self {
        self.state.lock().metadata.insert(key.into(), value.into());
        self
    }

    /// Dotted paths whose values are replaced with [`MASK`] on flush.
    pub fn mask<I, S>(&self, paths: I, merge: bool) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.state.lock();
        extend_or_replace(&mut state.masked, paths, merge);
        self
    }

    /// Dotted paths removed from the record on flush.
    pub fn omit<I, S>(&self, paths: I, merge: bool) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.state.lock();
        extend_or_replace(&mut state.omitted, paths, merge);
        self
    }

    /// The entries logged so far.
    pub fn traces(&self) -> Vec<TraceEntry> {
        self.state.lock().traces.clone()
    }

    pub fn is_flushed(&self) -> bool {
        self.state.lock().flushed
    }

    /// Writes the record to the sink. Only the first call does anything.
    ///
    /// A failing sink is reported through `tracing` and otherwise ignored.
    pub fn flush(&self) {
        let record = {
            let mut state = self.state.lock();
            if state.flushed {
                return;
            }
            state.flushed = true;
            let tail = millis(state.last.elapsed());
            self.record(&state, state.duration + tail)
        };

        let line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "unable to render request log record");
                return;
            }
        };
        if let Err(e) = self.sink.write_line(&line) {
            tracing::warn!(error = %e, "unable to write request log record");
        }
    }

    fn record(&self, state: &State, duration: u64) -> Value {
        let mut record: Map<String, Value> = state
            .metadata
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        record.insert("Request".to_owned(), self.request.to_value());
        record.insert("Response".to_owned(), self.response.snapshot());
        record.insert("Duration".to_owned(), duration.into());
        record.insert("Traces".to_owned(), serde_json::to_value(&state.traces).unwrap_or_default());

        let mut record = Value::Object(record);
        metadata::mask_paths(&mut record, &state.masked, MASK);
        metadata::omit_paths(&mut record, &state.omitted);
        record
    }
}

impl fmt::Debug for RequestLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RequestLogger")
            .field("metadata", &state.metadata)
            .field("traces", &state.traces.len())
            .field("flushed", &state.flushed)
            .finish()
    }
}

fn extend_or_replace<I, S>(target: &mut Vec<String>, paths: I, merge: bool)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    if !merge {
        target.clear();
    }
    target.extend(paths.into_iter().map(Into::into));
}

fn millis(d: std::time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
