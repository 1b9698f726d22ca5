//! Destinations for flushed request records.
//!
//! A [`RequestLogger`](crate::RequestLogger) renders exactly one JSON line per
//! request and hands it to a [`LogSink`]. Failures are the sink's to report;
//! the logger swallows them so request handling never sees a broken stdout.

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;

/// Where a flushed record goes.
pub trait LogSink: Send + Sync + 'static {
    fn write_line(&self, line: &str) -> std::io::Result<()>;
}

/// Writes each record as one line on the process's standard output.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdoutSink;

impl LogSink for StdoutSink {
    fn write_line(&self, line: &str) -> std::io::Result<()> {
        let mut out = std::io::stdout().lock();
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")?;
        out.flush()
    }
}

/// Emits each record as a `tracing` event on the `mortar::request` target.
///
/// Use this when the process already ships `tracing` output somewhere.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write_line(&self, line: &str) -> std::io::Result<()> {
        tracing::info!(target: "mortar::request", record = line);
        Ok(())
    }
}

/// Keeps records in memory. Handy in tests.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every line written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Every line parsed back into JSON. Unparseable lines are skipped.
    pub fn records(&self) -> Vec<serde_json::Value> {
        self.lines
            .lock()
            .iter()
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect()
    }
}

impl LogSink for MemorySink {
    fn write_line(&self, line: &str) -> std::io::Result<()> {
        self.lines.lock().push(line.to_owned());
        Ok(())
    }
}
