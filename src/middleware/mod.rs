//! Continuation passing between handler, error translator and fallback.
//!
//! Each stage of a request receives a [`Next`]. Calling
//! [`Next::proceed`] hands the request on; [`Next::fail`] routes an error to
//! the [`ErrorHandler`]. A `Next` settles once: both methods consume it, and
//! the first outcome recorded for a stage is the only one that counts.

mod error;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Error;

pub use error::ErrorHandler;

/// How a stage finished.
#[derive(Debug)]
pub(crate) enum Flow {
    Continue,
    Fail(Error),
}

/// Continuation handed to a request stage.
pub struct Next {
    outcome: Arc<Mutex<Option<Flow>>>,
}

impl Next {
    pub(crate) fn new() -> Self {
        Self { outcome: Arc::new(Mutex::new(None)) }
    }

    /// A second handle on the same outcome, kept by the stage's caller.
    pub(crate) fn fork(&self) -> Self {
        Self { outcome: Arc::clone(&self.outcome) }
    }

    /// Pass the request on to the next stage.
    pub fn proceed(self) {
        self.settle(Flow::Continue);
    }

    /// Route `err` to the error translator.
    pub fn fail(self, err: impl Into<Error>) {
        self.settle(Flow::Fail(err.into()));
    }

    pub(crate) fn settle(&self, flow: Flow) {
        let mut outcome = self.outcome.lock();
        if outcome.is_none() {
            *outcome = Some(flow);
            return;
        }
        if let Flow::Fail(e) = flow {
            tracing::warn!(error = %e, "stage already settled, dropping late failure");
        }
    }

    /// The recorded outcome, if the stage settled.
    pub(crate) fn take(&self) -> Option<Flow> {
        self.outcome.lock().take()
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("settled", &self.outcome.lock().is_some())
            .finish()
    }
}
