//! Cooperative cancellation for a pipeline run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Signal for cancelling a pipeline run from outside.
///
/// Clones share state. The pipeline checks the signal before every stage,
/// so the model call in flight still finishes and a section it wrote is
/// still recorded.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    sig: Arc<AtomicBool>,
    reason: Arc<OnceLock<String>>,
}

impl CancelSignal {
    /// Creates an unset signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the run.
    pub fn cancel(&self) {
        self.sig.store(true, Ordering::SeqCst);
    }

    /// Cancels with a reason message. Only the first reason is kept.
    pub fn cancel_with_reason(&self, reason: &str) {
        let _ = self.reason.set(reason.to_owned());
        self.cancel();
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.sig.load(Ordering::SeqCst)
    }

    /// The reason given to [`cancel_with_reason`](Self::cancel_with_reason).
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.get().map(String::as_str)
    }
}
