//! Cancellation token for cooperative cancellation of verification runs.
//!
//! The runner checks the token between interactions; an interaction that has
//! already started always completes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;

/// A cloneable cancellation signal. All clones observe the same state.
///
/// Cancellation is idempotent; only the first reason is kept.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    reason: Mutex<Option<String>>,
}

impl CancellationToken {
    /// Create a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self, reason: impl Into<String>) {
        let mut current = self
            .inner
            .reason
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if current.is_none() {
            let reason = reason.into();
            warn!(%reason, "verification cancellation requested");
            *current = Some(reason);
            self.inner.cancelled.store(true, Ordering::SeqCst);
        }
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// The reason given to the first [`CancellationToken::cancel`] call.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.inner
            .reason
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
