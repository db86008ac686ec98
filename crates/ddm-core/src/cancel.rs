//! The cancellation root: a single, process-wide "stop now" flag created at
//! startup and threaded explicitly into every component that needs it.
//!
//! Only `install_signal_handler` touches global OS signal state, and only
//! once per process; everything downstream just reads a shared
//! `CancelToken` passed in as an explicit argument, per spec.md §9's note
//! against "process-wide signal-handling beyond the single orchestrator
//! root."

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A distinguished error produced when a cancellable operation observes the
/// token has fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canceled;

impl std::fmt::Display for Canceled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "canceled")
    }
}

impl std::error::Error for Canceled {}

/// Shared, multi-consumer, idempotent cancellation flag.
#[derive(Clone)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), Canceled> {
        if self.is_canceled() {
            Err(Canceled)
        } else {
            Ok(())
        }
    }
}

/// Registers a SIGINT/SIGTERM handler that cancels `token` exactly once.
///
/// Safe to call more than once; `ctrlc` itself only allows one handler per
/// process, so only the first caller's token is ever wired to the signal —
/// callers after the first get a best-effort registration failure back.
pub fn install_signal_handler(token: CancelToken) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        token.cancel();
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uncanceled() {
        let t = CancelToken::new();
        assert!(!t.is_canceled());
        assert!(t.check().is_ok());
    }

    #[test]
    fn cancel_is_visible_to_clones() {
        let t = CancelToken::new();
        let clone = t.clone();
        clone.cancel();
        assert!(t.is_canceled());
        assert!(t.check().is_err());
    }

    #[test]
    fn cancel_is_idempotent() {
        let t = CancelToken::new();
        t.cancel();
        t.cancel();
        assert!(t.is_canceled());
    }
}
