//! Cooperative cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared cancellation flag for a run.
///
/// Cancellation is cooperative: the coordinator checks the token before
/// every dispatch and workers check it between files, so a cancelled run
/// stops at the next checkpoint rather than mid-write. Cancelling an
/// already-cancelled token is a no-op.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Returns false when the token was already
    /// cancelled.
    pub fn cancel(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_once() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());

        assert!(token.cancel());
        assert!(token.is_cancelled());

        // Second cancel reports it was already cancelled
        assert!(!token.cancel());
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();

        token.cancel();
        assert!(clone.is_cancelled());
    }
}
