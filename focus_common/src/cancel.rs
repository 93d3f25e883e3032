//! Cooperative cancellation token.
//!
//! The token is shared between the thread running a sweep and any thread
//! that may request an abort (signal handler, operator console). The
//! sweep polls it once per step; nothing is interrupted preemptively.

use crate::focus::driver::AbortSignal;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable cancellation flag backed by an `Arc<AtomicBool>`.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token with no cancellation requested.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Safe from any thread.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clear a previous request so the token can be reused for the next run.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl AbortSignal for CancellationToken {
    fn abort_requested(&self) -> bool {
        self.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_token_starts_clear() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert!(!token.abort_requested());
    }

    #[test]
    fn test_clones_share_flag() {
        let token = CancellationToken::new();
        let other = token.clone();
        other.cancel();
        assert!(token.is_cancelled());

        token.reset();
        assert!(!other.is_cancelled());
    }

    #[test]
    fn test_cancel_from_other_thread() {
        let token = CancellationToken::new();
        let remote = token.clone();
        thread::spawn(move || remote.cancel()).join().unwrap();
        assert!(token.abort_requested());
    }
}
