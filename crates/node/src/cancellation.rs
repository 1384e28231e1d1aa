//! `CancellationToken` (spec.md §5, §9): "a newtype over a `tokio_util`-style atomic flag, checked
//! only at `.await` points". `ChainUpdater` never spawns the cooperative cancellation machinery of
//! a full `tokio_util::sync::CancellationToken` (child tokens, cancel futures) — it only ever needs
//! the flag-and-check half of that API, so that is all this wraps.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_same_cancellation_flag() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
