//! Cooperative cancellation flag.
//!
//! A supervisor (console task, button ISR) raises the flag; the control
//! loop checks it between steps and samples and aborts the running motion
//! burst or beep.

use core::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct CancelToken {
    requested: AtomicBool,
}

impl CancelToken {
    pub const fn new() -> Self {
        Self {
            requested: AtomicBool::new(false),
        }
    }

    /// Request cancellation. Safe from any context.
    pub fn cancel(&self) {
        self.requested.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Consume a pending request.
    pub fn take(&self) -> bool {
        self.requested.swap(false, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_clears() {
        let token = CancelToken::new();
        assert!(!token.take());
        token.cancel();
        assert!(token.is_cancelled());
        assert!(token.take());
        assert!(!token.is_cancelled());
    }
}
