//! One-way cooperative cancellation flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Once set, a `StopToken` stays set. Clones share the same flag.
///
/// A token may carry a deadline; checking it after the deadline sets the flag.
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    stopped: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Option<Instant>) -> Self {
        Self {
            stopped: Arc::default(),
            deadline,
        }
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn should_stop(&self) -> bool {
        if self.stopped.load(Ordering::Acquire) {
            return true;
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                self.stop();
                true
            }
            _ => false,
        }
    }
}
