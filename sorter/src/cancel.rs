//! Cooperative cancellation for the continuous loop.
//!
//! The loop only polls between cycles, so a cancel request never interrupts
//! an actuation sequence.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Polled at cycle boundaries.
pub trait CancelSignal {
    fn is_cancelled(&self) -> bool;
}

/// Shared cancel flag, settable from a signal handler or another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Clear a previous request so the flag can guard the next run.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Route Ctrl-C to this flag for the rest of the process.
    pub fn install_ctrlc_handler(&self) -> Result<(), ctrlc::Error> {
        let flag = self.clone();
        ctrlc::set_handler(move || flag.cancel())
    }
}

impl CancelSignal for CancelFlag {
    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Cancels after a fixed number of polls. Handy for bounded runs.
#[derive(Debug)]
pub struct AfterPolls {
    remaining: std::cell::Cell<usize>,
}

impl AfterPolls {
    pub fn new(polls: usize) -> Self {
        Self {
            remaining: std::cell::Cell::new(polls),
        }
    }
}

impl CancelSignal for AfterPolls {
    fn is_cancelled(&self) -> bool {
        let left = self.remaining.get();
        if left == 0 {
            return true;
        }
        self.remaining.set(left - 1);
        false
    }
}

/// Cancelled when either signal is.
impl<A: CancelSignal, B: CancelSignal> CancelSignal for (A, B) {
    fn is_cancelled(&self) -> bool {
        self.0.is_cancelled() || self.1.is_cancelled()
    }
}
