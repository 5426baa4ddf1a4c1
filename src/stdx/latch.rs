//! Countdown latch: a one-shot completion gate.
//!
//! Initialized with the number of outstanding units of work; each unit
//! calls [`CountdownLatch::count_down`] exactly once when it finishes,
//! and any number of threads may block in [`CountdownLatch::wait`] until
//! the count reaches zero. The count never goes back up, so a latch that
//! opened stays open.

use std::sync::{Condvar, Mutex};

/// One-shot gate that opens when `count` reaches zero.
pub struct CountdownLatch {
    count: Mutex<usize>,
    zeroed: Condvar,
}

impl CountdownLatch {
    pub fn new(count: usize) -> Self {
        Self {
            count: Mutex::new(count),
            zeroed: Condvar::new(),
        }
    }

    /// Current outstanding count. A snapshot: it may be stale by the
    /// time the caller looks at it, but it only ever moves toward zero.
    pub fn count(&self) -> usize {
        *self.count.lock().expect("latch mutex poisoned")
    }

    /// Releases one unit. Saturates at zero so a double decrement is a
    /// logic error upstream but cannot wedge waiters.
    pub fn count_down(&self) {
        let mut count = self.count.lock().expect("latch mutex poisoned");
        debug_assert!(*count > 0, "latch counted down past zero");
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.zeroed.notify_all();
        }
    }

    /// Blocks until the count reaches zero. Returns immediately if the
    /// latch was created with zero or has already opened.
    pub fn wait(&self) {
        let mut count = self.count.lock().expect("latch mutex poisoned");
        while *count > 0 {
            count = self.zeroed.wait(count).expect("latch mutex poisoned");
        }
    }
}

impl std::fmt::Debug for CountdownLatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountdownLatch")
            .field("count", &self.count())
            .finish()
    }
}

#[cfg(test)]
#[path = "latch_tests.rs"]
mod latch_tests;
