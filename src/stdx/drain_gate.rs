//! In-flight counter with a blocking "drained" wait.
//!
//! Replaces spin-polling "is the queue empty yet?" with an explicit
//! signal: producers [`add`](DrainGate::add) before handing an item to
//! the queue, consumers [`done`](DrainGate::done) after fully processing
//! it, and [`wait_idle`](DrainGate::wait_idle) blocks until the
//! in-flight count is zero.
//!
//! Because consumers decrement only after processing (not after
//! dequeue), an observed drain means every produced item has also been
//! consumed to completion, not merely removed from the queue. Unlike a
//! latch the count may rise again after reaching zero; the scan relies
//! on that for its two-phase drain (parsers drain, the resolver
//! produces more, second drain).

use std::sync::{Condvar, Mutex};

/// Counter of produced-but-not-fully-processed items.
pub struct DrainGate {
    in_flight: Mutex<u64>,
    idle: Condvar,
}

impl DrainGate {
    pub fn new() -> Self {
        Self {
            in_flight: Mutex::new(0),
            idle: Condvar::new(),
        }
    }

    /// Registers `n` newly produced items. Call before the matching
    /// queue push so the gate can never observe a spurious drain between
    /// push and registration.
    pub fn add(&self, n: u64) {
        let mut count = self.in_flight.lock().expect("drain gate mutex poisoned");
        *count += n;
    }

    /// Marks one item fully processed.
    pub fn done(&self) {
        let mut count = self.in_flight.lock().expect("drain gate mutex poisoned");
        debug_assert!(*count > 0, "drain gate completed more items than produced");
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }

    /// Snapshot of the in-flight count.
    pub fn in_flight(&self) -> u64 {
        *self.in_flight.lock().expect("drain gate mutex poisoned")
    }

    /// Blocks until the in-flight count is zero.
    pub fn wait_idle(&self) {
        let mut count = self.in_flight.lock().expect("drain gate mutex poisoned");
        while *count > 0 {
            count = self.idle.wait(count).expect("drain gate mutex poisoned");
        }
    }
}

impl Default for DrainGate {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DrainGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrainGate")
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

#[cfg(test)]
#[path = "drain_gate_tests.rs"]
mod drain_gate_tests;
