//! Token queue, counters, and deduplicator workers.
//!
//! # Data flow
//!
//! Chunk parsers and the boundary resolver produce candidate address
//! tokens into one bounded channel; a fixed pool of dedup workers
//! consumes them. Each worker encodes the token, claims its bit in the
//! shared [`AtomicBitSet`], and bumps the counters. Ordering across
//! producers is irrelevant: set-bit-if-unset is commutative, so the
//! final `(unique, total)` pair is independent of scheduling.
//!
//! # Drain and cancellation
//!
//! Every send registers with a [`DrainGate`] before entering the
//! channel, and workers mark the token done only after counting it, so
//! [`TokenSender::wait_drained`] observing zero means every produced
//! token has been fully counted. Workers never exit on a momentarily
//! empty queue; they leave only when the channel disconnects, which
//! happens once the orchestrator drops the last sender after the second
//! drain.
//!
//! # Validation at the consumer
//!
//! Interior tokens are validated by parsers before they are enqueued,
//! but resolver output (boundary merges in particular) is deliberately
//! unvalidated. The worker therefore treats a failed encode as "not an
//! address" and skips the token without touching either counter.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::codec;
use crate::stdx::{AtomicBitSet, DrainGate};

/// Bits needed to cover the whole IPv4 address domain `[0, 2^32)`.
pub const ADDRESS_SPACE_BITS: usize = 1 << 32;

/// Allocates the full-domain dedup bitmap (512 MiB, once per scan).
pub fn address_bitmap() -> AtomicBitSet {
    AtomicBitSet::empty(ADDRESS_SPACE_BITS)
}

/// Final immutable result of a scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AddressSummary {
    /// Distinct valid addresses seen.
    pub unique: u64,
    /// Valid address occurrences seen, duplicates included.
    pub total: u64,
}

impl fmt::Display for AddressSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.unique, self.total)
    }
}

/// Monotone scan counters, owned by one scan invocation.
#[derive(Debug, Default)]
pub struct Counters {
    unique: AtomicU64,
    total: AtomicU64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn record(&self, newly_unique: bool) {
        if newly_unique {
            self.unique.fetch_add(1, Ordering::Relaxed);
        }
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot of the counters. Exact once all workers have quiesced.
    pub fn summary(&self) -> AddressSummary {
        AddressSummary {
            unique: self.unique.load(Ordering::Relaxed),
            total: self.total.load(Ordering::Relaxed),
        }
    }
}

/// Creates the bounded token queue with its drain gate.
pub fn token_queue(capacity: usize) -> (TokenSender, TokenReceiver) {
    let (tx, rx) = bounded(capacity);
    let gate = Arc::new(DrainGate::new());
    (
        TokenSender {
            tx,
            gate: Arc::clone(&gate),
        },
        TokenReceiver { rx, gate },
    )
}

/// Producer handle for the token queue.
///
/// Dropping the last clone disconnects the channel, which is the
/// workers' cancellation signal.
#[derive(Clone)]
pub struct TokenSender {
    tx: Sender<String>,
    gate: Arc<DrainGate>,
}

impl TokenSender {
    /// Enqueues one candidate token, blocking while the queue is full.
    pub fn send(&self, token: String) {
        self.gate.add(1);
        if self.tx.send(token).is_err() {
            // Consumers are gone; nothing will ever call done().
            self.gate.done();
        }
    }

    /// Blocks until every token sent so far has been fully processed.
    pub fn wait_drained(&self) {
        self.gate.wait_idle();
    }
}

/// Consumer handle for the token queue.
#[derive(Clone)]
pub struct TokenReceiver {
    pub(crate) rx: Receiver<String>,
    pub(crate) gate: Arc<DrainGate>,
}

/// Spawns `count` long-lived dedup workers bound to `receiver`.
///
/// Workers run until the channel disconnects; join the returned handles
/// after dropping all senders to be certain the counters are final.
pub fn spawn_dedup_workers(
    count: usize,
    receiver: TokenReceiver,
    bitmap: Arc<AtomicBitSet>,
    counters: Arc<Counters>,
) -> Vec<JoinHandle<()>> {
    (0..count)
        .map(|i| {
            let receiver = receiver.clone();
            let bitmap = Arc::clone(&bitmap);
            let counters = Arc::clone(&counters);
            thread::Builder::new()
                .name(format!("ip-dedup-{i}"))
                .spawn(move || dedup_loop(receiver, &bitmap, &counters))
                .expect("failed to spawn dedup worker")
        })
        .collect()
}

fn dedup_loop(receiver: TokenReceiver, bitmap: &AtomicBitSet, counters: &Counters) {
    while let Ok(token) = receiver.rx.recv() {
        if let Some(addr) = codec::encode(&token) {
            let newly_unique = bitmap.test_and_set(addr as usize);
            counters.record(newly_unique);
        }
        receiver.gate.done();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Small-domain bitmap so tests do not allocate 512 MiB.
    fn small_bitmap() -> Arc<AtomicBitSet> {
        // 10.0.0.x and 127.0.0.1 fit well below 2^31.
        Arc::new(AtomicBitSet::empty(1 << 31))
    }

    fn run_workers(tokens: &[&str], workers: usize) -> AddressSummary {
        let (tx, rx) = token_queue(16);
        let counters = Arc::new(Counters::new());
        let handles = spawn_dedup_workers(workers, rx, small_bitmap(), Arc::clone(&counters));

        for token in tokens {
            tx.send((*token).to_string());
        }
        tx.wait_drained();
        drop(tx);
        for h in handles {
            h.join().unwrap();
        }
        counters.summary()
    }

    #[test]
    fn counts_unique_and_total() {
        let summary = run_workers(&["10.0.0.1", "10.0.0.1", "10.0.0.2"], 2);
        assert_eq!(summary, AddressSummary { unique: 2, total: 3 });
    }

    #[test]
    fn invalid_tokens_touch_no_counter() {
        let summary = run_workers(&["999.1.1.1", "not-an-ip", "", "10.0.0"], 1);
        assert_eq!(summary, AddressSummary { unique: 0, total: 0 });
    }

    #[test]
    fn leading_zero_duplicates_collapse() {
        let summary = run_workers(&["10.0.0.1", "010.0.0.1"], 2);
        assert_eq!(summary, AddressSummary { unique: 1, total: 2 });
    }

    #[test]
    fn drain_means_counted() {
        let (tx, rx) = token_queue(4);
        let counters = Arc::new(Counters::new());
        let handles = spawn_dedup_workers(3, rx, small_bitmap(), Arc::clone(&counters));

        for _ in 0..100 {
            tx.send("127.0.0.1".to_string());
        }
        tx.wait_drained();
        // No joins yet: drain alone must already imply final counts.
        assert_eq!(counters.summary().total, 100);
        assert_eq!(counters.summary().unique, 1);

        drop(tx);
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn summary_displays_as_pair() {
        let s = AddressSummary {
            unique: 2,
            total: 5,
        };
        assert_eq!(s.to_string(), "(2, 5)");
    }
}
