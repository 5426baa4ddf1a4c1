//! Scan orchestration.
//!
//! Composes the whole pipeline for one scan invocation:
//!
//! ```text
//! estimate workers
//!   -> partition file into ChunkSpecs
//!   -> spawn dedup workers (token queue consumers)
//!   -> start AdaptiveWorkerPool, submit one parser task per chunk
//!   -> wait: completion gate (all fragments published)
//!   -> wait: token drain (all interior tokens counted)
//!   -> run BoundaryResolver once
//!   -> wait: token drain (all boundary tokens counted)
//!   -> drop senders (cancels dedup workers), join, read counters
//! ```
//!
//! The two drain waits bracketing the resolver are what make the final
//! counters exact: the first guarantees no interior token is still in
//! flight when boundary tokens are produced, the second that every
//! boundary token has been counted before the workers are cancelled.
//!
//! All shared state (bitmap, counters, fragments, gates) is owned by
//! this invocation and dropped with it, so concurrent scans in one
//! process do not interfere.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::ScanConfig;
use crate::memstats::{MemoryStats, SystemMemory};
use crate::progress::{ProgressRenderer, SilentProgress};
use crate::stdx::CountdownLatch;

use super::chunking::{partition, FragmentTable};
use super::dedup::{
    address_bitmap, spawn_dedup_workers, token_queue, AddressSummary, Counters,
};
use super::estimator::ThreadCountEstimator;
use super::parser::{parse_chunk, ParserContext};
use super::pool::{AdaptiveWorkerPool, PoolConfig};
use super::resolver::resolve;

/// Result of one scan, counters plus run shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub summary: AddressSummary,
    /// Chunks the file was partitioned into.
    pub chunks: usize,
    /// Worker count actually used (estimated or configured).
    pub workers: usize,
    /// Chunks that failed to read and were skipped (fail-soft policy);
    /// a nonzero value means the summary may undercount.
    pub io_errors: u64,
}

/// Composes and drives one scan.
pub struct ScanOrchestrator {
    config: ScanConfig,
    memory: Arc<dyn MemoryStats>,
    progress: Arc<dyn ProgressRenderer>,
}

impl ScanOrchestrator {
    /// Orchestrator with real host memory and no progress output.
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            memory: Arc::new(SystemMemory::new()),
            progress: Arc::new(SilentProgress),
        }
    }

    /// Replaces the memory source (tests use a deterministic fake).
    pub fn with_memory(mut self, memory: Arc<dyn MemoryStats>) -> Self {
        self.memory = memory;
        self
    }

    /// Replaces the progress renderer (the CLI installs the console bar).
    pub fn with_progress(mut self, progress: Arc<dyn ProgressRenderer>) -> Self {
        self.progress = progress;
        self
    }

    /// Scans `path` and returns the final report.
    ///
    /// Fatal errors (file not readable, a panicked worker) surface as
    /// `io::Error`; individual chunk read failures do not, they are
    /// counted in [`ScanReport::io_errors`].
    pub fn run(&self, path: &Path) -> io::Result<ScanReport> {
        let file_size = fs::metadata(path)?.len();
        let chunks = partition(file_size, self.config.chunk_size);
        let chunk_count = chunks.len();
        if chunk_count == 0 {
            return Ok(ScanReport::default());
        }

        let workers = match self.config.workers {
            Some(w) => w.max(1),
            None => ThreadCountEstimator::from_config(&self.config).estimate(path)?,
        };

        let fragments = Arc::new(FragmentTable::new(chunk_count));
        let gate = Arc::new(CountdownLatch::new(chunk_count));
        let (token_tx, token_rx) = token_queue(self.config.queue_capacity);
        let bitmap = Arc::new(address_bitmap());
        let counters = Arc::new(Counters::new());

        // Consumers outlive both producer phases; one extra worker keeps
        // the queue moving while the pool is saturated.
        let dedup_workers =
            spawn_dedup_workers(workers + 1, token_rx, bitmap, Arc::clone(&counters));

        let mut pool = AdaptiveWorkerPool::new(
            PoolConfig {
                workers,
                grab_percent: self.config.grab_percent,
                poll_interval: self.config.poll_interval,
            },
            Arc::clone(&self.memory),
            Arc::clone(&gate),
            Arc::clone(&self.progress),
            chunk_count as u64,
        );

        let ctx = Arc::new(ParserContext {
            path: path.to_path_buf(),
            fragments: Arc::clone(&fragments),
            tokens: token_tx.clone(),
            gate: Arc::clone(&gate),
            io_errors: AtomicU64::new(0),
        });
        for spec in chunks {
            let ctx = Arc::clone(&ctx);
            pool.submit(Box::new(move || parse_chunk(&ctx, spec)));
        }

        // Phase 1: every chunk parsed, every fragment slot published.
        gate.wait();
        pool.join();

        // Phase 2: interior tokens fully counted, then reconcile
        // boundaries, then boundary tokens fully counted.
        token_tx.wait_drained();
        resolve(&fragments, &token_tx);
        token_tx.wait_drained();

        let io_errors = ctx.io_errors.load(Ordering::Relaxed);

        // Dropping the last senders disconnects the queue, which is the
        // workers' cancellation signal.
        drop(ctx);
        drop(token_tx);
        for worker in dedup_workers {
            worker
                .join()
                .map_err(|_| io::Error::other("dedup worker panicked"))?;
        }

        Ok(ScanReport {
            summary: counters.summary(),
            chunks: chunk_count,
            workers,
            io_errors,
        })
    }
}
