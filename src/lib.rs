//! Memory-adaptive parallel scanner for newline-delimited IPv4 files.
//!
//! ## Scope
//! This crate reads a large text file of one-address-per-line IPv4
//! addresses and reports `(unique, total)` counts of the valid ones,
//! sizing its worker pool from sampled I/O cost and pausing new chunk
//! work when free host memory falls below a dynamic floor.
//!
//! ## Key invariants
//! - Chunk boundaries ignore line structure; the first and last token of
//!   every chunk are set aside as boundary fragments and reconciled in a
//!   single resolver pass after all chunks complete.
//! - All boundary fragments exist before resolution begins, enforced by
//!   a completion gate initialized to the chunk count.
//! - Dedup is a lock-free test-and-set over a dense bitmap covering the
//!   whole address domain; counts are independent of chunk size, worker
//!   count, and boundary placement.
//! - Pausing gates only task starts; in-flight chunk parses always run
//!   to completion.
//!
//! ## Scan flow
//! `Path -> Estimator -> ChunkSpecs -> AdaptiveWorkerPool(parsers)
//!  -> token queue -> dedup workers -> gate -> BoundaryResolver
//!  -> drain -> AddressSummary`
//!
//! ## Notable entry points
//! - [`ScanOrchestrator`] / [`ScanConfig`]: run a scan end to end.
//! - [`codec`]: dotted-decimal validate/encode/decode.
//! - [`scheduler`]: the individual pipeline stages, usable separately.
//! - [`memstats::MemoryStats`] / [`progress::ProgressRenderer`]: the
//!   two collaborator seams, injectable for tests.

pub mod codec;
pub mod config;
pub mod memstats;
pub mod progress;
pub mod scheduler;
pub mod stdx;

pub use config::{GrabPercent, ScanConfig};
pub use scheduler::{AddressSummary, ScanOrchestrator, ScanReport};
