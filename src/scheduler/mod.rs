//! The scan pipeline: partitioning, estimation, parsing, dedup,
//! boundary resolution, and the memory-adaptive pool that drives it.

pub mod chunking;
pub mod dedup;
pub mod estimator;
pub mod orchestrator;
pub mod parser;
pub mod pool;
pub mod resolver;

pub use chunking::{partition, ChunkFragments, ChunkSpec, FragmentTable};
pub use dedup::{AddressSummary, Counters};
pub use estimator::ThreadCountEstimator;
pub use orchestrator::{ScanOrchestrator, ScanReport};
pub use pool::{AdaptiveWorkerPool, PoolConfig, PoolEvents};
