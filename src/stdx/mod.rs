//! Generic concurrency primitives shared by the scan pipeline.
//!
//! Nothing in here knows about addresses or files; each file holds one
//! primitive with its tests alongside.

pub mod atomic_bitset;
pub mod drain_gate;
pub mod latch;

pub use atomic_bitset::AtomicBitSet;
pub use drain_gate::DrainGate;
pub use latch::CountdownLatch;
