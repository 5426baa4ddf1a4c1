//! Scan configuration.
//!
//! Defaults mirror the tool's production tuning: 5 MiB chunks, an
//! 80% memory grab, 100 estimator samples, and a 10,000-token queue.
//!
//! # Sizing Guidelines
//!
//! - `chunk_size`: larger chunks mean fewer seeks and fewer boundary
//!   fragments, but more memory per in-flight parser.
//! - `grab_percent`: the share of currently-free host memory the scan may
//!   consume before the pool pauses new chunk starts.
//! - `queue_capacity`: bounds producer/consumer skew; parsers block on a
//!   full queue, which is the intended backpressure.

use std::time::Duration;

/// Default chunk size: 5 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 5 * 1024 * 1024;

/// Default token queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// Default number of sampled chunk reads for the thread estimator.
pub const DEFAULT_SAMPLE_COUNT: usize = 100;

/// Default memory monitor poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Share of free host memory the scan is allowed to grab, on a fixed
/// decade scale.
///
/// The complement (`100 - grab`) becomes the pause floor: when free host
/// memory drops below that fraction of the free memory observed at pool
/// start (or last resume), no new chunk task may begin.
///
/// Values off the decade scale are rejected at construction rather than
/// silently clamped; [`GrabPercent::from_value`] returns `None` for them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrabPercent {
    P10,
    P20,
    P30,
    P40,
    P50,
    P60,
    P70,
    P80,
    P90,
    P100,
}

impl GrabPercent {
    /// The numeric percentage this variant stands for.
    #[inline]
    pub fn value(self) -> u64 {
        match self {
            GrabPercent::P10 => 10,
            GrabPercent::P20 => 20,
            GrabPercent::P30 => 30,
            GrabPercent::P40 => 40,
            GrabPercent::P50 => 50,
            GrabPercent::P60 => 60,
            GrabPercent::P70 => 70,
            GrabPercent::P80 => 80,
            GrabPercent::P90 => 90,
            GrabPercent::P100 => 100,
        }
    }

    /// Percentage of free memory kept in reserve (the pause floor).
    #[inline]
    pub fn floor_percent(self) -> u64 {
        100 - self.value()
    }

    /// Looks up a variant for `value`, rejecting anything off the scale.
    pub fn from_value(value: u64) -> Option<Self> {
        match value {
            10 => Some(GrabPercent::P10),
            20 => Some(GrabPercent::P20),
            30 => Some(GrabPercent::P30),
            40 => Some(GrabPercent::P40),
            50 => Some(GrabPercent::P50),
            60 => Some(GrabPercent::P60),
            70 => Some(GrabPercent::P70),
            80 => Some(GrabPercent::P80),
            90 => Some(GrabPercent::P90),
            100 => Some(GrabPercent::P100),
            _ => None,
        }
    }
}

/// Configuration for a single scan invocation.
#[derive(Clone, Debug)]
pub struct ScanConfig {
    /// Bytes per file chunk (last chunk may be shorter).
    pub chunk_size: usize,

    /// Share of free host memory the scan may grab before pausing.
    pub grab_percent: GrabPercent,

    /// Sampled chunk reads used to size the worker pool.
    pub sample_count: usize,

    /// Capacity of the bounded token queue shared by parsers, the
    /// boundary resolver, and dedup workers.
    pub queue_capacity: usize,

    /// Fixed worker count; `None` runs the I/O-cost estimator.
    pub workers: Option<usize>,

    /// Estimator weight for CPU saturation, `0.0..=1.0`.
    pub cpu_load_factor: f64,

    /// Estimator divisor for per-chunk business cost (milliseconds).
    pub business_factor: f64,

    /// Memory monitor poll interval.
    pub poll_interval: Duration,

    /// Seed for the estimator's sample-offset RNG (fixed for
    /// reproducible sampling in tests).
    pub seed: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            grab_percent: GrabPercent::P80,
            sample_count: DEFAULT_SAMPLE_COUNT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            workers: None,
            cpu_load_factor: 0.8,
            business_factor: 2.0,
            poll_interval: DEFAULT_POLL_INTERVAL,
            seed: 0x9E37_79B9_7F4A_7C15,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decade_scale_round_trips() {
        for value in (10..=100).step_by(10) {
            let grab = GrabPercent::from_value(value).unwrap();
            assert_eq!(grab.value(), value);
            assert_eq!(grab.floor_percent(), 100 - value);
        }
    }

    #[test]
    fn off_scale_values_are_rejected() {
        for value in [0, 5, 15, 55, 99, 101, 1000] {
            assert!(GrabPercent::from_value(value).is_none());
        }
    }

    #[test]
    fn default_grab_is_eighty() {
        assert_eq!(ScanConfig::default().grab_percent, GrabPercent::P80);
        assert_eq!(GrabPercent::P80.floor_percent(), 20);
    }
}
