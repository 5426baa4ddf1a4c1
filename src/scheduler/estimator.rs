//! Worker-count estimation from sampled I/O cost.
//!
//! Reading and tokenizing a chunk is mostly I/O wait, so the right pool
//! size is larger than the core count by a factor that depends on how
//! slow the storage actually is. Rather than guess, the estimator reads
//! a handful of chunks up front (the first at offset 0, the rest at
//! random offsets in the first half of the file), runs the real
//! tokenizer over them with results discarded, and times each pass:
//!
//! ```text
//! workers = floor(cores * cpu_load_factor * (1 + avg_sample_ms / business_factor))
//! ```
//!
//! The result is clamped to at least 1. Failure to open the file here is
//! fatal for the whole run; there is no point starting a scan that
//! cannot read its input.
//!
//! Sampling uses a seeded XorShift64 so test runs pick reproducible
//! offsets; cryptographic quality is irrelevant for spreading reads
//! across a file.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::time::Instant;

use crate::codec;
use crate::config::ScanConfig;

use super::parser::for_each_token;

/// Sizes the worker pool from sampled chunk reads.
#[derive(Clone, Debug)]
pub struct ThreadCountEstimator {
    pub chunk_size: usize,
    pub sample_count: usize,
    /// Target CPU saturation, `0.0..=1.0`.
    pub cpu_load_factor: f64,
    /// Divisor for the average per-chunk milliseconds.
    pub business_factor: f64,
    pub seed: u64,
}

impl ThreadCountEstimator {
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            sample_count: config.sample_count,
            cpu_load_factor: config.cpu_load_factor,
            business_factor: config.business_factor,
            seed: config.seed,
        }
    }

    /// Samples the file and returns the estimated worker count (>= 1).
    pub fn estimate(&self, path: &Path) -> io::Result<usize> {
        let avg_ms = self.average_sample_millis(path)?;
        let cores = num_cpus::get() as f64;
        let estimate = (cores * self.cpu_load_factor * (1.0 + avg_ms / self.business_factor))
            .floor() as usize;
        Ok(estimate.max(1))
    }

    /// Average wall time in milliseconds to read and tokenize one chunk.
    fn average_sample_millis(&self, path: &Path) -> io::Result<f64> {
        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len();
        let total_chunks = (file_size / self.chunk_size as u64) as usize;
        let samples = self.sample_count.min(total_chunks).max(1);

        let mut rng = XorShift64::new(self.seed);
        let mut offset = 0u64;
        let mut buf = Vec::with_capacity(self.chunk_size.min(file_size as usize + 1));
        let mut spent_ms = 0.0f64;

        for _ in 0..samples {
            let started = Instant::now();

            buf.clear();
            file.seek(SeekFrom::Start(offset))?;
            (&mut file)
                .take(self.chunk_size as u64)
                .read_to_end(&mut buf)?;
            for_each_token(&buf, |token, _| {
                if let Ok(text) = std::str::from_utf8(token) {
                    // Validation only; results are discarded. This keeps
                    // the sample cost representative of a real parse.
                    let _ = codec::validate(text);
                }
            });

            spent_ms += started.elapsed().as_secs_f64() * 1_000.0;
            // Subsequent samples land in the first half of the file so a
            // sample chunk never degenerates to a tail sliver.
            offset = if file_size > 1 {
                rng.next_below(file_size / 2)
            } else {
                0
            };
        }

        Ok(spent_ms / samples as f64)
    }
}

/// Marsaglia XorShift64; full period, three shifts, no dependencies.
#[derive(Clone, Debug)]
struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        // Avoid the all-zero lockup state.
        let state = if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed };
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Uniform-enough value in `[0, bound)`; `0` when `bound == 0`.
    fn next_below(&mut self, bound: u64) -> u64 {
        if bound == 0 {
            0
        } else {
            self.next_u64() % bound
        }
    }
}
