//! Lock-free [`AtomicBitSet`] with atomic test-and-set for concurrent dedup.
//!
//! # Invariants
//! - Bits live in `AtomicU64` words; padding bits beyond the logical
//!   capacity stay zero (maintained by never setting them).
//!
//! # Ordering
//! All atomic operations use `Relaxed`. This is sufficient because
//! `fetch_or` atomicity alone guarantees exactly one caller sees
//! "was-zero" per bit, and no dependent data hangs off a bit.
//!
//! # Sizing
//! A full IPv4 dedup set (`1 << 32` bits) occupies 512 MiB and is
//! allocated once per scan. `test_and_set` and `is_set` are O(1);
//! `count` is O(words).

use std::sync::atomic::{AtomicU64, Ordering};

/// Number of `u64` words needed to hold `bits` bits.
#[inline]
pub const fn words_for_bits(bits: usize) -> usize {
    bits.div_ceil(64)
}

/// Lock-free bitset backed by `Vec<AtomicU64>`.
///
/// Multiple threads race to claim bits via
/// [`test_and_set`](Self::test_and_set); the atomic `fetch_or`
/// guarantees exactly one caller observes `true` (was-unset) per bit,
/// which is the "first writer wins" property the unique counter relies
/// on.
///
/// # Examples
///
/// ```
/// use ipscan_rs::stdx::AtomicBitSet;
///
/// let bits = AtomicBitSet::empty(128);
/// assert!(bits.test_and_set(42));   // first caller wins
/// assert!(!bits.test_and_set(42));  // second caller loses
/// assert!(bits.is_set(42));
/// ```
pub struct AtomicBitSet {
    words: Vec<AtomicU64>,
    bit_length: usize,
}

impl std::fmt::Debug for AtomicBitSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtomicBitSet")
            .field("bit_length", &self.bit_length)
            .field("words_len", &self.words.len())
            .finish()
    }
}

impl AtomicBitSet {
    /// Creates an all-zero bitset with capacity for `bit_length` bits.
    ///
    /// # Panics
    ///
    /// Panics if `bit_length` is zero (a zero-capacity bitset has no
    /// valid indices and is always a bug at the call site).
    pub fn empty(bit_length: usize) -> Self {
        assert!(bit_length > 0, "AtomicBitSet requires bit_length > 0");
        let words = std::iter::repeat_with(|| AtomicU64::new(0))
            .take(words_for_bits(bit_length))
            .collect();
        Self { words, bit_length }
    }

    /// Atomically sets bit `idx`, returning `true` if it was previously
    /// unset. Exactly one concurrent caller per bit observes `true`.
    ///
    /// # Panics
    ///
    /// Panics (debug) if `idx >= bit_length`.
    #[inline(always)]
    pub fn test_and_set(&self, idx: usize) -> bool {
        debug_assert!(idx < self.bit_length, "bit index out of bounds");
        let mask = 1u64 << (idx % 64);
        let prev = self.words[idx / 64].fetch_or(mask, Ordering::Relaxed);
        (prev & mask) == 0
    }

    /// Returns whether bit `idx` is set.
    ///
    /// # Panics
    ///
    /// Panics (debug) if `idx >= bit_length`.
    #[inline(always)]
    pub fn is_set(&self, idx: usize) -> bool {
        debug_assert!(idx < self.bit_length, "bit index out of bounds");
        let mask = 1u64 << (idx % 64);
        (self.words[idx / 64].load(Ordering::Relaxed) & mask) != 0
    }

    /// Counts set bits. Relaxed loads make this a snapshot: concurrent
    /// `test_and_set` calls may or may not be reflected.
    pub fn count(&self) -> usize {
        self.words
            .iter()
            .map(|w| w.load(Ordering::Relaxed).count_ones() as usize)
            .sum()
    }

    /// Number of addressable bits.
    #[inline]
    pub fn bit_length(&self) -> usize {
        self.bit_length
    }
}

#[cfg(test)]
#[path = "atomic_bitset_tests.rs"]
mod atomic_bitset_tests;
