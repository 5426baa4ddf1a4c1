//! Unit and race tests for [`AtomicBitSet`].
//!
//! Verifies:
//! - Roundtrip correctness (`test_and_set` / `is_set`)
//! - Exactly-one-winner semantics under contention
//! - Bit independence across word boundaries
//! - `count` consistency

use super::{words_for_bits, AtomicBitSet};
use std::sync::Arc;
use std::thread;

#[test]
fn words_for_bits_rounds_up() {
    assert_eq!(words_for_bits(1), 1);
    assert_eq!(words_for_bits(64), 1);
    assert_eq!(words_for_bits(65), 2);
    assert_eq!(words_for_bits(129), 3);
}

#[test]
fn test_and_set_roundtrip() {
    let bits = AtomicBitSet::empty(129);
    for idx in [0, 1, 63, 64, 65, 127, 128] {
        assert!(!bits.is_set(idx));
        assert!(bits.test_and_set(idx));
        assert!(bits.is_set(idx));
    }
}

#[test]
fn second_set_loses() {
    let bits = AtomicBitSet::empty(64);
    assert!(bits.test_and_set(7));
    assert!(!bits.test_and_set(7));
    assert!(!bits.test_and_set(7));
}

#[test]
fn bits_are_independent_across_words() {
    let bits = AtomicBitSet::empty(256);
    assert!(bits.test_and_set(63));
    assert!(bits.test_and_set(64));
    assert!(!bits.is_set(62));
    assert!(!bits.is_set(65));
    assert!(!bits.is_set(127));
    assert_eq!(bits.count(), 2);
}

#[test]
fn count_matches_distinct_sets() {
    let bits = AtomicBitSet::empty(1_000);
    for idx in (0..1_000).step_by(7) {
        bits.test_and_set(idx);
        bits.test_and_set(idx); // repeats must not inflate the count
    }
    assert_eq!(bits.count(), (0..1_000).step_by(7).count());
}

/// Many threads hammer the same bit range; every bit must end up set and
/// the total number of "won" observations must equal the number of bits.
#[test]
fn exactly_one_winner_per_bit_under_contention() {
    const BITS: usize = 4_096;
    const THREADS: usize = 8;

    let set = Arc::new(AtomicBitSet::empty(BITS));
    let mut handles = Vec::new();
    for _ in 0..THREADS {
        let set = Arc::clone(&set);
        handles.push(thread::spawn(move || {
            let mut wins = 0usize;
            for idx in 0..BITS {
                if set.test_and_set(idx) {
                    wins += 1;
                }
            }
            wins
        }));
    }

    let total_wins: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(total_wins, BITS);
    assert_eq!(set.count(), BITS);
}

#[test]
#[should_panic]
fn zero_capacity_panics() {
    let _ = AtomicBitSet::empty(0);
}
