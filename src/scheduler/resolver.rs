//! Boundary-fragment resolution.
//!
//! Runs exactly once per scan, after the completion gate has reached
//! zero, so every fragment slot is published and immutable. Fragments
//! are walked in sequence order; adjacent pairs decide whether the chunk
//! boundary fell on a line terminator (both sides are complete
//! addresses) or split one address (concatenate the halves).
//!
//! The resolver never counts anything itself. Every token it emits goes
//! back through the same queue and the same validate/encode path as
//! interior tokens, so an invalid merge is dropped downstream exactly
//! like a malformed input line.

use crate::codec;

use super::chunking::{ChunkFragments, FragmentTable};
use super::dedup::TokenSender;

/// Reconciles all boundary fragments into tokens.
///
/// Emission order is sequence order, which is what makes adjacent pairs
/// line up; the dedup stage itself is order-independent.
pub fn resolve(fragments: &FragmentTable, tokens: &TokenSender) {
    let count = fragments.len();
    if count == 0 {
        return;
    }

    let fragment = |i: usize| -> ChunkFragments {
        // A missing slot can only be a chunk that failed before
        // publishing; treat it as empty on both sides.
        fragments.get(i).cloned().unwrap_or_default()
    };

    // The file's very first record is always a complete line.
    let first = fragment(0).start;
    if !first.is_empty() {
        tokens.send(first);
    }

    if count == 1 {
        // No pairs to reconcile; the end fragment (the file's last
        // record) just needs to be released.
        let end = fragment(0).end;
        if !end.is_empty() {
            tokens.send(end);
        }
        return;
    }

    for i in 0..count - 1 {
        let a = fragment(i).end;
        let b = fragment(i + 1).start;

        if codec::validate(&a) && codec::validate(&b) {
            // Boundary coincided with a line terminator: two complete,
            // independent records.
            tokens.send(b);
            tokens.send(a);
        } else {
            // Boundary split one record; empty sides merge as identity.
            let merged = format!("{a}{b}");
            if !merged.is_empty() {
                tokens.send(merged);
            }
        }

        if i + 1 == count - 1 {
            let last = fragment(count - 1).end;
            if !last.is_empty() {
                tokens.send(last);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::chunking::ChunkFragments;
    use crate::scheduler::dedup::token_queue;

    /// Runs the resolver and captures emitted tokens in order.
    fn resolve_capturing(slots: Vec<ChunkFragments>) -> Vec<String> {
        let table = FragmentTable::new(slots.len());
        for (i, frags) in slots.into_iter().enumerate() {
            table.publish(i, frags);
        }
        let (tx, rx) = token_queue(1024);
        resolve(&table, &tx);
        drop(tx);
        let mut out = Vec::new();
        while let Ok(token) = rx.rx.try_recv() {
            rx.gate.done();
            out.push(token);
        }
        out
    }

    fn frags(start: &str, end: &str) -> ChunkFragments {
        ChunkFragments {
            start: start.into(),
            end: end.into(),
        }
    }

    #[test]
    fn empty_table_emits_nothing() {
        assert!(resolve_capturing(Vec::new()).is_empty());
    }

    #[test]
    fn single_chunk_releases_both_fragments() {
        let out = resolve_capturing(vec![frags("10.0.0.1", "10.0.0.2")]);
        assert_eq!(out, vec!["10.0.0.1", "10.0.0.2"]);
    }

    #[test]
    fn single_chunk_with_empty_end_releases_start_only() {
        let out = resolve_capturing(vec![frags("10.0.0.1", "")]);
        assert_eq!(out, vec!["10.0.0.1"]);
    }

    #[test]
    fn terminator_aligned_boundary_keeps_both_records() {
        let out = resolve_capturing(vec![frags("1.1.1.1", "2.2.2.2"), frags("3.3.3.3", "4.4.4.4")]);
        // start[0], then (b, a) for the pair, then end[N-1].
        assert_eq!(out, vec!["1.1.1.1", "3.3.3.3", "2.2.2.2", "4.4.4.4"]);
    }

    #[test]
    fn split_boundary_merges_halves() {
        let out = resolve_capturing(vec![frags("1.1.1.1", "10.0"), frags(".0.2", "9.9.9.9")]);
        assert_eq!(out, vec!["1.1.1.1", "10.0.0.2", "9.9.9.9"]);
    }

    #[test]
    fn empty_side_merges_as_identity() {
        // Chunk 0 was a single-record chunk: end is empty, so its
        // neighbor's start passes through the merge untouched.
        let out = resolve_capturing(vec![frags("1.1.1.1", ""), frags("2.2.2.2", "3.3.3.3")]);
        assert_eq!(out, vec!["1.1.1.1", "2.2.2.2", "3.3.3.3"]);
    }

    #[test]
    fn unpublished_slot_acts_as_empty() {
        let table = FragmentTable::new(2);
        table.publish(0, frags("1.1.1.1", "5.5"));
        // slot 1 never published (degraded chunk)
        let (tx, rx) = token_queue(16);
        resolve(&table, &tx);
        drop(tx);
        let mut out = Vec::new();
        while let Ok(token) = rx.rx.try_recv() {
            rx.gate.done();
            out.push(token);
        }
        assert_eq!(out, vec!["1.1.1.1", "5.5"]);
    }

    #[test]
    fn three_chunk_chain_pairs_in_sequence_order() {
        let out = resolve_capturing(vec![
            frags("1.1.1.1", "2.2"),
            frags(".2.2", "3.3.3.3"),
            frags("4.4.4.4", "5.5.5.5"),
        ]);
        assert_eq!(
            out,
            vec!["1.1.1.1", "2.2.2.2", "4.4.4.4", "3.3.3.3", "5.5.5.5"]
        );
    }
}
