//! File partitioning and boundary-fragment storage.
//!
//! # Chunk semantics
//!
//! The input file is cut into fixed-size byte ranges with no overlap;
//! `N = ceil(file_size / chunk_size)` and only the last chunk may be
//! shorter. Chunk boundaries ignore line structure entirely: a line can
//! be split across two chunks, which is what the boundary-fragment
//! machinery below reconciles after all chunks have been parsed.
//!
//! # Fragment table ordering invariant
//!
//! Exactly one [`ChunkFragments`] slot exists per chunk, addressed by
//! sequence number. The owning parser publishes its slot once, after it
//! has consumed its whole byte range; the resolver reads the slots only
//! after the completion gate reaches zero. The gate's happens-before
//! edge means no slot is ever read while being written.

use std::sync::OnceLock;

/// One contiguous byte range of the input file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkSpec {
    /// Ordinal `0..N-1`, assigned in file order.
    pub sequence: usize,
    /// Absolute byte offset of the range start.
    pub offset: u64,
    /// Bytes in the range. Equal to the configured chunk size except
    /// possibly for the last chunk.
    pub len: usize,
}

/// Cuts `file_size` bytes into chunk specs of at most `chunk_size`.
///
/// Returns an empty vector for an empty file.
///
/// # Panics
///
/// Panics if `chunk_size` is zero.
pub fn partition(file_size: u64, chunk_size: usize) -> Vec<ChunkSpec> {
    assert!(chunk_size > 0, "chunk_size must be > 0");
    let chunk_size_u64 = chunk_size as u64;
    let count = file_size.div_ceil(chunk_size_u64) as usize;

    let mut chunks = Vec::with_capacity(count);
    let mut offset = 0u64;
    for sequence in 0..count {
        let len = (file_size - offset).min(chunk_size_u64) as usize;
        chunks.push(ChunkSpec {
            sequence,
            offset,
            len,
        });
        offset += len as u64;
    }
    chunks
}

/// The possibly-partial first and last records of one chunk.
///
/// Either field may be empty: a chunk whose single record is its first
/// token records only `start` (the start assignment governs), and a
/// chunk that ends exactly on a line terminator whose final token was
/// already consumed as an interior token leaves `end` empty. Empty
/// fragments merge as the identity during resolution.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChunkFragments {
    /// First non-empty token of the chunk, never enqueued by the parser.
    pub start: String,
    /// Last non-empty token sitting at the very end of the chunk's byte
    /// range, never enqueued by the parser.
    pub end: String,
}

/// Pre-sized table of one fragment slot per chunk.
///
/// A fixed array of `OnceLock` slots: `N` is known before any task
/// starts, so there is no need for a concurrent map. Each slot is
/// written exactly once by its owning parser and read only after the
/// completion gate clears.
pub struct FragmentTable {
    slots: Vec<OnceLock<ChunkFragments>>,
}

impl FragmentTable {
    pub fn new(chunks: usize) -> Self {
        let mut slots = Vec::with_capacity(chunks);
        slots.resize_with(chunks, OnceLock::new);
        Self { slots }
    }

    /// Number of chunk slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Publishes the fragments for `sequence`. Each slot has exactly one
    /// owner, so a second publish indicates a task-dispatch bug.
    ///
    /// # Panics
    ///
    /// Panics if the slot was already published or `sequence` is out of
    /// range.
    pub fn publish(&self, sequence: usize, fragments: ChunkFragments) {
        self.slots[sequence]
            .set(fragments)
            .expect("fragment slot published twice");
    }

    /// Reads the fragments for `sequence`; `None` if the owning parser
    /// has not published yet (only possible before the gate clears, or
    /// for a chunk whose parser failed before publishing).
    pub fn get(&self, sequence: usize) -> Option<&ChunkFragments> {
        self.slots[sequence].get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partitions_exact_multiple() {
        let chunks = partition(30, 10);
        assert_eq!(chunks.len(), 3);
        assert_eq!(
            chunks[0],
            ChunkSpec {
                sequence: 0,
                offset: 0,
                len: 10
            }
        );
        assert_eq!(chunks[2].offset, 20);
        assert_eq!(chunks[2].len, 10);
    }

    #[test]
    fn last_chunk_is_shorter() {
        let chunks = partition(25, 10);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].offset, 20);
        assert_eq!(chunks[2].len, 5);
    }

    #[test]
    fn single_short_file_is_one_chunk() {
        let chunks = partition(7, 1024);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len, 7);
    }

    #[test]
    fn empty_file_has_no_chunks() {
        assert!(partition(0, 1024).is_empty());
    }

    #[test]
    fn chunks_tile_the_file() {
        let chunks = partition(1_000_003, 4_096);
        let mut expected_offset = 0u64;
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.sequence, i);
            assert_eq!(chunk.offset, expected_offset);
            expected_offset += chunk.len as u64;
        }
        assert_eq!(expected_offset, 1_000_003);
    }

    #[test]
    fn fragment_slots_publish_once() {
        let table = FragmentTable::new(2);
        assert!(table.get(0).is_none());
        table.publish(
            0,
            ChunkFragments {
                start: "10.0".into(),
                end: "0.1".into(),
            },
        );
        let frags = table.get(0).unwrap();
        assert_eq!(frags.start, "10.0");
        assert_eq!(frags.end, "0.1");
        assert!(table.get(1).is_none());
    }

    #[test]
    #[should_panic]
    fn double_publish_panics() {
        let table = FragmentTable::new(1);
        table.publish(0, ChunkFragments::default());
        table.publish(0, ChunkFragments::default());
    }
}
