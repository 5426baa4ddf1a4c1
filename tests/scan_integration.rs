//! End-to-end scan scenarios.
//!
//! The key property is chunk-size invariance: the `(unique, total)`
//! summary must not depend on where chunk boundaries fall, including
//! boundaries that split an address mid-digit or coincide exactly with
//! a line terminator.

use std::io::Write;
use std::sync::{Arc, Mutex};

use ipscan_rs::memstats::FixedMemory;
use ipscan_rs::scheduler::AddressSummary;
use ipscan_rs::{ScanConfig, ScanOrchestrator};

// Each scan allocates the full-domain dedup bitmap (512 MiB); serialize
// scans so parallel test threads do not stack those allocations.
static SCAN_LOCK: Mutex<()> = Mutex::new(());

fn scan(contents: &[u8], chunk_size: usize) -> AddressSummary {
    let _guard = SCAN_LOCK.lock().unwrap();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents).unwrap();
    file.flush().unwrap();

    let config = ScanConfig {
        chunk_size,
        workers: Some(3),
        ..ScanConfig::default()
    };
    let orchestrator = ScanOrchestrator::new(config)
        .with_memory(Arc::new(FixedMemory::new(1 << 40, 1 << 41)));
    let report = orchestrator.run(file.path()).unwrap();
    assert_eq!(report.io_errors, 0);
    report.summary
}

fn summary(unique: u64, total: u64) -> AddressSummary {
    AddressSummary { unique, total }
}

#[test]
fn three_lines_single_chunk() {
    // Whole file in one chunk.
    let s = scan(b"10.0.0.1\n10.0.0.1\n10.0.0.2\n", 1 << 20);
    assert_eq!(s, summary(2, 3));
}

#[test]
fn three_lines_split_inside_last_token() {
    // Byte 20 falls between "10" and ".0.0.2" of the third line.
    let s = scan(b"10.0.0.1\n10.0.0.1\n10.0.0.2\n", 20);
    assert_eq!(s, summary(2, 3));
}

#[test]
fn boundary_on_line_terminator_keeps_both_records() {
    // Chunk size 8 puts the boundary exactly on each '\n'.
    let s = scan(b"1.1.1.1\n2.2.2.2\n", 8);
    assert_eq!(s, summary(2, 2));
}

#[test]
fn invalid_octet_line_is_excluded() {
    let s = scan(b"1.2.3.4\n999.1.1.1\n5.6.7.8\n", 1 << 20);
    assert_eq!(s, summary(2, 2));
}

#[test]
fn junk_lines_are_excluded_at_any_chunk_size() {
    // Chunk sizes stay above twice the longest line: the fragment
    // scheme reassembles one split record per boundary, so every chunk
    // must hold at least two tokens for counts to be boundary-proof
    // (the production 5 MiB default is far above this for real files).
    let contents: &[u8] = b"hello\n1.2.3.4\nnot.an.ip.addr\n1.2.3.4\n256.1.1.1\n8.8.8.8\n";
    for chunk_size in [32, 64, 1 << 20] {
        assert_eq!(scan(contents, chunk_size), summary(2, 3), "chunk_size={chunk_size}");
    }
}

#[test]
fn terminator_aligned_boundary_with_interior_tokens() {
    // Chunk size 16 puts the boundary exactly after "2.2.2.2\n"; both
    // fragments around the boundary are complete addresses and must be
    // counted independently, neither merged nor dropped.
    let s = scan(b"1.1.1.1\n2.2.2.2\n3.3.3.3\n4.4.4.4\n", 16);
    assert_eq!(s, summary(4, 4));
}

#[test]
fn trailing_line_without_terminator_counts() {
    let s = scan(b"1.1.1.1\n2.2.2.2", 1 << 20);
    assert_eq!(s, summary(2, 2));
}

#[test]
fn carriage_return_terminators() {
    let s = scan(b"1.1.1.1\r2.2.2.2\r1.1.1.1\r", 1 << 20);
    assert_eq!(s, summary(2, 3));
}

#[test]
fn empty_file_is_zero_zero() {
    assert_eq!(scan(b"", 1 << 20), summary(0, 0));
}

#[test]
fn blank_and_invalid_only_file_is_zero_zero() {
    assert_eq!(scan(b"\n\nbogus\n\n999.999.999.999\n", 64), summary(0, 0));
}

#[test]
fn leading_zero_forms_collapse_to_one_address() {
    let s = scan(b"10.0.0.1\n010.0.0.1\n10.0.0.001\n", 1 << 20);
    assert_eq!(s, summary(1, 3));
}

/// Generates a deterministic file with known unique/total counts and
/// verifies the summary is identical across pathological chunk sizes.
#[test]
fn chunk_size_invariance_on_generated_file() {
    let mut contents = Vec::new();
    let mut total = 0u64;
    // 400 distinct addresses, each appearing 1 + (i % 3) times.
    for i in 0u64..400 {
        let line = format!("172.16.{}.{}\n", i / 256, i % 256);
        for _ in 0..(1 + i % 3) {
            contents.extend_from_slice(line.as_bytes());
            total += 1;
        }
    }

    let expected = scan(&contents, 1 << 20);
    assert_eq!(expected.unique, 400);
    assert_eq!(expected.total, total);

    // 32 B and 64 B put boundaries inside nearly every record; 4 KiB
    // exercises a mix of aligned and mid-token boundaries.
    for chunk_size in [32usize, 64, 4096] {
        assert_eq!(scan(&contents, chunk_size), expected, "chunk_size={chunk_size}");
    }
}

#[test]
fn full_octet_range_addresses_round_trip_through_scan() {
    let mut contents = Vec::new();
    for octet in [0u32, 1, 127, 128, 254, 255] {
        contents.extend_from_slice(format!("{0}.{0}.{0}.{0}\n", octet).as_bytes());
    }
    let s = scan(&contents, 1 << 20);
    assert_eq!(s, summary(6, 6));
    // Same file, boundaries inside tokens.
    assert_eq!(scan(&contents, 40), summary(6, 6));
}
