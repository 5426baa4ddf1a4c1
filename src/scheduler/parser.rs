//! Chunk parsing: byte range -> interior tokens + boundary fragments.
//!
//! Each parser task owns one [`ChunkSpec`]. It opens its own file
//! handle, reads exactly its byte range, and splits the buffer on
//! `\n`/`\r`. Because ranges are disjoint and every task has a private
//! handle and buffer, no synchronization is needed on the read path.
//!
//! # Fragment rules
//!
//! - The first non-empty token of a chunk is always the start fragment
//!   and is never enqueued: the parser cannot know whether the previous
//!   chunk ended mid-line.
//! - The last non-empty token with no bytes remaining after it (its
//!   terminator, if any, was the final byte) is the end fragment and is
//!   never enqueued, for the mirror-image reason.
//! - A single-token chunk records only the start fragment; its end
//!   fragment stays empty and merges as the identity during resolution.
//!   Recording the token on both sides would count it twice once the
//!   resolver emits both fragments.
//! - Everything in between is an interior token: validated here,
//!   enqueued if valid, silently dropped otherwise.
//!
//! # Degraded chunks
//!
//! A chunk that fails to read still publishes (empty) fragments and
//! still releases the completion gate, so a single bad sector cannot
//! deadlock the orchestrator. The failure is recorded in the shared
//! error counter and surfaced in the final report.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use memchr::memchr2;

use crate::codec;
use crate::stdx::CountdownLatch;

use super::chunking::{ChunkFragments, ChunkSpec, FragmentTable};
use super::dedup::TokenSender;

/// State shared by every parser task of one scan.
pub struct ParserContext {
    pub path: PathBuf,
    pub fragments: Arc<FragmentTable>,
    pub tokens: TokenSender,
    pub gate: Arc<CountdownLatch>,
    /// Chunks that failed to read (fail-soft policy).
    pub io_errors: AtomicU64,
}

/// Parses one chunk end to end.
///
/// Releases the completion gate exactly once, on every path.
pub fn parse_chunk(ctx: &ParserContext, spec: ChunkSpec) {
    match read_chunk(&ctx.path, spec) {
        Ok(buf) => {
            let fragments = scan_tokens(&buf, |token| ctx.tokens.send(token));
            ctx.fragments.publish(spec.sequence, fragments);
        }
        Err(err) => {
            ctx.io_errors.fetch_add(1, Ordering::Relaxed);
            eprintln!(
                "ipscan: chunk {} read failed at offset {}: {}",
                spec.sequence, spec.offset, err
            );
            ctx.fragments.publish(spec.sequence, ChunkFragments::default());
        }
    }
    ctx.gate.count_down();
}

/// Reads the chunk's byte range into a private buffer.
///
/// A short read can only happen at end of file (the partitioner sizes
/// the last chunk to the remaining bytes), so `take` + `read_to_end` is
/// exact for every chunk.
fn read_chunk(path: &PathBuf, spec: ChunkSpec) -> io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(spec.offset))?;
    let mut buf = Vec::with_capacity(spec.len);
    file.take(spec.len as u64).read_to_end(&mut buf)?;
    Ok(buf)
}

/// Splits `buf` into line tokens and applies the fragment rules,
/// passing validated interior tokens to `emit`.
///
/// Also used (with a discarding `emit`) by the thread-count estimator to
/// reproduce the real per-chunk parse cost.
pub fn scan_tokens(buf: &[u8], mut emit: impl FnMut(String)) -> ChunkFragments {
    let mut fragments = ChunkFragments::default();
    let mut rows = 0u64;
    for_each_token(buf, |token, at_buffer_end| {
        rows += 1;
        if rows == 1 {
            fragments.start = String::from_utf8_lossy(token).into_owned();
        } else if at_buffer_end {
            fragments.end = String::from_utf8_lossy(token).into_owned();
        } else if let Ok(text) = std::str::from_utf8(token) {
            if codec::validate(text) {
                emit(text.to_owned());
            }
        }
    });
    fragments
}

/// Calls `f(token, at_buffer_end)` for each non-empty token in `buf`.
///
/// Tokens are maximal runs of bytes between `\n`/`\r` terminators; a
/// trailing run with no terminator is still a token. `at_buffer_end` is
/// true when no bytes remain after the token and its terminator, which
/// is exactly the "possibly cut off by the chunk boundary" condition.
pub fn for_each_token(buf: &[u8], mut f: impl FnMut(&[u8], bool)) {
    let mut pos = 0;
    while pos < buf.len() {
        let (end, next) = match memchr2(b'\n', b'\r', &buf[pos..]) {
            Some(i) => (pos + i, pos + i + 1),
            None => (buf.len(), buf.len()),
        };
        let token = &buf[pos..end];
        pos = next;
        if !token.is_empty() {
            f(token, pos >= buf.len());
        }
    }
}
