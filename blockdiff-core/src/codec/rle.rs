//! Word-level run-length encoding of XOR deltas.
//!
//! A delta between similar frames is mostly zero words, so it collapses
//! into a handful of `(run_length, value)` pairs:
//!
//! ```text
//! tag:u8 = 1
//! (run_length:u32 value:u32)*
//! run_length:u32 = 0            terminator, no value follows
//! ```
//!
//! Runs are capped at [`MAX_RUN`] words so that a run length can never
//! wrap around to the terminator value.

use std::io::Read;

use bytes::{BufMut, BytesMut};

use crate::codec::{FrameTag, read_u32};
use crate::error::BlockdiffError;
use crate::frame::{self, WORD_SIZE};

/// Longest run emitted as a single pair.
pub const MAX_RUN: u32 = 1 << 30;

/// Size of one `(run_length, value)` pair on the wire.
const PAIR_SIZE: usize = 8;

/// Append an RLE wire frame for `delta` to `dst` and return its size.
///
/// `delta` must be a non-empty whole number of words.
pub fn encode_rle(delta: &[u8], dst: &mut BytesMut) -> Result<usize, BlockdiffError> {
    if delta.is_empty() {
        return Err(BlockdiffError::InvalidBlockSize {
            size: 0,
            reason: "must be at least 4 bytes",
        });
    }
    if delta.len() % WORD_SIZE != 0 {
        return Err(BlockdiffError::InvalidBlockSize {
            size: delta.len(),
            reason: "not a multiple of 4",
        });
    }
    Ok(encode_runs(frame::words(delta), MAX_RUN, dst))
}

/// Run-length encode `words`, splitting runs longer than `max_run`.
pub(crate) fn encode_runs<I>(words: I, max_run: u32, dst: &mut BytesMut) -> usize
where
    I: IntoIterator<Item = u32>,
{
    let start = dst.len();
    dst.put_u8(FrameTag::Rle as u8);

    let mut words = words.into_iter();
    if let Some(first) = words.next() {
        let mut value = first;
        let mut run: u32 = 1;
        for word in words {
            if word == value && run < max_run {
                run += 1;
            } else {
                put_pair(dst, run, value);
                value = word;
                run = 1;
            }
        }
        put_pair(dst, run, value);
    }

    dst.put_u32_le(0);
    dst.len() - start
}

#[inline]
fn put_pair(dst: &mut BytesMut, run: u32, value: u32) {
    dst.reserve(PAIR_SIZE);
    dst.put_u32_le(run);
    dst.put_u32_le(value);
}

// ── Decoding ─────────────────────────────────────────────────────

/// Result of expanding one RLE payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RleDecode {
    /// Payload bytes read, terminator included.
    pub bytes_consumed: usize,
    /// Words requested by runs beyond the end of the buffer.
    pub overrun_words: u64,
    /// Buffer words left uncovered by runs (zeroed).
    pub underfilled_words: usize,
}

/// Expand an RLE payload (tag already consumed) into `buf`.
///
/// Runs that would write past the end of `buf` are clamped and the
/// dropped words are counted. Words no run reaches are set to zero so a
/// reused scratch buffer never leaks a stale delta.
pub(crate) fn decode_rle<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<RleDecode, BlockdiffError> {
    let capacity = buf.len() / WORD_SIZE;
    let mut cursor = 0usize;
    let mut bytes_consumed = 0usize;
    let mut overrun_words = 0u64;

    loop {
        let run = read_u32(reader, FrameTag::Rle, "run length")?;
        bytes_consumed += 4;
        if run == 0 {
            break;
        }
        let value = read_u32(reader, FrameTag::Rle, "run value")?;
        bytes_consumed += 4;

        let fill = (run as usize).min(capacity - cursor);
        let pattern = value.to_le_bytes();
        let span = &mut buf[cursor * WORD_SIZE..(cursor + fill) * WORD_SIZE];
        for word in span.chunks_exact_mut(WORD_SIZE) {
            word.copy_from_slice(&pattern);
        }
        cursor += fill;
        overrun_words += u64::from(run) - fill as u64;
    }

    buf[cursor * WORD_SIZE..].fill(0);

    Ok(RleDecode {
        bytes_consumed,
        overrun_words,
        underfilled_words: capacity - cursor,
    })
}

// ── Tests ────────────────────────────────────────────────────────
