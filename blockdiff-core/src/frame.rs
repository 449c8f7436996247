//! Frame geometry shared by every stage of the pipeline.
//!
//! A frame is an opaque buffer of exactly `block_size` bytes. The delta
//! and RLE stages view it as a sequence of little-endian `u32` words, so
//! the block size must be a whole number of words.

use std::fmt;

use crate::error::BlockdiffError;

// ── Constants ────────────────────────────────────────────────────

/// Bytes per word. XOR and RLE operate at this granularity.
pub const WORD_SIZE: usize = 4;

// ── BlockSize ────────────────────────────────────────────────────

/// A validated frame size in bytes.
///
/// Non-zero, a multiple of [`WORD_SIZE`], and small enough to be carried
/// in the `u32` size field of an LZ4 keyframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockSize(usize);

impl BlockSize {
    /// Validate `bytes` as a frame size.
    pub fn new(bytes: usize) -> Result<Self, BlockdiffError> {
        if bytes < WORD_SIZE {
            return Err(BlockdiffError::InvalidBlockSize {
                size: bytes,
                reason: "must be at least 4 bytes",
            });
        }
        if bytes % WORD_SIZE != 0 {
            return Err(BlockdiffError::InvalidBlockSize {
                size: bytes,
                reason: "not a multiple of 4",
            });
        }
        if u32::try_from(bytes).is_err() {
            return Err(BlockdiffError::InvalidBlockSize {
                size: bytes,
                reason: "does not fit in a u32 size field",
            });
        }
        Ok(Self(bytes))
    }

    /// Frame size in bytes.
    pub const fn bytes(self) -> usize {
        self.0
    }

    /// Frame size in words.
    pub const fn words(self) -> usize {
        self.0 / WORD_SIZE
    }
}

impl fmt::Display for BlockSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bytes", self.0)
    }
}

impl TryFrom<usize> for BlockSize {
    type Error = BlockdiffError;

    fn try_from(bytes: usize) -> Result<Self, Self::Error> {
        Self::new(bytes)
    }
}

// ── Buffers ──────────────────────────────────────────────────────

/// Allocate one zeroed frame buffer, failing instead of aborting when
/// the allocator refuses.
pub fn alloc_frame(size: BlockSize) -> Result<Box<[u8]>, BlockdiffError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(size.bytes())
        .map_err(|_| BlockdiffError::OutOfMemory(size.bytes()))?;
    buf.resize(size.bytes(), 0);
    Ok(buf.into_boxed_slice())
}

/// Read the little-endian word stored in the first four bytes of `bytes`.
#[inline]
pub fn word(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Iterate the words of a frame-shaped buffer.
///
/// Trailing bytes that do not form a whole word are ignored.
pub fn words(buf: &[u8]) -> impl Iterator<Item = u32> + '_ {
    buf.chunks_exact(WORD_SIZE).map(word)
}

// ── Tests ────────────────────────────────────────────────────────
