//! Word-level XOR delta between consecutive frames.
//!
//! The encoder keeps two frame slots, `current` and `previous`, plus a
//! delta buffer. Each cycle the new frame is read into `current`, the
//! delta is computed against `previous`, and the slots swap roles so the
//! frame just sent becomes the reference for the next one. Swapping moves
//! the boxed buffers, never their contents.

use crate::error::BlockdiffError;
use crate::frame::{self, BlockSize, WORD_SIZE};

// ── Free functions ───────────────────────────────────────────────

/// Write `current ^ previous` into `delta` word by word and return the
/// number of words that differ.
///
/// All three buffers must have the same length.
pub fn xor_delta(current: &[u8], previous: &[u8], delta: &mut [u8]) -> usize {
    debug_assert_eq!(current.len(), previous.len());
    debug_assert_eq!(current.len(), delta.len());

    let mut changed = 0;
    for ((out, cur), prev) in delta
        .chunks_exact_mut(WORD_SIZE)
        .zip(current.chunks_exact(WORD_SIZE))
        .zip(previous.chunks_exact(WORD_SIZE))
    {
        let diff = frame::word(cur) ^ frame::word(prev);
        out.copy_from_slice(&diff.to_le_bytes());
        changed += (diff != 0) as usize;
    }
    changed
}

/// XOR `delta` into `frame` in place, undoing [`xor_delta`].
pub fn apply_delta(frame: &mut [u8], delta: &[u8]) {
    debug_assert_eq!(frame.len(), delta.len());
    for (dst, d) in frame.iter_mut().zip(delta) {
        *dst ^= d;
    }
}

// ── EncoderState ─────────────────────────────────────────────────

/// Double-buffered frame state owned by the encoder loop.
///
/// All three buffers are allocated once from a validated [`BlockSize`]
/// and live as long as the state itself.
pub struct EncoderState {
    current: Box<[u8]>,
    previous: Box<[u8]>,
    delta: Box<[u8]>,
    block_size: BlockSize,
}

impl EncoderState {
    /// Allocate the frame slots for `block_size`.
    pub fn new(block_size: BlockSize) -> Result<Self, BlockdiffError> {
        Ok(Self {
            current: frame::alloc_frame(block_size)?,
            previous: frame::alloc_frame(block_size)?,
            delta: frame::alloc_frame(block_size)?,
            block_size,
        })
    }

    /// Frame size of every slot.
    pub fn block_size(&self) -> BlockSize {
        self.block_size
    }

    /// The slot the next frame is read into.
    pub fn current_mut(&mut self) -> &mut [u8] {
        &mut self.current
    }

    /// The most recently captured frame.
    pub fn current(&self) -> &[u8] {
        &self.current
    }

    /// The frame last sent to the decoder.
    pub fn previous(&self) -> &[u8] {
        &self.previous
    }

    /// The delta produced by the last [`diff`](Self::diff).
    pub fn delta(&self) -> &[u8] {
        &self.delta
    }

    /// Compute `current ^ previous` into the delta slot and return the
    /// number of changed words.
    pub fn diff(&mut self) -> usize {
        xor_delta(&self.current, &self.previous, &mut self.delta)
    }

    /// Exchange the roles of `current` and `previous`.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.previous);
    }
}

// ── Tests ────────────────────────────────────────────────────────
