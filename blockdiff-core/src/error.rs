//! Domain-specific error types for the blockdiff codec.
//!
//! All fallible operations return `Result<T, BlockdiffError>`.
//! End-of-stream is never an error: decoders report it as `None` and
//! frame sources as `false`.

use thiserror::Error;

use crate::codec::FrameTag;

/// The canonical error type for blockdiff.
#[derive(Debug, Error)]
pub enum BlockdiffError {
    // ── Configuration Errors ─────────────────────────────────────
    /// The configured block size cannot be used as a frame size.
    #[error("invalid block size {size}: {reason}")]
    InvalidBlockSize { size: usize, reason: &'static str },

    /// Any other rejected configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The frame buffers for the configured block size could not be allocated.
    #[error("cannot allocate {0} bytes of frame buffers")]
    OutOfMemory(usize),

    // ── I/O Errors ───────────────────────────────────────────────
    /// The underlying pipe, file or device reported an error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    // ── Protocol Errors ──────────────────────────────────────────
    /// The leading byte of a wire frame is not a known tag.
    #[error("unknown frame tag {0:#04x}")]
    UnknownTag(u8),

    /// The stream ended in the middle of a wire frame.
    #[error("stream truncated inside {tag} frame while reading {part}")]
    Truncated { tag: FrameTag, part: &'static str },

    /// An LZ4 header announced a frame size other than the block size.
    #[error("lz4 frame announces {actual} bytes, block size is {expected}")]
    Lz4SizeMismatch { expected: usize, actual: usize },

    /// An LZ4 header announced more compressed bytes than any block can need.
    #[error("lz4 payload of {size} bytes exceeds bound of {max}")]
    Lz4CompressedTooLarge { size: usize, max: usize },

    /// The LZ4 payload could not be decompressed.
    #[error("lz4 decompression failed: {0}")]
    Lz4Decompress(#[from] lz4_flex::block::DecompressError),

    /// The LZ4 payload decompressed to fewer bytes than announced.
    #[error("lz4 payload decompressed to {actual} bytes, expected {expected}")]
    Lz4ShortOutput { expected: usize, actual: usize },
}

impl BlockdiffError {
    /// Whether this error means the wire stream itself is corrupt.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            BlockdiffError::UnknownTag(_)
                | BlockdiffError::Truncated { .. }
                | BlockdiffError::Lz4SizeMismatch { .. }
                | BlockdiffError::Lz4CompressedTooLarge { .. }
                | BlockdiffError::Lz4Decompress(_)
                | BlockdiffError::Lz4ShortOutput { .. }
        )
    }

    /// Whether this error was raised while validating configuration.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            BlockdiffError::InvalidBlockSize { .. } | BlockdiffError::InvalidConfig(_)
        )
    }
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for BlockdiffError {
    fn from(s: String) -> Self {
        BlockdiffError::InvalidConfig(s)
    }
}

impl From<&str> for BlockdiffError {
    fn from(s: &str) -> Self {
        BlockdiffError::InvalidConfig(s.to_string())
    }
}
