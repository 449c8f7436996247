//! # blockdiff-core
//!
//! Core library for streaming fixed-size frames (typically framebuffer
//! snapshots) over a byte pipe as XOR deltas.
//!
//! ```text
//! FrameSource ─► FrameEncoder ─► wire stream ─► FrameDecoder ─► frames
//!                  │  XOR delta vs previous frame
//!                  │  < threshold changed words → RLE delta
//!                  └  otherwise                   → Raw / LZ4 keyframe
//! ```
//!
//! This crate contains:
//! - **Frame**: `BlockSize`, word helpers and fallible buffer allocation
//! - **Delta**: word-wise XOR and the double-buffered `EncoderState`
//! - **Codec**: the tagged wire format (Raw, RLE, LZ4), `FrameReader`, `FrameWriter`
//! - **Encoder / Decoder**: the two stream loops with their configs
//! - **Source**: rewinding (device) and sequential (pipe) frame sources
//! - **Stats**: windowed frame / keyframe / byte counters
//! - **Error**: `BlockdiffError`: typed, `thiserror`-based error hierarchy

pub mod codec;
pub mod decoder;
pub mod delta;
pub mod encoder;
pub mod error;
pub mod frame;
pub mod source;
pub mod stats;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::{
    DecodedFrame, FrameReader, FrameTag, FrameWriter, KeyframeEncoding, MAX_RUN, WrittenFrame,
    decode, encode_lz4, encode_raw, encode_rle,
};
pub use decoder::{DecoderConfig, DecoderState, FrameDecoder, decode_stream};
pub use delta::{EncoderState, apply_delta, xor_delta};
pub use encoder::{
    DEFAULT_MAX_DELTAS_FOR_RLE, DEFAULT_TARGET_FPS, EncodedFrame, EncoderConfig, FrameEncoder,
    encode_stream, frame_interval,
};
pub use error::BlockdiffError;
pub use frame::{BlockSize, WORD_SIZE};
pub use source::{FrameSource, RewindingSource, StreamSource};
pub use stats::{Counters, DEFAULT_STATS_INTERVAL, StatsAccumulator, StatsReport};
