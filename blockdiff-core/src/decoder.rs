//! Decoder loop: wire stream → reconstructed frames.
//!
//! Keeps the last fully reconstructed frame and applies each incoming
//! wire frame to it:
//!
//! - **Raw / LZ4** frames carry a complete frame and *replace* the state.
//! - **RLE** frames carry an XOR delta and are applied in place.
//!
//! The reconstructed frame is written to the output after every wire
//! frame, and throughput statistics are logged at a fixed interval.

use std::io::{Read, Write};
use std::time::{Duration, Instant};

use tracing::{info, trace, warn};

use crate::codec::{DecodedFrame, FrameReader, FrameTag};
use crate::delta::apply_delta;
use crate::error::BlockdiffError;
use crate::frame::{self, BlockSize};
use crate::stats::{Counters, DEFAULT_STATS_INTERVAL, StatsAccumulator};

// ── DecoderConfig ────────────────────────────────────────────────

/// Configuration for [`FrameDecoder`].
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Size of every frame.
    pub block_size: BlockSize,
    /// How often statistics are logged.
    pub stats_interval: Duration,
}

impl DecoderConfig {
    /// Defaults for the given frame size.
    pub fn new(block_size: BlockSize) -> Self {
        Self {
            block_size,
            stats_interval: DEFAULT_STATS_INTERVAL,
        }
    }
}

// ── DecoderState ─────────────────────────────────────────────────

/// The reconstructed frame plus scratch space for the next payload.
pub struct DecoderState {
    frame: Box<[u8]>,
    scratch: Box<[u8]>,
}

impl DecoderState {
    /// Allocate zeroed buffers for `block_size`.
    pub fn new(block_size: BlockSize) -> Result<Self, BlockdiffError> {
        Ok(Self {
            frame: frame::alloc_frame(block_size)?,
            scratch: frame::alloc_frame(block_size)?,
        })
    }

    /// Buffer the next payload is decoded into.
    pub fn scratch_mut(&mut self) -> &mut [u8] {
        &mut self.scratch
    }

    /// The reconstructed frame.
    pub fn frame(&self) -> &[u8] {
        &self.frame
    }

    /// Fold the decoded scratch buffer into the reconstructed frame.
    ///
    /// Keyframes replace the frame (by swapping buffers); deltas are
    /// XORed in.
    pub fn apply(&mut self, tag: FrameTag) {
        if tag.is_keyframe() {
            std::mem::swap(&mut self.frame, &mut self.scratch);
        } else {
            apply_delta(&mut self.frame, &self.scratch);
        }
    }
}

// ── FrameDecoder ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Bootstrap,
    Steady,
}

/// Owns the decoder state for one input stream.
pub struct FrameDecoder<R, W> {
    config: DecoderConfig,
    reader: FrameReader<R>,
    output: W,
    state: DecoderState,
    stats: StatsAccumulator,
    phase: Phase,
    malformed_frames: u64,
}

impl<R: Read, W: Write> FrameDecoder<R, W> {
    /// Allocate frame buffers and wrap `input` and `output`.
    pub fn new(config: DecoderConfig, input: R, output: W) -> Result<Self, BlockdiffError> {
        let state = DecoderState::new(config.block_size)?;
        let stats = StatsAccumulator::new(config.stats_interval);
        Ok(Self {
            config,
            reader: FrameReader::new(input),
            output,
            state,
            stats,
            phase: Phase::Bootstrap,
            malformed_frames: 0,
        })
    }

    /// Run until the input ends cleanly. Protocol errors abort the run.
    ///
    /// Returns the lifetime counters.
    pub fn run(&mut self) -> Result<Counters, BlockdiffError> {
        info!(
            block_size = self.config.block_size.bytes(),
            "decoder started"
        );

        loop {
            let now = Instant::now();
            if let Some(report) = self.stats.maybe_report(now) {
                info!("{report}");
            }

            let Some(frame) = self.decode_next()? else {
                break;
            };
            trace!(
                tag = %frame.tag,
                bytes = frame.bytes_consumed,
                elapsed_us = now.elapsed().as_micros() as u64,
                "frame applied"
            );
        }

        let summary = self.stats.summary(Instant::now());
        info!("decoder finished: {summary}");
        if self.malformed_frames > 0 {
            warn!(
                malformed = self.malformed_frames,
                "stream contained RLE frames that did not match the block size"
            );
        }
        Ok(self.stats.total())
    }

    /// Decode, apply and emit one wire frame. `None` at end of stream.
    pub fn decode_next(&mut self) -> Result<Option<DecodedFrame>, BlockdiffError> {
        let Some(frame) = self.reader.read_frame(self.state.scratch_mut())? else {
            return Ok(None);
        };

        if frame.is_malformed_rle() {
            self.malformed_frames += 1;
            warn!(
                overrun = frame.overrun_words,
                underfilled = frame.underfilled_words,
                "rle run lengths disagree with block size"
            );
        }

        self.state.apply(frame.tag);

        let keyframe = self.phase == Phase::Bootstrap || frame.tag.is_keyframe();
        self.phase = Phase::Steady;
        self.stats.record(frame.bytes_consumed, keyframe);

        self.output.write_all(self.state.frame())?;
        self.output.flush()?;
        Ok(Some(frame))
    }

    /// Counters for the run so far.
    pub fn stats(&self) -> &StatsAccumulator {
        &self.stats
    }

    /// The most recently reconstructed frame.
    pub fn frame(&self) -> &[u8] {
        self.state.frame()
    }

    /// RLE frames whose runs over- or under-filled the block.
    pub fn malformed_frames(&self) -> u64 {
        self.malformed_frames
    }

    pub fn get_output(&self) -> &W {
        &self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

/// Decode every wire frame of `input`, writing reconstructed frames to
/// `output`.
pub fn decode_stream<R: Read, W: Write>(
    config: DecoderConfig,
    input: R,
    output: W,
) -> Result<Counters, BlockdiffError> {
    FrameDecoder::new(config, input, output)?.run()
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::FrameWriter;
    use crate::delta::xor_delta;
    use std::io::Cursor;

    const BLOCK: usize = 32;

    fn decoder(stream: Vec<u8>) -> FrameDecoder<Cursor<Vec<u8>>, Vec<u8>> {
        let cfg = DecoderConfig::new(BlockSize::new(BLOCK).unwrap());
        FrameDecoder::new(cfg, Cursor::new(stream), Vec::new()).unwrap()
    }

    #[test]
    fn empty_stream_ends_cleanly() {
        let mut dec = decoder(Vec::new());
        let totals = dec.run().unwrap();
        assert_eq!(totals, Counters::default());
        assert!(dec.get_output().is_empty());
    }

    #[test]
    fn keyframe_replaces_and_delta_xors() {
        let f0: Vec<u8> = (0..BLOCK as u8).collect();
        let f1: Vec<u8> = f0.iter().map(|b| b.wrapping_add(1)).collect();
        let f2 = vec![0xEE; BLOCK];
        let mut d = vec![0u8; BLOCK];
        xor_delta(&f1, &f0, &mut d);

        let mut w = FrameWriter::new(Vec::new());
        w.write_raw(&f0).unwrap();
        w.write_rle(&d).unwrap();
        w.write_lz4(&f2).unwrap();
        let mut dec = decoder(w.into_inner());

        dec.decode_next().unwrap().unwrap();
        assert_eq!(dec.frame(), &f0[..]);
        dec.decode_next().unwrap().unwrap();
        assert_eq!(dec.frame(), &f1[..]);
        dec.decode_next().unwrap().unwrap();
        assert_eq!(dec.frame(), &f2[..]);
        assert!(dec.decode_next().unwrap().is_none());

        let out = dec.into_output();
        assert_eq!(out, [f0, f1, f2].concat());
    }

    #[test]
    fn bootstrap_counts_as_keyframe() {
        // An RLE first frame applies against the zeroed state.
        let mut first = vec![0u8; BLOCK];
        first[4] = 9;
        let mut w = FrameWriter::new(Vec::new());
        w.write_rle(&first).unwrap();
        w.write_rle(&vec![0u8; BLOCK]).unwrap();
        let mut dec = decoder(w.into_inner());

        let totals = dec.run().unwrap();
        assert_eq!(totals.frames, 2);
        assert_eq!(totals.keyframes, 1);
        assert_eq!(dec.frame(), &first[..]);
    }

    #[test]
    fn malformed_tag_aborts() {
        let mut w = FrameWriter::new(Vec::new());
        w.write_raw(&vec![1u8; BLOCK]).unwrap();
        let mut stream = w.into_inner();
        stream.push(7);
        stream.extend_from_slice(&[0u8; BLOCK]);

        let mut dec = decoder(stream);
        let err = dec.run().unwrap_err();
        assert!(matches!(err, BlockdiffError::UnknownTag(7)));
        // The good frame before the corruption was still emitted.
        assert_eq!(dec.get_output().len(), BLOCK);
    }

    #[test]
    fn overrun_is_counted_not_fatal() {
        let mut stream = vec![FrameTag::Rle as u8];
        stream.extend_from_slice(&100u32.to_le_bytes());
        stream.extend_from_slice(&0x0101_0101u32.to_le_bytes());
        stream.extend_from_slice(&0u32.to_le_bytes());

        let mut dec = decoder(stream);
        dec.run().unwrap();
        assert_eq!(dec.malformed_frames(), 1);
        assert!(dec.frame().iter().all(|&b| b == 1));
    }
}
