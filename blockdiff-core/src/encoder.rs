//! Encoder loop: frame source → XOR delta → wire stream.
//!
//! The loop is a two-state machine:
//!
//! - **Bootstrap** (once): the first frame has no predecessor, so it is
//!   sent as a keyframe.
//! - **Steady**: each new frame is XORed against the previous one. A
//!   delta with fewer than `max_deltas_for_rle` changed words goes out as
//!   RLE; anything busier sends the full frame as a keyframe instead.
//!
//! After every steady frame the loop sleeps for whatever is left of the
//! target frame interval. Overruns are absorbed, never made up.

use std::io::Write;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use crate::codec::{FrameTag, FrameWriter, KeyframeEncoding};
use crate::delta::EncoderState;
use crate::error::BlockdiffError;
use crate::frame::BlockSize;
use crate::source::FrameSource;
use crate::stats::{Counters, DEFAULT_STATS_INTERVAL, StatsAccumulator};

// ── Constants ────────────────────────────────────────────────────

/// Changed-word count at which a delta is sent as a keyframe instead.
pub const DEFAULT_MAX_DELTAS_FOR_RLE: usize = 10_000;

/// Frame rate used when none is configured.
pub const DEFAULT_TARGET_FPS: f64 = 5.0;

/// Slowest accepted frame rate; anything lower is clamped.
pub const MIN_TARGET_FPS: f64 = 0.1;

/// Interval used when the requested frame rate is below [`MIN_TARGET_FPS`].
pub const CLAMPED_FRAME_INTERVAL: Duration = Duration::from_secs(5);

/// Convert a target frame rate into a per-frame interval.
///
/// Rates below [`MIN_TARGET_FPS`] (including negative and NaN) are
/// clamped to [`CLAMPED_FRAME_INTERVAL`].
pub fn frame_interval(target_fps: f64) -> Duration {
    if target_fps.is_nan() || target_fps < MIN_TARGET_FPS {
        warn!(target_fps, "frame rate too low, using one frame every 5s");
        return CLAMPED_FRAME_INTERVAL;
    }
    Duration::from_secs_f64(1.0 / target_fps)
}

// ── EncoderConfig ────────────────────────────────────────────────

/// Configuration for [`FrameEncoder`].
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    /// Size of every frame.
    pub block_size: BlockSize,
    /// Deltas with this many changed words or more become keyframes.
    pub max_deltas_for_rle: usize,
    /// Encoding for the first frame and for busy frames.
    pub keyframe_encoding: KeyframeEncoding,
    /// Minimum time between frames.
    pub frame_interval: Duration,
    /// Stop after this many frames (bootstrap frame included).
    pub max_frames: Option<u64>,
    /// How often throughput is logged.
    pub stats_interval: Duration,
}

impl EncoderConfig {
    /// Defaults for the given frame size.
    pub fn new(block_size: BlockSize) -> Self {
        Self {
            block_size,
            max_deltas_for_rle: DEFAULT_MAX_DELTAS_FOR_RLE,
            keyframe_encoding: KeyframeEncoding::default(),
            frame_interval: frame_interval(DEFAULT_TARGET_FPS),
            max_frames: None,
            stats_interval: DEFAULT_STATS_INTERVAL,
        }
    }
}

// ── EncodedFrame ─────────────────────────────────────────────────

/// What the encoder emitted for one input frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedFrame {
    /// Wire encoding used.
    pub tag: FrameTag,
    /// Wire bytes written, tag included.
    pub bytes: usize,
    /// Changed words against the previous frame (`None` for the first).
    pub changed_words: Option<usize>,
}

// ── FrameEncoder ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Bootstrap,
    Steady,
}

/// Owns the encoder state for one output stream.
///
/// # Lifetime
///
/// Buffers are allocated in [`new`](Self::new) and released when the
/// encoder is dropped, whichever way [`run`](Self::run) returns.
pub struct FrameEncoder<S, W> {
    config: EncoderConfig,
    source: S,
    writer: FrameWriter<W>,
    state: EncoderState,
    stats: StatsAccumulator,
    phase: Phase,
}

impl<S: FrameSource, W: Write> FrameEncoder<S, W> {
    /// Allocate frame buffers and wrap `source` and `output`.
    pub fn new(config: EncoderConfig, source: S, output: W) -> Result<Self, BlockdiffError> {
        let state = EncoderState::new(config.block_size)?;
        let stats = StatsAccumulator::new(config.stats_interval);
        Ok(Self {
            config,
            source,
            writer: FrameWriter::new(output),
            state,
            stats,
            phase: Phase::Bootstrap,
        })
    }

    /// Run until the source is exhausted (or `max_frames` is reached).
    ///
    /// Returns the lifetime counters.
    pub fn run(&mut self) -> Result<Counters, BlockdiffError> {
        info!(
            block_size = self.config.block_size.bytes(),
            max_deltas = self.config.max_deltas_for_rle,
            keyframe = ?self.config.keyframe_encoding,
            interval_ms = self.config.frame_interval.as_millis() as u64,
            "encoder started"
        );

        loop {
            let loop_start = Instant::now();
            if let Some(report) = self.stats.maybe_report(loop_start) {
                info!("encoder: {report}");
            }

            let was_steady = self.phase == Phase::Steady;
            let Some(frame) = self.encode_next()? else {
                break;
            };
            trace!(
                tag = %frame.tag,
                bytes = frame.bytes,
                changed = frame.changed_words,
                elapsed_us = loop_start.elapsed().as_micros() as u64,
                "frame written"
            );

            if was_steady {
                Self::pace(loop_start, self.config.frame_interval);
            }
        }

        let summary = self.stats.summary(Instant::now());
        info!("encoder finished: {summary}");
        Ok(self.stats.total())
    }

    /// Read, encode and emit one frame. `None` once input is exhausted.
    pub fn encode_next(&mut self) -> Result<Option<EncodedFrame>, BlockdiffError> {
        if let Some(max) = self.config.max_frames {
            if self.stats.total().frames >= max {
                return Ok(None);
            }
        }
        if !self.source.read_frame(self.state.current_mut())? {
            return Ok(None);
        }

        let encoding = self.config.keyframe_encoding;
        let (written, changed_words) = match self.phase {
            Phase::Bootstrap => {
                self.phase = Phase::Steady;
                (self.writer.write_keyframe(self.state.current(), encoding)?, None)
            }
            Phase::Steady => {
                let changed = self.state.diff();
                let written = if changed < self.config.max_deltas_for_rle {
                    self.writer.write_rle(self.state.delta())?
                } else {
                    debug!(changed, "delta over threshold, sending keyframe");
                    self.writer.write_keyframe(self.state.current(), encoding)?
                };
                (written, Some(changed))
            }
        };
        self.state.swap();

        self.stats.record(written.bytes, written.tag.is_keyframe());
        Ok(Some(EncodedFrame {
            tag: written.tag,
            bytes: written.bytes,
            changed_words,
        }))
    }

    /// Counters for the run so far.
    pub fn stats(&self) -> &StatsAccumulator {
        &self.stats
    }

    /// The frame most recently sent (the reference for the next delta).
    pub fn last_frame(&self) -> &[u8] {
        self.state.previous()
    }

    pub fn get_output(&self) -> &W {
        self.writer.get_ref()
    }

    pub fn into_output(self) -> W {
        self.writer.into_inner()
    }

    /// Sleep for the remainder of the frame interval.
    fn pace(loop_start: Instant, interval: Duration) {
        let elapsed = loop_start.elapsed();
        if elapsed < interval {
            std::thread::sleep(interval - elapsed);
        }
    }
}

/// Encode every frame of `source` onto `output`.
pub fn encode_stream<S: FrameSource, W: Write>(
    config: EncoderConfig,
    source: S,
    output: W,
) -> Result<Counters, BlockdiffError> {
    FrameEncoder::new(config, source, output)?.run()
}

// ── Tests ────────────────────────────────────────────────────────
