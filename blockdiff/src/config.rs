//! Configuration for the blockdiff binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use blockdiff_core::{
    BlockSize, DEFAULT_MAX_DELTAS_FOR_RLE, DEFAULT_STATS_INTERVAL, DEFAULT_TARGET_FPS,
    DecoderConfig, EncoderConfig, KeyframeEncoding, frame_interval,
};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockdiffConfig {
    /// Wire encoding choices.
    pub codec: CodecConfig,
    /// Encoder input and pacing.
    pub encoder: EncoderSection,
    /// Periodic statistics.
    pub stats: StatsConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Wire encoding choices.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Deltas with this many changed words or more are sent as keyframes.
    pub max_deltas_for_rle: usize,
    /// Keyframe encoding: "lz4" or "raw".
    pub keyframe_encoding: KeyframeEncoding,
}

/// Encoder input and pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderSection {
    /// Frame source: a device/file re-read every frame, or "-" for stdin.
    pub source: PathBuf,
    /// Target frames per second (below 0.1 means one frame every 5 s).
    pub target_fps: f64,
    /// Stop after this many frames; 0 runs until the source ends.
    pub max_frames: u64,
}

/// Periodic statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Seconds between statistics reports.
    pub interval_secs: u64,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_deltas_for_rle: DEFAULT_MAX_DELTAS_FOR_RLE,
            keyframe_encoding: KeyframeEncoding::Lz4,
        }
    }
}

impl Default for EncoderSection {
    fn default() -> Self {
        Self {
            source: PathBuf::from("/dev/fb0"),
            target_fps: DEFAULT_TARGET_FPS,
            max_frames: 0,
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_STATS_INTERVAL.as_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// Parsed from the file.
    File,
    /// No file at the path; defaults used.
    Missing,
    /// The file did not parse; defaults used.
    Invalid(String),
}

impl BlockdiffConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    ///
    /// Logging is not set up yet when this runs, so the origin is
    /// returned for the caller to report.
    pub fn load(path: &Path) -> (Self, ConfigOrigin) {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(cfg) => (cfg, ConfigOrigin::File),
                Err(e) => (Self::default(), ConfigOrigin::Invalid(e.to_string())),
            },
            Err(_) => (Self::default(), ConfigOrigin::Missing),
        }
    }

    /// The default configuration as TOML.
    pub fn default_toml() -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(&Self::default())
    }

    /// Build the encoder loop configuration for `block_size`.
    pub fn to_encoder_config(&self, block_size: BlockSize) -> EncoderConfig {
        EncoderConfig {
            block_size,
            max_deltas_for_rle: self.codec.max_deltas_for_rle,
            keyframe_encoding: self.codec.keyframe_encoding,
            frame_interval: frame_interval(self.encoder.target_fps),
            max_frames: (self.encoder.max_frames > 0).then_some(self.encoder.max_frames),
            stats_interval: self.stats_interval(),
        }
    }

    /// Build the decoder loop configuration for `block_size`.
    pub fn to_decoder_config(&self, block_size: BlockSize) -> DecoderConfig {
        DecoderConfig {
            block_size,
            stats_interval: self.stats_interval(),
        }
    }

    fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats.interval_secs.max(1))
    }
}

// ── Tests ────────────────────────────────────────────────────────
