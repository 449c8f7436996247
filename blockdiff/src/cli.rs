//! Command-line interface.
//!
//! ```text
//! blockdiff encode <block_size> [fps]   Frames from the source → wire stream on stdout
//! blockdiff decode <block_size>         Wire stream on stdin → frames on stdout
//! blockdiff --gen-config                Write default config to stdout
//! ```
//!
//! Flags override values from the config file.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use blockdiff_core::KeyframeEncoding;

use crate::config::BlockdiffConfig;

#[derive(Parser, Debug)]
#[command(
    name = "blockdiff",
    version,
    about = "Stream fixed-size frames over a pipe as XOR deltas"
)]
pub struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "blockdiff.toml", global = true)]
    pub config: PathBuf,

    /// Log level (overrides the config file; RUST_LOG wins over both).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    pub gen_config: bool,

    #[command(subcommand)]
    pub mode: Option<Mode>,
}

#[derive(Subcommand, Debug)]
pub enum Mode {
    /// Read frames and write the wire stream to stdout.
    #[command(visible_alias = "e")]
    Encode(EncodeArgs),
    /// Read the wire stream from stdin and write frames to stdout.
    #[command(visible_alias = "d")]
    Decode(DecodeArgs),
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Frame size in bytes (a multiple of 4).
    pub block_size: usize,

    /// Target frames per second.
    pub fps: Option<f64>,

    /// Frame source; `-` reads consecutive frames from stdin.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Stop after this many frames (0 = until the source ends).
    #[arg(long)]
    pub frames: Option<u64>,

    /// Changed-word count at which a keyframe is sent instead of RLE.
    #[arg(long)]
    pub max_deltas: Option<usize>,

    /// Keyframe encoding: raw or lz4.
    #[arg(long)]
    pub keyframe: Option<KeyframeEncoding>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Frame size in bytes (must match the encoder).
    pub block_size: usize,

    /// Seconds between statistics reports.
    #[arg(long)]
    pub stats_interval: Option<u64>,
}

// ── Overrides ────────────────────────────────────────────────────

impl Cli {
    /// Fold command-line overrides into `config`.
    pub fn apply(&self, config: &mut BlockdiffConfig) {
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        match &self.mode {
            Some(Mode::Encode(args)) => args.apply(config),
            Some(Mode::Decode(args)) => args.apply(config),
            None => {}
        }
    }
}

impl EncodeArgs {
    fn apply(&self, config: &mut BlockdiffConfig) {
        if let Some(fps) = self.fps {
            config.encoder.target_fps = fps;
        }
        if let Some(input) = &self.input {
            config.encoder.source = input.clone();
        }
        if let Some(frames) = self.frames {
            config.encoder.max_frames = frames;
        }
        if let Some(max) = self.max_deltas {
            config.codec.max_deltas_for_rle = max;
        }
        if let Some(encoding) = self.keyframe {
            config.codec.keyframe_encoding = encoding;
        }
    }
}

impl DecodeArgs {
    fn apply(&self, config: &mut BlockdiffConfig) {
        if let Some(secs) = self.stats_interval {
            config.stats.interval_secs = secs;
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn encode_positional_args() {
        let cli = parse(&["blockdiff", "encode", "4096", "2.5"]);
        let Some(Mode::Encode(args)) = &cli.mode else {
            panic!("expected encode");
        };
        assert_eq!(args.block_size, 4096);
        assert_eq!(args.fps, Some(2.5));
    }

    #[test]
    fn short_aliases() {
        assert!(matches!(parse(&["blockdiff", "e", "16"]).mode, Some(Mode::Encode(_))));
        assert!(matches!(parse(&["blockdiff", "d", "16"]).mode, Some(Mode::Decode(_))));
    }

    #[test]
    fn missing_block_size_is_a_usage_error() {
        assert!(Cli::try_parse_from(["blockdiff", "decode"]).is_err());
        assert!(Cli::try_parse_from(["blockdiff", "encode", "lots"]).is_err());
    }

    #[test]
    fn bad_keyframe_encoding_is_rejected() {
        assert!(Cli::try_parse_from(["blockdiff", "encode", "16", "--keyframe", "zstd"]).is_err());
    }

    #[test]
    fn flags_override_config() {
        let cli = parse(&[
            "blockdiff",
            "--log-level",
            "debug",
            "encode",
            "16",
            "10",
            "--input",
            "-",
            "--frames",
            "3",
            "--max-deltas",
            "7",
            "--keyframe",
            "raw",
        ]);
        let mut cfg = BlockdiffConfig::default();
        cli.apply(&mut cfg);
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.encoder.target_fps, 10.0);
        assert_eq!(cfg.encoder.source, PathBuf::from("-"));
        assert_eq!(cfg.encoder.max_frames, 3);
        assert_eq!(cfg.codec.max_deltas_for_rle, 7);
        assert_eq!(cfg.codec.keyframe_encoding, KeyframeEncoding::Raw);
    }

    #[test]
    fn unset_flags_keep_config() {
        let cli = parse(&["blockdiff", "decode", "16"]);
        let mut cfg = BlockdiffConfig::default();
        cfg.stats.interval_secs = 60;
        cli.apply(&mut cfg);
        assert_eq!(cfg.stats.interval_secs, 60);
        assert_eq!(cfg.logging.level, "info");
    }
}
