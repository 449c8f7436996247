//! Wires the configured encoder or decoder to the process's stdio.

use std::io::{self, BufWriter, ErrorKind};

use tracing::info;

use blockdiff_core::{BlockSize, BlockdiffError, Counters, decode_stream, encode_stream, source};

use crate::config::BlockdiffConfig;

// ── Exit codes ───────────────────────────────────────────────────

/// Encoder given an unusable block size.
pub const EXIT_ENCODE_BLOCK_SIZE: u8 = 63;
/// Decoder given an unusable block size.
pub const EXIT_DECODE_BLOCK_SIZE: u8 = 62;
/// Any other configuration error.
pub const EXIT_CONFIG: u8 = 64;
/// The wire stream is corrupt or truncated.
pub const EXIT_PROTOCOL: u8 = 65;
/// Frame buffers could not be allocated.
pub const EXIT_OUT_OF_MEMORY: u8 = 71;
/// Reading input or writing output failed.
pub const EXIT_IO: u8 = 74;

/// Which loop the process is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Encode,
    Decode,
}

/// Map a fatal error to the process exit status.
pub fn exit_code(role: Role, err: &BlockdiffError) -> u8 {
    match err {
        BlockdiffError::InvalidBlockSize { .. } => match role {
            Role::Encode => EXIT_ENCODE_BLOCK_SIZE,
            Role::Decode => EXIT_DECODE_BLOCK_SIZE,
        },
        BlockdiffError::OutOfMemory(_) => EXIT_OUT_OF_MEMORY,
        BlockdiffError::Io(_) => EXIT_IO,
        e if e.is_config() => EXIT_CONFIG,
        _ => EXIT_PROTOCOL,
    }
}

// ── Runners ──────────────────────────────────────────────────────

/// Encode frames from the configured source onto stdout.
pub fn run_encode(config: &BlockdiffConfig, block_size: usize) -> Result<Counters, BlockdiffError> {
    let block_size = BlockSize::new(block_size)?;
    let encoder_config = config.to_encoder_config(block_size);
    let source = source::open(&config.encoder.source)?;
    info!("encoding {} → stdout", config.encoder.source.display());

    let output = BufWriter::new(io::stdout().lock());
    closed_output_is_done(encode_stream(encoder_config, source, output))
}

/// Decode the wire stream on stdin onto stdout.
pub fn run_decode(config: &BlockdiffConfig, block_size: usize) -> Result<Counters, BlockdiffError> {
    let block_size = BlockSize::new(block_size)?;
    let decoder_config = config.to_decoder_config(block_size);
    info!("decoding stdin → stdout");

    let input = io::stdin().lock();
    let output = BufWriter::new(io::stdout().lock());
    closed_output_is_done(decode_stream(decoder_config, input, output))
}

/// A reader that hangs up ends the stream like EOF does.
fn closed_output_is_done(
    result: Result<Counters, BlockdiffError>,
) -> Result<Counters, BlockdiffError> {
    match result {
        Err(BlockdiffError::Io(e)) if e.kind() == ErrorKind::BrokenPipe => {
            info!("output closed by reader");
            Ok(Counters::default())
        }
        other => other,
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use blockdiff_core::FrameTag;

    #[test]
    fn block_size_codes_depend_on_role() {
        let err = BlockSize::new(10).unwrap_err();
        assert_eq!(exit_code(Role::Encode, &err), 63);
        assert_eq!(exit_code(Role::Decode, &err), 62);
    }

    #[test]
    fn error_classes_have_distinct_codes() {
        let config = BlockdiffError::InvalidConfig("x".into());
        let oom = BlockdiffError::OutOfMemory(1 << 40);
        let io = BlockdiffError::Io(io::Error::other("gone"));
        let tag = BlockdiffError::UnknownTag(9);
        let short = BlockdiffError::Truncated {
            tag: FrameTag::Rle,
            part: "run",
        };

        assert_eq!(exit_code(Role::Encode, &config), EXIT_CONFIG);
        assert_eq!(exit_code(Role::Encode, &oom), EXIT_OUT_OF_MEMORY);
        assert_eq!(exit_code(Role::Decode, &io), EXIT_IO);
        assert_eq!(exit_code(Role::Decode, &tag), EXIT_PROTOCOL);
        assert_eq!(exit_code(Role::Decode, &short), EXIT_PROTOCOL);
    }

    #[test]
    fn broken_pipe_ends_cleanly() {
        let err = BlockdiffError::Io(io::Error::from(ErrorKind::BrokenPipe));
        assert!(closed_output_is_done(Err(err)).is_ok());

        let err = BlockdiffError::Io(io::Error::from(ErrorKind::PermissionDenied));
        assert!(closed_output_is_done(Err(err)).is_err());
    }
}
