//! LZ4-compressed keyframes.
//!
//! ```text
//! tag:u8 = 2
//! decompressed_size:u32   always the full block size
//! compressed_size:u32
//! compressed_bytes        LZ4 block format
//! ```

use std::io::Read;

use bytes::{BufMut, BytesMut};
use lz4_flex::block::{compress_into, decompress_into, get_maximum_output_size};
use tracing::warn;

use crate::codec::{FrameTag, encode_raw, read_payload, read_u32};
use crate::error::BlockdiffError;

/// Tag plus the two size fields.
const HEADER_SIZE: usize = 9;

/// Append an LZ4 wire frame for `frame` to `dst` and return its size.
///
/// If the frame cannot be compressed the frame is emitted as Raw
/// instead; the decoder handles either.
pub fn encode_lz4(frame: &[u8], dst: &mut BytesMut) -> usize {
    let Ok(decompressed_size) = u32::try_from(frame.len()) else {
        warn!(len = frame.len(), "frame too large for lz4 header, sending raw");
        return encode_raw(frame, dst);
    };

    let start = dst.len();
    let bound = get_maximum_output_size(frame.len());
    dst.reserve(HEADER_SIZE + bound);
    dst.put_u8(FrameTag::Lz4 as u8);
    dst.put_u32_le(decompressed_size);
    dst.put_u32_le(0);

    let body = start + HEADER_SIZE;
    dst.resize(body + bound, 0);

    match compress_into(frame, &mut dst[body..]) {
        Ok(n) => {
            dst.truncate(body + n);
            dst[start + 5..body].copy_from_slice(&(n as u32).to_le_bytes());
            dst.len() - start
        }
        Err(e) => {
            warn!("lz4 compression failed ({e}), sending raw keyframe");
            dst.truncate(start);
            encode_raw(frame, dst)
        }
    }
}

/// Read an LZ4 payload (tag already consumed) and decompress it into
/// `buf`. `compressed` is scratch space for the compressed bytes.
pub(crate) fn decode_lz4<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    compressed: &mut Vec<u8>,
) -> Result<usize, BlockdiffError> {
    let decompressed_size = read_u32(reader, FrameTag::Lz4, "decompressed size")? as usize;
    if decompressed_size != buf.len() {
        return Err(BlockdiffError::Lz4SizeMismatch {
            expected: buf.len(),
            actual: decompressed_size,
        });
    }

    let compressed_size = read_u32(reader, FrameTag::Lz4, "compressed size")? as usize;
    let max = get_maximum_output_size(buf.len());
    if compressed_size > max {
        return Err(BlockdiffError::Lz4CompressedTooLarge {
            size: compressed_size,
            max,
        });
    }

    compressed.clear();
    compressed.resize(compressed_size, 0);
    read_payload(reader, compressed, FrameTag::Lz4, "compressed bytes")?;

    let written = decompress_into(compressed, buf)?;
    if written != decompressed_size {
        return Err(BlockdiffError::Lz4ShortOutput {
            expected: decompressed_size,
            actual: written,
        });
    }

    Ok(HEADER_SIZE - 1 + compressed_size)
}

// ── Tests ────────────────────────────────────────────────────────
