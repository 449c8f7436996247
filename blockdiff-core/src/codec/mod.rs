//! Wire-frame codec.
//!
//! Every wire frame starts with a one-byte [`FrameTag`] followed by a
//! tag-specific payload. All integers are little-endian.
//!
//! ```text
//! WireFrame := tag:u8 payload
//! tag 0 (Raw): payload = block_size bytes, verbatim
//! tag 1 (RLE): payload = (run_length:u32 value:u32)* run_length:u32 = 0
//! tag 2 (LZ4): payload = decompressed_size:u32 compressed_size:u32 bytes
//! ```
//!
//! The stream carries no sequence numbers or checksums; a frame can only
//! be located by successfully parsing every frame before it.

use std::fmt;
use std::io::{ErrorKind, Read, Write};

use bytes::BytesMut;
use serde::{Deserialize, Serialize};

use crate::error::BlockdiffError;

pub mod lz4;
pub mod raw;
pub mod rle;

pub use lz4::encode_lz4;
pub use raw::encode_raw;
pub use rle::{MAX_RUN, encode_rle};

// ── FrameTag ─────────────────────────────────────────────────────

/// Leading byte of a wire frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameTag {
    /// Full frame, uncompressed.
    Raw = 0,
    /// Word-level run-length encoded XOR delta.
    Rle = 1,
    /// Full frame, LZ4 block compressed.
    Lz4 = 2,
}

impl FrameTag {
    /// Whether frames with this tag carry a complete frame.
    pub const fn is_keyframe(self) -> bool {
        !matches!(self, FrameTag::Rle)
    }
}

impl TryFrom<u8> for FrameTag {
    type Error = BlockdiffError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FrameTag::Raw),
            1 => Ok(FrameTag::Rle),
            2 => Ok(FrameTag::Lz4),
            other => Err(BlockdiffError::UnknownTag(other)),
        }
    }
}

impl fmt::Display for FrameTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FrameTag::Raw => "raw",
            FrameTag::Rle => "rle",
            FrameTag::Lz4 => "lz4",
        })
    }
}

// ── KeyframeEncoding ─────────────────────────────────────────────

/// How the encoder transmits complete frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyframeEncoding {
    /// Send the frame bytes verbatim.
    Raw,
    /// LZ4-compress the frame, falling back to raw on failure.
    #[default]
    Lz4,
}

impl KeyframeEncoding {
    /// Append a keyframe for `frame` to `dst` and return its wire size.
    pub fn encode(self, frame: &[u8], dst: &mut BytesMut) -> usize {
        match self {
            KeyframeEncoding::Raw => encode_raw(frame, dst),
            KeyframeEncoding::Lz4 => encode_lz4(frame, dst),
        }
    }
}

impl std::str::FromStr for KeyframeEncoding {
    type Err = BlockdiffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raw" => Ok(KeyframeEncoding::Raw),
            "lz4" => Ok(KeyframeEncoding::Lz4),
            other => Err(BlockdiffError::InvalidConfig(format!(
                "unknown keyframe encoding {other:?} (expected raw or lz4)"
            ))),
        }
    }
}

// ── DecodedFrame ─────────────────────────────────────────────────

/// Outcome of decoding one wire frame into a caller-owned buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedFrame {
    /// Encoding of the frame.
    pub tag: FrameTag,
    /// Wire bytes consumed, tag included.
    pub bytes_consumed: usize,
    /// RLE words that did not fit in the buffer and were dropped.
    pub overrun_words: u64,
    /// RLE words not covered by any run, zero-filled.
    pub underfilled_words: usize,
}

impl DecodedFrame {
    fn whole(tag: FrameTag, bytes_consumed: usize) -> Self {
        Self {
            tag,
            bytes_consumed,
            overrun_words: 0,
            underfilled_words: 0,
        }
    }

    /// Whether the RLE payload disagreed with the buffer size.
    pub fn is_malformed_rle(&self) -> bool {
        self.overrun_words > 0 || self.underfilled_words > 0
    }
}

// ── Decoding ─────────────────────────────────────────────────────

/// Decode one wire frame from `reader` into `buf`.
///
/// Returns `Ok(None)` when the stream ends cleanly before a tag byte.
/// Allocates a temporary buffer for LZ4 payloads; loops should prefer
/// [`FrameReader`], which reuses it.
pub fn decode<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<Option<DecodedFrame>, BlockdiffError> {
    let mut compressed = Vec::new();
    decode_with_scratch(reader, buf, &mut compressed)
}

fn decode_with_scratch<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    compressed: &mut Vec<u8>,
) -> Result<Option<DecodedFrame>, BlockdiffError> {
    let Some(byte) = read_tag(reader)? else {
        return Ok(None);
    };

    let frame = match FrameTag::try_from(byte)? {
        FrameTag::Raw => DecodedFrame::whole(FrameTag::Raw, 1 + raw::decode_raw(reader, buf)?),
        FrameTag::Rle => {
            let rle = rle::decode_rle(reader, buf)?;
            DecodedFrame {
                tag: FrameTag::Rle,
                bytes_consumed: 1 + rle.bytes_consumed,
                overrun_words: rle.overrun_words,
                underfilled_words: rle.underfilled_words,
            }
        }
        FrameTag::Lz4 => {
            DecodedFrame::whole(FrameTag::Lz4, 1 + lz4::decode_lz4(reader, buf, compressed)?)
        }
    };
    Ok(Some(frame))
}

/// Read the tag byte, distinguishing a clean end of stream.
fn read_tag<R: Read>(reader: &mut R) -> Result<Option<u8>, BlockdiffError> {
    let mut tag = [0u8; 1];
    loop {
        match reader.read(&mut tag) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(tag[0])),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

/// `read_exact` that reports a short read as a truncated frame.
pub(crate) fn read_payload<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    tag: FrameTag,
    part: &'static str,
) -> Result<(), BlockdiffError> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => BlockdiffError::Truncated { tag, part },
        _ => BlockdiffError::Io(e),
    })
}

pub(crate) fn read_u32<R: Read>(
    reader: &mut R,
    tag: FrameTag,
    part: &'static str,
) -> Result<u32, BlockdiffError> {
    let mut word = [0u8; 4];
    read_payload(reader, &mut word, tag, part)?;
    Ok(u32::from_le_bytes(word))
}

// ── FrameReader ──────────────────────────────────────────────────

/// Reads consecutive wire frames from a byte stream.
pub struct FrameReader<R> {
    inner: R,
    compressed: Vec<u8>,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            compressed: Vec::new(),
        }
    }

    /// Decode the next wire frame into `buf`; `None` at end of stream.
    pub fn read_frame(&mut self, buf: &mut [u8]) -> Result<Option<DecodedFrame>, BlockdiffError> {
        decode_with_scratch(&mut self.inner, buf, &mut self.compressed)
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

// ── FrameWriter ──────────────────────────────────────────────────

/// A wire frame that has been written to the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrittenFrame {
    /// Encoding actually used (an LZ4 request may fall back to Raw).
    pub tag: FrameTag,
    /// Wire bytes written, tag included.
    pub bytes: usize,
}

/// Assembles wire frames in a reusable buffer and writes each one to
/// the underlying stream with a single `write_all` + `flush`.
pub struct FrameWriter<W> {
    inner: W,
    scratch: BytesMut,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            scratch: BytesMut::new(),
        }
    }

    /// Emit `frame` as a Raw keyframe.
    pub fn write_raw(&mut self, frame: &[u8]) -> Result<WrittenFrame, BlockdiffError> {
        self.scratch.clear();
        encode_raw(frame, &mut self.scratch);
        self.flush_scratch()
    }

    /// Emit `delta` as an RLE delta frame.
    pub fn write_rle(&mut self, delta: &[u8]) -> Result<WrittenFrame, BlockdiffError> {
        self.scratch.clear();
        encode_rle(delta, &mut self.scratch)?;
        self.flush_scratch()
    }

    /// Emit `frame` as an LZ4 keyframe (Raw if compression fails).
    pub fn write_lz4(&mut self, frame: &[u8]) -> Result<WrittenFrame, BlockdiffError> {
        self.scratch.clear();
        encode_lz4(frame, &mut self.scratch);
        self.flush_scratch()
    }

    /// Emit `frame` as a keyframe using `encoding`.
    pub fn write_keyframe(
        &mut self,
        frame: &[u8],
        encoding: KeyframeEncoding,
    ) -> Result<WrittenFrame, BlockdiffError> {
        self.scratch.clear();
        encoding.encode(frame, &mut self.scratch);
        self.flush_scratch()
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    fn flush_scratch(&mut self) -> Result<WrittenFrame, BlockdiffError> {
        // Every encoder starts its frame with the tag byte.
        let tag = FrameTag::try_from(self.scratch[0])?;
        self.inner.write_all(&self.scratch)?;
        self.inner.flush()?;
        Ok(WrittenFrame {
            tag,
            bytes: self.scratch.len(),
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn tag_conversion() {
        assert_eq!(FrameTag::try_from(0).unwrap(), FrameTag::Raw);
        assert_eq!(FrameTag::try_from(1).unwrap(), FrameTag::Rle);
        assert_eq!(FrameTag::try_from(2).unwrap(), FrameTag::Lz4);
        assert!(matches!(
            FrameTag::try_from(7),
            Err(BlockdiffError::UnknownTag(7))
        ));
        assert!(FrameTag::Raw.is_keyframe());
        assert!(FrameTag::Lz4.is_keyframe());
        assert!(!FrameTag::Rle.is_keyframe());
    }

    #[test]
    fn empty_stream_is_clean_end() {
        let mut buf = [0u8; 8];
        let mut input = Cursor::new(Vec::<u8>::new());
        assert!(decode(&mut input, &mut buf).unwrap().is_none());
    }

    #[test]
    fn unknown_tag_fails_immediately() {
        let mut buf = [0u8; 8];
        let mut input = Cursor::new(vec![7u8, 0, 0, 0, 0, 0, 0, 0, 0]);
        let err = decode(&mut input, &mut buf).unwrap_err();
        assert!(matches!(err, BlockdiffError::UnknownTag(7)));
        // Nothing past the tag was consumed.
        assert_eq!(input.position(), 1);
    }

    #[test]
    fn writer_and_reader_agree() {
        let frame: Vec<u8> = (0..64u8).collect();
        let mut delta = vec![0u8; 64];
        delta[8] = 0xFF;

        let mut writer = FrameWriter::new(Vec::new());
        let a = writer.write_raw(&frame).unwrap();
        assert_eq!(a.tag, FrameTag::Raw);
        let b = writer.write_rle(&delta).unwrap();
        assert_eq!(b.tag, FrameTag::Rle);
        let c = writer.write_lz4(&frame).unwrap();
        assert_eq!(c.tag, FrameTag::Lz4);
        let d = writer
            .write_keyframe(&frame, KeyframeEncoding::Raw)
            .unwrap();
        assert_eq!(d, a);
        let stream = writer.into_inner();
        assert_eq!(stream.len(), a.bytes + b.bytes + c.bytes + d.bytes);

        let mut reader = FrameReader::new(Cursor::new(stream));
        let mut buf = vec![0u8; 64];

        let f = reader.read_frame(&mut buf).unwrap().unwrap();
        assert_eq!((f.tag, f.bytes_consumed), (FrameTag::Raw, a.bytes));
        assert_eq!(buf, frame);

        let f = reader.read_frame(&mut buf).unwrap().unwrap();
        assert_eq!((f.tag, f.bytes_consumed), (FrameTag::Rle, b.bytes));
        assert_eq!(buf, delta);
        assert!(!f.is_malformed_rle());

        buf.fill(0);
        let f = reader.read_frame(&mut buf).unwrap().unwrap();
        assert_eq!((f.tag, f.bytes_consumed), (FrameTag::Lz4, c.bytes));
        assert_eq!(buf, frame);

        buf.fill(0);
        let f = reader.read_frame(&mut buf).unwrap().unwrap();
        assert_eq!(f.tag, FrameTag::Raw);
        assert_eq!(buf, frame);

        assert!(reader.read_frame(&mut buf).unwrap().is_none());
    }

    #[test]
    fn keyframe_encoding_parses() {
        assert_eq!("raw".parse::<KeyframeEncoding>().unwrap(), KeyframeEncoding::Raw);
        assert_eq!("LZ4".parse::<KeyframeEncoding>().unwrap(), KeyframeEncoding::Lz4);
        assert!("zstd".parse::<KeyframeEncoding>().is_err());
        assert_eq!(KeyframeEncoding::default(), KeyframeEncoding::Lz4);
    }
}
