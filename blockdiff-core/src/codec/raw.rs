//! Raw keyframes: the tag followed by the frame bytes verbatim.

use std::io::Read;

use bytes::{BufMut, BytesMut};

use crate::codec::{FrameTag, read_payload};
use crate::error::BlockdiffError;

/// Append a Raw wire frame for `frame` to `dst` and return its size.
pub fn encode_raw(frame: &[u8], dst: &mut BytesMut) -> usize {
    dst.reserve(1 + frame.len());
    dst.put_u8(FrameTag::Raw as u8);
    dst.put_slice(frame);
    1 + frame.len()
}

/// Read a Raw payload (tag already consumed) filling all of `buf`.
pub(crate) fn decode_raw<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize, BlockdiffError> {
    read_payload(reader, buf, FrameTag::Raw, "frame bytes")?;
    Ok(buf.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode;
    use std::io::Cursor;

    #[test]
    fn layout_is_tag_then_bytes() {
        let mut dst = BytesMut::new();
        let n = encode_raw(&[1, 2, 3, 4], &mut dst);
        assert_eq!(n, 5);
        assert_eq!(&dst[..], &[0, 1, 2, 3, 4]);
    }

    #[test]
    fn short_payload_is_truncation() {
        let mut buf = [0u8; 8];
        let mut input = Cursor::new(vec![0u8, 1, 2, 3]);
        let err = decode(&mut input, &mut buf).unwrap_err();
        assert!(matches!(
            err,
            BlockdiffError::Truncated {
                tag: FrameTag::Raw,
                ..
            }
        ));
    }
}
