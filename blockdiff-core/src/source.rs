//! Frame sources for the encoder.
//!
//! Two shapes of input are supported:
//!
//! - **Rewinding** ([`RewindingSource`]): a device node such as
//!   `/dev/fb0` that always holds the *current* screen. Every frame is a
//!   fresh read from offset 0.
//! - **Stream** ([`StreamSource`]): a pipe or file holding consecutive
//!   frames back to back, e.g. stdin.
//!
//! Either source reports end of input by returning `false`; a read that
//! yields fewer than `block_size` bytes ends the stream as well.

use std::fs::File;
use std::io::{self, BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::{debug, warn};

use crate::error::BlockdiffError;

// ── FrameSource ──────────────────────────────────────────────────

/// Supplies whole frames to the encoder loop.
pub trait FrameSource {
    /// Fill `buf` with the next frame.
    ///
    /// Returns `Ok(false)` when no further complete frame is available.
    fn read_frame(&mut self, buf: &mut [u8]) -> Result<bool, BlockdiffError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn read_frame(&mut self, buf: &mut [u8]) -> Result<bool, BlockdiffError> {
        (**self).read_frame(buf)
    }
}

/// Open the source named by `path`: `-` for consecutive frames on
/// stdin, anything else as a rewinding device or file.
pub fn open(path: &Path) -> Result<Box<dyn FrameSource>, BlockdiffError> {
    if path.as_os_str() == "-" {
        debug!("reading frames from stdin");
        return Ok(Box::new(StreamSource::new(io::stdin().lock())));
    }
    debug!("reading frames from {}", path.display());
    let file = File::open(path)?;
    Ok(Box::new(RewindingSource::new(file)))
}

// ── RewindingSource ──────────────────────────────────────────────

/// Re-reads the same region of a seekable input for every frame.
pub struct RewindingSource<R> {
    inner: R,
}

impl<R: Read + Seek> RewindingSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: Read + Seek> FrameSource for RewindingSource<R> {
    fn read_frame(&mut self, buf: &mut [u8]) -> Result<bool, BlockdiffError> {
        let filled = fill(&mut self.inner, buf)?;
        self.inner.seek(SeekFrom::Start(0))?;
        if filled < buf.len() {
            if filled > 0 {
                warn!(
                    filled,
                    expected = buf.len(),
                    "source is smaller than the block size"
                );
            }
            return Ok(false);
        }
        Ok(true)
    }
}

// ── StreamSource ─────────────────────────────────────────────────

/// Reads consecutive frames from a sequential input.
pub struct StreamSource<R> {
    inner: BufReader<R>,
}

impl<R: Read> StreamSource<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
        }
    }
}

impl<R: Read> FrameSource for StreamSource<R> {
    fn read_frame(&mut self, buf: &mut [u8]) -> Result<bool, BlockdiffError> {
        let filled = fill(&mut self.inner, buf)?;
        if filled == 0 {
            return Ok(false);
        }
        if filled < buf.len() {
            warn!(
                filled,
                expected = buf.len(),
                "dropping trailing partial frame"
            );
            return Ok(false);
        }
        Ok(true)
    }
}

// ── Internal ─────────────────────────────────────────────────────

/// Read until `buf` is full or the input ends; returns bytes read.
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Hands out at most `step` bytes per read.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        step: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn rewinding_source_repeats_frame() {
        let mut src = RewindingSource::new(Cursor::new(vec![1u8, 2, 3, 4, 5, 6, 7, 8]));
        let mut buf = [0u8; 8];
        for _ in 0..3 {
            assert!(src.read_frame(&mut buf).unwrap());
            assert_eq!(buf, [1, 2, 3, 4, 5, 6, 7, 8]);
        }
    }

    #[test]
    fn rewinding_source_too_small_ends() {
        let mut src = RewindingSource::new(Cursor::new(vec![1u8, 2, 3, 4]));
        let mut buf = [0u8; 8];
        assert!(!src.read_frame(&mut buf).unwrap());
    }

    #[test]
    fn stream_source_reads_consecutive_frames() {
        let data: Vec<u8> = (0..12).collect();
        let mut src = StreamSource::new(Cursor::new(data));
        let mut buf = [0u8; 4];
        let mut frames = Vec::new();
        while src.read_frame(&mut buf).unwrap() {
            frames.push(buf);
        }
        assert_eq!(frames, vec![[0, 1, 2, 3], [4, 5, 6, 7], [8, 9, 10, 11]]);
    }

    #[test]
    fn stream_source_drops_partial_tail() {
        let mut src = StreamSource::new(Cursor::new(vec![9u8; 6]));
        let mut buf = [0u8; 4];
        assert!(src.read_frame(&mut buf).unwrap());
        assert!(!src.read_frame(&mut buf).unwrap());
    }

    #[test]
    fn stream_source_assembles_short_reads() {
        let data: Vec<u8> = (0..16).collect();
        let mut src = StreamSource::new(Trickle {
            data: data.clone(),
            pos: 0,
            step: 3,
        });
        let mut buf = [0u8; 16];
        assert!(src.read_frame(&mut buf).unwrap());
        assert_eq!(buf.to_vec(), data);
    }
}
