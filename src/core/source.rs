//! Byte sources feeding the chunk reader.
//!
//! Reads are pull-based and never block inside the decoder: a source that
//! has nothing yet returns [`ReadStatus::WouldBlock`] and the driver parks
//! until the application supplies more bytes.

use std::collections::VecDeque;
use std::io::{ErrorKind, Read};
#[cfg(feature = "mmap")]
use std::fs::File;
#[cfg(feature = "mmap")]
use std::path::Path;

#[cfg(feature = "mmap")]
use memmap2::Mmap;

use crate::util::{Error, Result};

/// Outcome of one read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadStatus {
    /// `n` bytes were written to the front of the buffer (`n > 0`).
    Data(usize),
    /// Nothing available right now.
    WouldBlock,
    /// No more bytes will arrive.
    Eof,
}

/// Pull interface for stream bytes.
pub trait ByteSource {
    fn read(&mut self, buf: &mut [u8]) -> Result<ReadStatus>;
}

impl<T: ByteSource + ?Sized> ByteSource for Box<T> {
    fn read(&mut self, buf: &mut [u8]) -> Result<ReadStatus> {
        (**self).read(buf)
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Reads from a borrowed byte slice.
#[derive(Clone, Debug)]
pub struct SliceSource<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceSource<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }
}

fn copy_out(data: &[u8], pos: &mut usize, buf: &mut [u8]) -> ReadStatus {
    let left = data.len().saturating_sub(*pos);
    if left == 0 {
        return ReadStatus::Eof;
    }
    if buf.is_empty() {
        return ReadStatus::Data(0);
    }
    let n = left.min(buf.len());
    buf[..n].copy_from_slice(&data[*pos..*pos + n]);
    *pos += n;
    ReadStatus::Data(n)
}

impl ByteSource for SliceSource<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<ReadStatus> {
        Ok(copy_out(self.data, &mut self.pos, buf))
    }
}

/// Owned bytes delivered incrementally by the application.
///
/// Until [`finish`](Self::finish) is called an empty queue reports
/// [`ReadStatus::WouldBlock`].
#[derive(Debug, Default)]
pub struct PushSource {
    queue: VecDeque<u8>,
    finished: bool,
}

impl PushSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.queue.extend(bytes);
    }

    /// Mark the end of input.
    pub fn finish(&mut self) {
        self.finished = true;
    }

    #[inline]
    pub fn buffered(&self) -> usize {
        self.queue.len()
    }
}

impl ByteSource for PushSource {
    fn read(&mut self, buf: &mut [u8]) -> Result<ReadStatus> {
        if self.queue.is_empty() {
            return Ok(if self.finished { ReadStatus::Eof } else { ReadStatus::WouldBlock });
        }
        let n = self.queue.len().min(buf.len());
        for (dst, src) in buf.iter_mut().zip(self.queue.drain(..n)) {
            *dst = src;
        }
        Ok(ReadStatus::Data(n))
    }
}

// ============================================================================
// std::io adapter
// ============================================================================

/// Wraps any [`Read`]; `WouldBlock` from the reader maps to [`ReadStatus::WouldBlock`].
pub struct ReaderSource<R: Read> {
    inner: R,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> ByteSource for ReaderSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<ReadStatus> {
        loop {
            match self.inner.read(buf) {
                Ok(0) if !buf.is_empty() => return Ok(ReadStatus::Eof),
                Ok(n) => return Ok(ReadStatus::Data(n)),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(ReadStatus::WouldBlock),
                Err(e) => return Err(Error::Io(e)),
            }
        }
    }
}

// ============================================================================
// Memory-mapped file
// ============================================================================

/// Memory-mapped file source.
#[cfg(feature = "mmap")]
pub struct MmapSource {
    map: Option<Mmap>,
    pos: usize,
}

#[cfg(feature = "mmap")]
impl MmapSource {
    /// Map a file read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;

        let size = file.metadata()?.len();
        // Zero-length files cannot be mapped on every platform.
        let map = if size > 0 {
            // Safety: the file is opened read-only; concurrent truncation by
            // another process is outside what the decoder can guard against.
            let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::MmapFailed(e.to_string()))?;
            Some(mmap)
        } else {
            None
        };
        tracing::debug!(path = %path.display(), size, "mapped");
        Ok(Self { map, pos: 0 })
    }

    /// Mapped bytes.
    pub fn as_slice(&self) -> &[u8] {
        self.map.as_deref().unwrap_or(&[])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(feature = "mmap")]
impl ByteSource for MmapSource {
    fn read(&mut self, buf: &mut [u8]) -> Result<ReadStatus> {
        let data: &[u8] = self.map.as_deref().unwrap_or(&[]);
        Ok(copy_out(data, &mut self.pos, buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_source() {
        let data = [1u8, 2, 3, 4, 5];
        let mut src = SliceSource::new(&data);
        let mut buf = [0u8; 3];
        assert_eq!(src.read(&mut buf).unwrap(), ReadStatus::Data(3));
        assert_eq!(buf, [1, 2, 3]);
        assert_eq!(src.read(&mut buf).unwrap(), ReadStatus::Data(2));
        assert_eq!(&buf[..2], &[4, 5]);
        assert_eq!(src.read(&mut buf).unwrap(), ReadStatus::Eof);
        assert_eq!(src.position(), 5);
    }

    #[test]
    fn test_push_source() {
        let mut src = PushSource::new();
        let mut buf = [0u8; 4];
        assert_eq!(src.read(&mut buf).unwrap(), ReadStatus::WouldBlock);
        src.push(&[9, 8]);
        assert_eq!(src.buffered(), 2);
        assert_eq!(src.read(&mut buf).unwrap(), ReadStatus::Data(2));
        assert_eq!(&buf[..2], &[9, 8]);
        assert_eq!(src.read(&mut buf).unwrap(), ReadStatus::WouldBlock);
        src.finish();
        assert_eq!(src.read(&mut buf).unwrap(), ReadStatus::Eof);
    }

    #[test]
    fn test_reader_source() {
        let mut src = ReaderSource::new(std::io::Cursor::new(vec![7u8; 10]));
        let mut buf = [0u8; 8];
        assert_eq!(src.read(&mut buf).unwrap(), ReadStatus::Data(8));
        assert_eq!(src.read(&mut buf).unwrap(), ReadStatus::Data(2));
        assert_eq!(src.read(&mut buf).unwrap(), ReadStatus::Eof);
    }

    #[cfg(feature = "mmap")]
    #[test]
    fn test_mmap_source() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"abcdef").unwrap();
        file.flush().unwrap();

        let mut src = MmapSource::open(file.path()).unwrap();
        assert_eq!(src.len(), 6);
        let mut buf = [0u8; 16];
        assert_eq!(src.read(&mut buf).unwrap(), ReadStatus::Data(6));
        assert_eq!(&buf[..6], b"abcdef");
        assert_eq!(src.read(&mut buf).unwrap(), ReadStatus::Eof);

        let empty = tempfile::NamedTempFile::new().unwrap();
        let mut src = MmapSource::open(empty.path()).unwrap();
        assert!(src.is_empty());
        assert_eq!(src.read(&mut buf).unwrap(), ReadStatus::Eof);
    }

    #[cfg(feature = "mmap")]
    #[test]
    fn test_mmap_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = MmapSource::open(dir.path().join("missing.mng")).err().unwrap();
        assert!(matches!(err, Error::FileNotFound(_)));
    }
}
