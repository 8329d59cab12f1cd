//! Stream framing: signature, length-prefixed chunks and their CRC.
//!
//! [`ChunkReader`] is resumable. When the byte source runs dry it keeps the
//! bytes read so far and reports [`Pull::Pending`]; the next call continues
//! where it stopped.

use std::io::Write;

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

use super::encode::encode;
use super::id::*;
use super::record::ChunkRecord;
use crate::core::{ByteSource, ReadStatus};
use crate::util::{Error, Result};

/// CRC-32 over the chunk id and payload.
pub fn crc(id: ChunkId, data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(id.bytes());
    hasher.update(data);
    hasher.finalize()
}

/// A framed chunk as read from the stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawChunk {
    pub id: ChunkId,
    pub data: Vec<u8>,
    pub crc: u32,
}

/// Result of one pull.
#[derive(Debug)]
pub enum Pull {
    Ready(RawChunk),
    /// Source would block; call again later.
    Pending,
    /// Clean end of stream between chunks.
    End,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Signature,
    Header,
    Body { id: ChunkId },
}

/// Resumable chunk reader.
pub struct ChunkReader {
    phase: Phase,
    buf: Vec<u8>,
    filled: usize,
    signature: Option<Signature>,
    check_crc: bool,
    max_len: u32,
    /// Stream offset of the next unread byte.
    offset: u64,
}

impl ChunkReader {
    pub fn new(check_crc: bool, max_len: u32) -> Self {
        Self {
            phase: Phase::Signature,
            buf: vec![0; SIGNATURE_SIZE],
            filled: 0,
            signature: None,
            check_crc,
            max_len: max_len.min(MAX_CHUNK_LENGTH),
            offset: 0,
        }
    }

    /// Container type, once the signature has been read.
    #[inline]
    pub fn signature(&self) -> Option<Signature> {
        self.signature
    }

    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Whether a chunk is partially buffered.
    pub fn in_chunk(&self) -> bool {
        self.filled > 0 || matches!(self.phase, Phase::Body { .. })
    }

    fn expect(&mut self, phase: Phase, len: usize) {
        self.phase = phase;
        self.buf.clear();
        self.buf.resize(len, 0);
        self.filled = 0;
    }

    /// Fill the buffer: `None` at a clean end, `Some(false)` when the source would block.
    fn fill(&mut self, src: &mut dyn ByteSource) -> Result<Option<bool>> {
        while self.filled < self.buf.len() {
            match src.read(&mut self.buf[self.filled..])? {
                ReadStatus::Data(n) => {
                    self.filled += n;
                    self.offset += n as u64;
                }
                ReadStatus::WouldBlock => return Ok(Some(false)),
                ReadStatus::Eof => {
                    if self.phase == Phase::Header && self.filled == 0 {
                        return Ok(None);
                    }
                    return Err(Error::UnexpectedEof(self.offset));
                }
            }
        }
        Ok(Some(true))
    }

    /// Read the next chunk.
    pub fn pull(&mut self, src: &mut dyn ByteSource) -> Result<Pull> {
        loop {
            match self.fill(src)? {
                None => return Ok(Pull::End),
                Some(false) => return Ok(Pull::Pending),
                Some(true) => {}
            }
            match self.phase {
                Phase::Signature => {
                    let sig = Signature::detect(&self.buf).ok_or(Error::InvalidSignature)?;
                    tracing::debug!(?sig, "signature");
                    self.signature = Some(sig);
                    self.expect(Phase::Header, CHUNK_HEADER_SIZE);
                }
                Phase::Header => {
                    let len = BigEndian::read_u32(&self.buf[..4]);
                    let id = ChunkId::new(&[self.buf[4], self.buf[5], self.buf[6], self.buf[7]]);
                    if len > self.max_len {
                        return Err(Error::ChunkTooLarge { chunk: id, len });
                    }
                    self.expect(Phase::Body { id }, len as usize + CHUNK_CRC_SIZE);
                }
                Phase::Body { id } => {
                    let split = self.buf.len() - CHUNK_CRC_SIZE;
                    let stored = BigEndian::read_u32(&self.buf[split..]);
                    self.buf.truncate(split);
                    let data = std::mem::take(&mut self.buf);
                    if self.check_crc {
                        let computed = crc(id, &data);
                        if computed != stored {
                            return Err(Error::Crc { chunk: id, stored, computed });
                        }
                    }
                    self.expect(Phase::Header, CHUNK_HEADER_SIZE);
                    return Ok(Pull::Ready(RawChunk { id, data, crc: stored }));
                }
            }
        }
    }
}

/// Writes a signature followed by CRC'd chunks.
pub struct ChunkWriter<W: Write> {
    inner: W,
}

impl<W: Write> ChunkWriter<W> {
    pub fn new(mut inner: W, signature: Signature) -> Result<Self> {
        inner.write_all(signature.bytes())?;
        Ok(Self { inner })
    }

    pub fn write_chunk(&mut self, id: ChunkId, data: &[u8]) -> Result<()> {
        if data.len() > MAX_CHUNK_LENGTH as usize {
            return Err(Error::ChunkTooLarge { chunk: id, len: data.len() as u32 });
        }
        self.inner.write_u32::<BigEndian>(data.len() as u32)?;
        self.inner.write_all(id.bytes())?;
        self.inner.write_all(data)?;
        self.inner.write_u32::<BigEndian>(crc(id, data))?;
        Ok(())
    }

    /// Re-encode and write a decoded record.
    pub fn write_record(&mut self, rec: &ChunkRecord) -> Result<()> {
        self.write_chunk(rec.id, &encode(rec))
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PushSource, SliceSource};

    fn stream() -> Vec<u8> {
        let mut w = ChunkWriter::new(Vec::new(), Signature::Png).unwrap();
        w.write_chunk(IHDR, &[0, 0, 0, 1, 0, 0, 0, 1, 8, 0, 0, 0, 0]).unwrap();
        w.write_chunk(IEND, &[]).unwrap();
        w.into_inner()
    }

    #[test]
    fn test_crc_known_value() {
        // CRC of an empty IEND chunk
        assert_eq!(crc(IEND, &[]), 0xAE42_6082);
    }

    #[test]
    fn test_read_all() {
        let bytes = stream();
        let mut src = SliceSource::new(&bytes);
        let mut reader = ChunkReader::new(true, MAX_CHUNK_LENGTH);
        let Pull::Ready(first) = reader.pull(&mut src).unwrap() else { panic!() };
        assert_eq!(reader.signature(), Some(Signature::Png));
        assert_eq!(first.id, IHDR);
        assert_eq!(first.data.len(), 13);
        let Pull::Ready(second) = reader.pull(&mut src).unwrap() else { panic!() };
        assert_eq!(second.id, IEND);
        assert!(matches!(reader.pull(&mut src).unwrap(), Pull::End));
    }

    #[test]
    fn test_resume_byte_by_byte() {
        let bytes = stream();
        let mut src = PushSource::new();
        let mut reader = ChunkReader::new(true, MAX_CHUNK_LENGTH);
        let mut ids = Vec::new();
        for &b in &bytes {
            src.push(&[b]);
            loop {
                match reader.pull(&mut src).unwrap() {
                    Pull::Ready(c) => ids.push(c.id),
                    Pull::Pending => break,
                    Pull::End => unreachable!(),
                }
            }
        }
        src.finish();
        assert!(matches!(reader.pull(&mut src).unwrap(), Pull::End));
        assert_eq!(ids, vec![IHDR, IEND]);
    }

    #[test]
    fn test_bad_crc() {
        let mut bytes = stream();
        let n = bytes.len();
        bytes[n - 1] ^= 0xFF;
        let mut src = SliceSource::new(&bytes);
        let mut reader = ChunkReader::new(true, MAX_CHUNK_LENGTH);
        assert!(matches!(reader.pull(&mut src).unwrap(), Pull::Ready(_)));
        assert!(matches!(reader.pull(&mut src), Err(Error::Crc { .. })));

        let mut src = SliceSource::new(&bytes);
        let mut reader = ChunkReader::new(false, MAX_CHUNK_LENGTH);
        reader.pull(&mut src).unwrap();
        assert!(matches!(reader.pull(&mut src).unwrap(), Pull::Ready(_)));
    }

    #[test]
    fn test_truncated_and_bad_signature() {
        let bytes = stream();
        let mut src = SliceSource::new(&bytes[..20]);
        let mut reader = ChunkReader::new(true, MAX_CHUNK_LENGTH);
        assert!(matches!(reader.pull(&mut src), Err(Error::UnexpectedEof(20))));

        let mut src = SliceSource::new(b"GIF89a\0\0\0\0");
        let mut reader = ChunkReader::new(true, MAX_CHUNK_LENGTH);
        assert!(matches!(reader.pull(&mut src), Err(Error::InvalidSignature)));
    }

    #[test]
    fn test_length_limit() {
        let bytes = stream();
        let mut src = SliceSource::new(&bytes);
        let mut reader = ChunkReader::new(true, 4);
        assert!(matches!(reader.pull(&mut src), Err(Error::ChunkTooLarge { len: 13, .. })));
    }
}
