//! Compression support.
//!
//! PNG-family streams use zlib for IDAT, zTXt, iTXt and iCCP data. The
//! decoder goes through the [`Inflater`] trait so applications can plug in
//! their own codec; [`ZlibCodec`] is the default, backed by flate2.

use std::io::{Read, Write};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::util::{Error, Result};

/// Inflate/deflate collaborator.
pub trait Inflater {
    /// Decompress a complete zlib stream.
    fn inflate(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Compress into a zlib stream.
    ///
    /// # Arguments
    /// * `data` - Data to compress
    /// * `level` - Compression level (0-9, where 0 stores, 9 is max)
    fn deflate(&self, data: &[u8], level: u32) -> Result<Vec<u8>>;
}

/// flate2-backed zlib codec.
#[derive(Clone, Copy, Debug, Default)]
pub struct ZlibCodec {
    /// Refuse to inflate beyond this many bytes (0 = unlimited).
    pub max_output: usize,
}

impl ZlibCodec {
    pub const fn with_limit(max_output: usize) -> Self {
        Self { max_output }
    }
}

impl Inflater for ZlibCodec {
    fn inflate(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = ZlibDecoder::new(data);
        let mut out = Vec::with_capacity(data.len() * 2);
        if self.max_output > 0 {
            let limit = self.max_output as u64 + 1;
            decoder
                .take(limit)
                .read_to_end(&mut out)
                .map_err(|e| Error::Decompression(e.to_string()))?;
            if out.len() > self.max_output {
                return Err(Error::Decompression(format!(
                    "inflated data exceeds {} bytes",
                    self.max_output
                )));
            }
        } else {
            decoder
                .read_to_end(&mut out)
                .map_err(|e| Error::Decompression(e.to_string()))?;
        }
        Ok(out)
    }

    fn deflate(&self, data: &[u8], level: u32) -> Result<Vec<u8>> {
        let compression_level = match level {
            0 => Compression::none(),
            1 => Compression::fast(),
            2..=5 => Compression::default(),
            _ => Compression::best(),
        };

        let mut encoder = ZlibEncoder::new(Vec::new(), compression_level);
        encoder.write_all(data)?;
        Ok(encoder.finish()?)
    }
}

/// Check if data starts with a zlib header.
pub fn is_zlib(data: &[u8]) -> bool {
    if data.len() < 2 {
        return false;
    }
    // CMF = deflate with window <= 32K, FCHECK makes CMF*256+FLG a multiple of 31
    let cmf = data[0];
    let flg = data[1];
    cmf & 0x0F == 8 && (u16::from(cmf) << 8 | u16::from(flg)) % 31 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deflate_inflate() {
        let codec = ZlibCodec::default();
        let original = b"Scan lines repeat, scan lines repeat, scan lines repeat. ".repeat(100);

        let compressed = codec.deflate(&original, 6).unwrap();
        assert!(compressed.len() < original.len());
        assert!(is_zlib(&compressed));

        let decompressed = codec.inflate(&compressed).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn test_stored_level_zero() {
        let codec = ZlibCodec::default();
        let data = b"Short data";
        let compressed = codec.deflate(data, 0).unwrap();
        assert!(is_zlib(&compressed));
        assert_eq!(codec.inflate(&compressed).unwrap(), data);
    }

    #[test]
    fn test_inflate_garbage() {
        let codec = ZlibCodec::default();
        let err = codec.inflate(b"Not compressed data").unwrap_err();
        assert!(matches!(err, Error::Decompression(_)));
        assert!(!is_zlib(b"Not compressed data"));
    }

    #[test]
    fn test_output_limit() {
        let data = vec![0u8; 4096];
        let compressed = ZlibCodec::default().deflate(&data, 9).unwrap();
        assert!(ZlibCodec::with_limit(4096).inflate(&compressed).is_ok());
        assert!(ZlibCodec::with_limit(100).inflate(&compressed).is_err());
    }
}
