//! Chunk identifiers and stream signatures.
//!
//! Bit 5 of each id byte carries a property flag: ancillary (byte 0),
//! private (byte 1), reserved (byte 2) and safe-to-copy (byte 3).

use std::fmt;

/// Signature of a PNG stream.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Signature of a JNG stream.
pub const JNG_SIGNATURE: [u8; 8] = [0x8B, b'J', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Signature of an MNG stream.
pub const MNG_SIGNATURE: [u8; 8] = [0x8A, b'M', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Size of the stream signature in bytes.
pub const SIGNATURE_SIZE: usize = 8;

/// Size of the chunk length + id prefix.
pub const CHUNK_HEADER_SIZE: usize = 8;

/// Size of the trailing checksum.
pub const CHUNK_CRC_SIZE: usize = 4;

/// Largest legal chunk length (31 bits).
pub const MAX_CHUNK_LENGTH: u32 = 0x7FFF_FFFF;

/// Property bit inside each id byte.
pub const PROPERTY_BIT: u8 = 0x20;

/// A 4-byte chunk type code.
///
/// Ordering is byte-wise, which equals ordering by the big-endian `u32`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ChunkId(pub [u8; 4]);

impl ChunkId {
    #[inline]
    pub const fn new(bytes: &[u8; 4]) -> Self {
        Self(*bytes)
    }

    #[inline]
    pub const fn from_u32(value: u32) -> Self {
        Self(value.to_be_bytes())
    }

    #[inline]
    pub const fn as_u32(self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    #[inline]
    pub const fn bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Critical chunks must be understood; unknown ones abort decoding.
    #[inline]
    pub const fn is_critical(self) -> bool {
        self.0[0] & PROPERTY_BIT == 0
    }

    #[inline]
    pub const fn is_ancillary(self) -> bool {
        !self.is_critical()
    }

    #[inline]
    pub const fn is_private(self) -> bool {
        self.0[1] & PROPERTY_BIT != 0
    }

    #[inline]
    pub const fn is_reserved(self) -> bool {
        self.0[2] & PROPERTY_BIT != 0
    }

    #[inline]
    pub const fn is_safe_to_copy(self) -> bool {
        self.0[3] & PROPERTY_BIT != 0
    }

    /// Whether all four bytes are ASCII letters.
    pub fn is_valid(self) -> bool {
        self.0.iter().all(u8::is_ascii_alphabetic)
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            for &b in &self.0 {
                write!(f, "{}", b as char)?;
            }
            Ok(())
        } else {
            write!(f, "{:#010x}", self.as_u32())
        }
    }
}

impl fmt::Debug for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkId({})", self)
    }
}

/// Container type announced by the signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Signature {
    Png,
    Jng,
    Mng,
}

impl Signature {
    /// Match 8 signature bytes.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < SIGNATURE_SIZE {
            return None;
        }
        let head = &bytes[..SIGNATURE_SIZE];
        if head == PNG_SIGNATURE {
            Some(Self::Png)
        } else if head == JNG_SIGNATURE {
            Some(Self::Jng)
        } else if head == MNG_SIGNATURE {
            Some(Self::Mng)
        } else {
            None
        }
    }

    pub const fn bytes(self) -> &'static [u8; 8] {
        match self {
            Self::Png => &PNG_SIGNATURE,
            Self::Jng => &JNG_SIGNATURE,
            Self::Mng => &MNG_SIGNATURE,
        }
    }
}

// PNG
pub const IHDR: ChunkId = ChunkId(*b"IHDR");
pub const PLTE: ChunkId = ChunkId(*b"PLTE");
pub const IDAT: ChunkId = ChunkId(*b"IDAT");
pub const IEND: ChunkId = ChunkId(*b"IEND");
pub const TRNS: ChunkId = ChunkId(*b"tRNS");
pub const GAMA: ChunkId = ChunkId(*b"gAMA");
pub const CHRM: ChunkId = ChunkId(*b"cHRM");
pub const SRGB: ChunkId = ChunkId(*b"sRGB");
pub const ICCP: ChunkId = ChunkId(*b"iCCP");
pub const TEXT: ChunkId = ChunkId(*b"tEXt");
pub const ZTXT: ChunkId = ChunkId(*b"zTXt");
pub const ITXT: ChunkId = ChunkId(*b"iTXt");
pub const BKGD: ChunkId = ChunkId(*b"bKGD");
pub const PHYS: ChunkId = ChunkId(*b"pHYs");
pub const SBIT: ChunkId = ChunkId(*b"sBIT");
pub const SPLT: ChunkId = ChunkId(*b"sPLT");
pub const HIST: ChunkId = ChunkId(*b"hIST");
pub const TIME: ChunkId = ChunkId(*b"tIME");

// JNG
pub const JHDR: ChunkId = ChunkId(*b"JHDR");
pub const JDAT: ChunkId = ChunkId(*b"JDAT");
pub const JDAA: ChunkId = ChunkId(*b"JDAA");
pub const JSEP: ChunkId = ChunkId(*b"JSEP");
/// Pre-release spelling of JDAA.
pub const JDAA_OLD: ChunkId = ChunkId(*b"JdAA");

// MNG
pub const MHDR: ChunkId = ChunkId(*b"MHDR");
pub const MEND: ChunkId = ChunkId(*b"MEND");
pub const LOOP: ChunkId = ChunkId(*b"LOOP");
pub const ENDL: ChunkId = ChunkId(*b"ENDL");
pub const DEFI: ChunkId = ChunkId(*b"DEFI");
pub const BASI: ChunkId = ChunkId(*b"BASI");
pub const CLON: ChunkId = ChunkId(*b"CLON");
pub const PAST: ChunkId = ChunkId(*b"PAST");
pub const DISC: ChunkId = ChunkId(*b"DISC");
pub const BACK: ChunkId = ChunkId(*b"BACK");
pub const FRAM: ChunkId = ChunkId(*b"FRAM");
pub const MOVE: ChunkId = ChunkId(*b"MOVE");
pub const CLIP: ChunkId = ChunkId(*b"CLIP");
pub const SHOW: ChunkId = ChunkId(*b"SHOW");
pub const TERM: ChunkId = ChunkId(*b"TERM");
pub const SAVE: ChunkId = ChunkId(*b"SAVE");
pub const SEEK: ChunkId = ChunkId(*b"SEEK");
pub const DHDR: ChunkId = ChunkId(*b"DHDR");
pub const PROM: ChunkId = ChunkId(*b"PROM");
pub const IPNG: ChunkId = ChunkId(*b"IPNG");
pub const PPLT: ChunkId = ChunkId(*b"PPLT");
pub const IJNG: ChunkId = ChunkId(*b"IJNG");
pub const DROP: ChunkId = ChunkId(*b"DROP");
pub const DBYK: ChunkId = ChunkId(*b"DBYK");
pub const ORDR: ChunkId = ChunkId(*b"ORDR");
pub const MAGN: ChunkId = ChunkId(*b"MAGN");
pub const EXPI: ChunkId = ChunkId(*b"eXPI");
pub const FPRI: ChunkId = ChunkId(*b"fPRI");
pub const NEED: ChunkId = ChunkId(*b"nEED");
pub const PHYG: ChunkId = ChunkId(*b"pHYg");
pub const EVNT: ChunkId = ChunkId(*b"evNT");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signatures() {
        assert_eq!(Signature::detect(&PNG_SIGNATURE), Some(Signature::Png));
        assert_eq!(Signature::detect(&JNG_SIGNATURE), Some(Signature::Jng));
        assert_eq!(Signature::detect(&MNG_SIGNATURE), Some(Signature::Mng));
        assert_eq!(Signature::detect(b"GIF89a.."), None);
        assert_eq!(Signature::detect(&MNG_SIGNATURE[..4]), None);
    }

    #[test]
    fn test_property_bits() {
        assert!(IHDR.is_critical());
        assert!(GAMA.is_ancillary());
        assert!(!GAMA.is_private());
        assert!(TEXT.is_safe_to_copy());
        assert!(!IDAT.is_safe_to_copy());
        assert!(ChunkId::new(b"prVt").is_private());
    }

    #[test]
    fn test_ordering_matches_u32() {
        assert!(BACK < BASI);
        assert!(TERM < BKGD);
        assert_eq!(BACK < BASI, BACK.as_u32() < BASI.as_u32());
        assert_eq!(ChunkId::from_u32(IHDR.as_u32()), IHDR);
    }

    #[test]
    fn test_display() {
        assert_eq!(IHDR.to_string(), "IHDR");
        assert_eq!(EVNT.to_string(), "evNT");
        assert_eq!(ChunkId([0, 1, 2, 3]).to_string(), "0x00010203");
    }
}
