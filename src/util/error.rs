//! Error types for the MNG library.

use std::path::PathBuf;
use thiserror::Error;

use crate::chunk::ChunkId;

/// What exactly is wrong with a chunk.
///
/// Carried by [`Error::Malformed`] and [`Error::Sequence`]; the enclosing
/// error holds the chunk id and sequence number.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    #[error("invalid length")]
    InvalidLength,
    #[error("value out of range")]
    OutOfRange,
    #[error("high bit set in 31-bit field")]
    HighBitSet,
    #[error("invalid bit depth")]
    InvalidBitDepth,
    #[error("invalid color type")]
    InvalidColorType,
    #[error("invalid compression method")]
    InvalidCompression,
    #[error("invalid filter method")]
    InvalidFilter,
    #[error("invalid interlace method")]
    InvalidInterlace,
    #[error("incomplete field group")]
    IncompleteGroup,
    #[error("unexpected trailing bytes")]
    TrailingBytes,
    #[error("chunk must be empty")]
    NotEmpty,
    #[error("chunk may not be empty here")]
    Empty,
    #[error("chunk not allowed in this stream type")]
    WrongContainer,
    #[error("required preceding chunk missing")]
    MissingPredecessor,
    #[error("chunk not allowed at this point")]
    Forbidden,
    #[error("header must be the first chunk")]
    HeaderNotFirst,
    #[error("palette required before indexed image data")]
    PaletteMissing,
    #[error("image data missing")]
    ImageDataMissing,
    #[error("multiple palettes")]
    MultiplePalettes,
    #[error("no global palette to inherit")]
    NoGlobalPalette,
    #[error("no global transparency to inherit")]
    NoGlobalTransparency,
    #[error("invalid delta type")]
    InvalidDelta,
    #[error("block parameters not allowed for this delta type")]
    InvalidBlock,
    #[error("unsupported keyword")]
    UnsupportedNeed,
    #[error("invalid offset size")]
    InvalidOffsetSize,
    #[error("invalid entry type")]
    InvalidEntryType,
    #[error("invalid magnification method")]
    InvalidMethod,
    #[error("invalid event")]
    InvalidEvent,
    #[error("misplaced TERM chunk")]
    MisplacedTerm,
    #[error("image larger than the maximum canvas")]
    ImageTooLarge,
}

/// Main error type for MNG operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Stream does not start with a PNG, JNG or MNG signature
    #[error("Invalid signature: not a PNG, JNG or MNG stream")]
    InvalidSignature,

    /// Stream is truncated
    #[error("Unexpected end of stream at position {0}")]
    UnexpectedEof(u64),

    /// Chunk checksum mismatch
    #[error("CRC mismatch in chunk {chunk}: stored {stored:#010x}, computed {computed:#010x}")]
    Crc { chunk: ChunkId, stored: u32, computed: u32 },

    /// Chunk length exceeds the configured limit
    #[error("Chunk {chunk} too large: {len} bytes")]
    ChunkTooLarge { chunk: ChunkId, len: u32 },

    /// Field-level violation inside one chunk
    #[error("Malformed chunk {chunk} (#{seq}): {fault} (value {value}, limit {limit})")]
    Malformed { chunk: ChunkId, seq: u32, fault: Fault, value: u64, limit: u64 },

    /// Chunk ordering violation
    #[error("Sequence error at chunk {chunk} (#{seq}): {fault}")]
    Sequence { chunk: ChunkId, seq: u32, fault: Fault },

    /// Unrecognized chunk with the critical bit set
    #[error("Unknown critical chunk {0}")]
    UnknownCritical(ChunkId),

    /// Stream uses features beyond this decoder (MHDR simplicity profile)
    #[error("Stream too complex: simplicity profile {0:#010x}")]
    TooComplex(u32),

    /// Object id not defined
    #[error("Object {0} not found")]
    ObjectNotFound(u16),

    /// Object was frozen by SAVE and cannot be modified
    #[error("Object {0} is frozen")]
    ObjectFrozen(u16),

    /// Target id of a clone is already taken
    #[error("Object {0} already exists")]
    ObjectExists(u16),

    /// PAST destination holds concrete data
    #[error("Object {0} is not abstract")]
    ObjectNotAbstract(u16),

    /// Color type / bit depth combination not valid for the operation
    #[error("Invalid color type {color_type} with bit depth {bit_depth}")]
    InvalidColorType { color_type: u8, bit_depth: u8 },

    /// No conversion exists between the two formats
    #[error("Cannot promote color type {from_type}/{from_depth} to {to_type}/{to_depth}")]
    InvalidPromotion { from_type: u8, from_depth: u8, to_type: u8, to_depth: u8 },

    /// Delta image incompatible with its target
    #[error("Invalid delta: {0}")]
    InvalidDelta(String),

    /// LOOP used while playback caching is off
    #[error("LOOP requires playback caching")]
    LoopWithCacheOff,

    /// ENDL without a LOOP of the same nesting level
    #[error("No matching LOOP for ENDL level {0}")]
    NoMatchingLoop(u8),

    /// Jump target beyond the end of the animation
    #[error("Frame {requested} out of range ({available} available)")]
    FrameOutOfRange { requested: u32, available: u32 },

    /// Named SEEK segment not present in the stream
    #[error("Segment not found: {0}")]
    SegmentNotFound(String),

    /// Operation not valid in the current decoder state
    #[error("Invalid operation: {0}")]
    FunctionInvalid(&'static str),

    /// Inflate/deflate failure
    #[error("Decompression failed: {0}")]
    Decompression(String),

    /// JPEG collaborator failure or missing codec
    #[error("JPEG error: {0}")]
    Jpeg(String),

    /// Color management collaborator failure
    #[error("Color management error: {0}")]
    ColorManagement(String),

    /// Application callback returned failure
    #[error("Application callback {0} failed")]
    Callback(&'static str),

    /// Memory mapping failed
    #[error("Memory mapping failed: {0}")]
    MmapFailed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create a malformed-chunk error.
    pub fn malformed(chunk: ChunkId, seq: u32, fault: Fault, value: u64, limit: u64) -> Self {
        Self::Malformed { chunk, seq, fault, value, limit }
    }

    /// Create a sequence error.
    pub fn sequence(chunk: ChunkId, seq: u32, fault: Fault) -> Self {
        Self::Sequence { chunk, seq, fault }
    }

    /// The fault carried by chunk-level errors.
    pub fn fault(&self) -> Option<Fault> {
        match self {
            Self::Malformed { fault, .. } | Self::Sequence { fault, .. } => Some(*fault),
            _ => None,
        }
    }
}

/// Result type alias for MNG operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A non-fatal problem surfaced during decode or playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub chunk: ChunkId,
    pub seq: u32,
    pub fault: Fault,
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "chunk {} (#{}): {}", self.chunk, self.seq, self.fault)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::id;

    #[test]
    fn test_error_display() {
        let e = Error::InvalidSignature;
        assert!(e.to_string().contains("signature"));

        let e = Error::malformed(id::IHDR, 1, Fault::OutOfRange, 17, 16);
        let text = e.to_string();
        assert!(text.contains("IHDR"));
        assert!(text.contains("17"));
        assert!(text.contains("16"));
        assert_eq!(e.fault(), Some(Fault::OutOfRange));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.fault(), None);
    }

    #[test]
    fn test_warning_display() {
        let w = Warning { chunk: id::TERM, seq: 5, fault: Fault::MisplacedTerm };
        assert_eq!(w.to_string(), "chunk TERM (#5): misplaced TERM chunk");
    }
}
