//! Schema-driven chunk codec.
//!
//! - [`id`] - Chunk ids, property bits and stream signatures
//! - [`field`] / [`tables`] - Field rules per chunk type
//! - [`schema`] / [`index`] - Chunk schemas and the sorted dispatch index
//! - [`decode`] / [`encode`] - Generic decoder and its inverse
//! - [`hooks`] - Irregular payload layouts
//! - [`legacy`] - Compatibility shims for old streams
//! - [`state`] - Ordering rules checked against the parse state
//! - [`framing`] - Signature, chunk framing and CRC

pub mod decode;
pub mod encode;
pub mod field;
pub mod framing;
pub mod hooks;
pub mod id;
pub mod index;
pub mod legacy;
pub mod record;
pub mod schema;
pub mod state;
pub mod tables;

pub use decode::{decode, DecodeEnv};
pub use encode::encode;
pub use field::{FieldKind, FieldRule, Value};
pub use framing::{crc, ChunkReader, ChunkWriter, Pull, RawChunk};
pub use id::{ChunkId, Signature};
pub use index::lookup;
pub use record::*;
pub use schema::{ChunkSchema, Special};
pub use state::ParseState;
