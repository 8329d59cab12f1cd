//! # MNG
//!
//! Decoder and player for MNG animations and the PNG and JNG images they
//! embed.
//!
//! Chunks are decoded through a schema table, checked against the ordering
//! rules of the stream, and turned into animation records kept in an
//! append-only log. Playback replays the log cooperatively: every call
//! returns as soon as it needs more bytes or has to wait for the next frame.
//!
//! ## Modules
//!
//! - [`util`] - Basic types (color types, geometry, errors)
//! - [`chunk`] - Chunk ids, schemas, the generic decoder/encoder and framing
//! - [`core`] - Collaborator traits and their default implementations
//! - [`object`] - Image buffers, objects and the algorithms editing them
//! - [`anim`] - Animation records, the log and the replay engine
//! - [`stream`] - The [`Mng`](stream::Mng) driver
//!
//! ## Example
//!
//! ```ignore
//! use mng::prelude::*;
//!
//! let source = MmapSource::open("spinner.mng")?;
//! let mut mng = Mng::new(source);
//! let mut cb = NoCallbacks;
//! mng.read(&mut cb)?;
//! mng.goto_frame(3, &mut cb)?;
//! println!("{:08x}", mng.checksum().unwrap_or(0));
//! ```

pub mod util;
pub mod chunk;
pub mod core;
pub mod object;
pub mod anim;
pub mod stream;

// Re-export commonly used types
pub use util::{ColorType, Error, Fault, Result, Warning};
pub use stream::{Mng, Status, Totals};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{ColorType, Error, Fault, Point, Rect, Result, Warning};
    pub use crate::chunk::{ChunkId, ChunkReader, ChunkRecord, ChunkWriter, Signature};
    pub use crate::core::{
        ByteSource, Callbacks, Canvas, DecoderOptions, NoCallbacks, PushSource, ReaderSource, RgbaCanvas,
        SliceSource,
    };
    #[cfg(feature = "mmap")]
    pub use crate::core::MmapSource;
    pub use crate::anim::{AnimationRecord, Engine};
    pub use crate::stream::{Mng, Status, StreamInfo, Totals};
}
