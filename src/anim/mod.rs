//! Animation layer - recording and replaying the effect of chunks.
//!
//! - [`record`]: [`AnimationRecord`], one per chunk with a playback effect
//! - [`log`]: the append-only [`AnimationLog`] with frame, layer, time and
//!   segment lookups
//! - [`context`]: framing, loops and counters in [`PlaybackContext`]
//! - [`compose`]: drawing objects onto the canvas
//! - [`replay`]: the [`Engine`] that applies records

pub mod compose;
pub mod context;
pub mod log;
pub mod record;
pub mod replay;

pub use context::{Framing, LoopFrame, Mode, PlaybackContext, Settings, DEFAULT_TICKS, INFINITE_REPEAT};
pub use log::{AnimationLog, LogEntry};
pub use record::{AnimationRecord, Background, DeltaImage, Stamp};
pub use replay::{Engine, Flow};
