//! Core layer - collaborator interfaces and their default implementations.
//!
//! This module provides:
//! - [`ByteSource`] - Pull-based stream input ([`SliceSource`], [`PushSource`], [`ReaderSource`], [`MmapSource`])
//! - [`Inflater`] / [`ZlibCodec`] - zlib compression
//! - [`Callbacks`], [`JpegCodec`], [`ColorManager`], [`Canvas`], [`RowFilter`] - Pluggable services
//! - [`DecoderOptions`] - Decoder configuration

mod canvas;
mod cms;
mod collab;
mod compression;
mod filter;
#[cfg(feature = "jpeg")]
mod jpeg;
mod options;
mod source;

pub use canvas::{blend_over, RgbaCanvas};
pub use cms::{GammaOnly, SRGB_GAMMA};
pub use collab::{
    Callbacks, Canvas, ColorInfo, ColorManager, JpegCodec, JpegImage, NoCallbacks,
    PixelTransform, RowFilter, TermInfo,
};
pub use compression::{is_zlib, Inflater, ZlibCodec};
pub use filter::{
    packed_row_len, undo_intrapixel, Adam7Pass, PngRowFilter, ADAM7, INTRAPIXEL_METHOD,
};
#[cfg(feature = "jpeg")]
pub use jpeg::ImageJpeg;
pub use options::{DecoderOptions, DEFAULT_MAX_CANVAS};
#[cfg(feature = "mmap")]
pub use source::MmapSource;
pub use source::{ByteSource, PushSource, ReadStatus, ReaderSource, SliceSource};
