//! Image buffers, image objects and the algorithms that edit them.
//!
//! - [`data`]: [`ImageData`] and its shared copy-on-write handle [`ImageRef`]
//! - [`image`]: [`ImageObject`] placement and the id-ordered [`ObjectStore`]
//! - [`promote`]: color type and bit depth widening
//! - [`magnify`]: MAGN resampling
//! - [`delta`]: Delta-PNG block and palette edits
//! - [`correct`]: one-shot color correction
//! - [`paste`]: PAST composition
//! - [`raster`]: PNG and JNG pixel reconstruction

pub mod correct;
pub mod data;
pub mod delta;
pub mod image;
pub mod magnify;
pub mod paste;
pub mod pixel;
pub mod promote;
pub mod raster;

pub use correct::color_correct;
pub use data::{GlobalDefaults, ImageData, ImageHeader, ImageRef};
pub use delta::{apply_block, apply_palette, DeltaType, PaletteDelta};
pub use image::{CloneKind, ImageObject, Location, ObjectDef, ObjectStore};
pub use magnify::{magnified_len, magnify, Magnification};
pub use paste::{blank_destination, paste, prepare_destination, target_point};
pub use pixel::{to_rgba16, to_rgba8};
pub use promote::{can_promote, promote, Fill};
pub use raster::{decode_jng, decode_png, JngAlpha, JngParts};
