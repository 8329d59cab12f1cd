//! Collaborator interfaces.
//!
//! The decoder delegates JPEG coding, color management, scan-line
//! unfiltering, canvas storage and application notifications to these
//! traits. Every [`Callbacks`] method has a default, so applications only
//! override what they need.

use crate::chunk::ChunkId;
use crate::util::{ColorType, Rect, Result};

// ============================================================================
// Application callbacks
// ============================================================================

/// TERM parameters handed to [`Callbacks::process_term`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TermInfo {
    pub action: u8,
    pub iteration_action: u8,
    pub delay: u32,
    pub iteration_max: u32,
}

/// Notifications from the decoder.
///
/// Methods returning `bool` report success; `false` aborts with
/// [`Error::Callback`](crate::util::Error::Callback).
#[allow(unused_variables)]
pub trait Callbacks {
    /// Stream header (IHDR, JHDR or MHDR) dimensions.
    fn process_header(&mut self, width: u32, height: u32) -> bool {
        true
    }

    /// tEXt, zTXt or iTXt contents.
    fn process_text(&mut self, chunk: ChunkId, keyword: &str, text: &str) -> bool {
        true
    }

    fn process_save(&mut self) -> bool {
        true
    }

    /// SEEK point reached with its segment name.
    fn process_seek(&mut self, name: &str) -> bool {
        true
    }

    /// nEED keyword the decoder does not recognize itself; `true` if supported.
    fn process_need(&mut self, keyword: &str) -> bool {
        false
    }

    /// Unknown chunk; `true` if the application consumed it.
    fn process_unknown(&mut self, chunk: ChunkId, data: &[u8]) -> bool {
        false
    }

    fn process_term(&mut self, term: TermInfo) -> bool {
        true
    }

    /// Canvas area changed and should be shown.
    fn refresh(&mut self, area: Rect) -> bool {
        true
    }

    /// Milliseconds on the application's clock.
    fn tick_count(&mut self) -> u64 {
        0
    }

    /// Arm a timer; the application calls `resume` when it fires.
    fn set_timer(&mut self, millis: u32) -> bool {
        true
    }
}

/// Callbacks that accept everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCallbacks;

impl Callbacks for NoCallbacks {}

// ============================================================================
// JPEG
// ============================================================================

/// Decoded JPEG samples, 8 bits per sample.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JpegImage {
    pub width: u32,
    pub height: u32,
    /// [`ColorType::JpegGray`] or [`ColorType::JpegColor`].
    pub color_type: ColorType,
    pub pixels: Vec<u8>,
}

impl JpegImage {
    #[inline]
    pub fn channels(&self) -> usize {
        self.color_type.channels()
    }
}

/// Baseline JPEG codec.
pub trait JpegCodec {
    fn decode(&self, data: &[u8]) -> Result<JpegImage>;

    fn encode(&self, image: &JpegImage, quality: u8) -> Result<Vec<u8>> {
        let _ = (image, quality);
        Err(crate::util::Error::Jpeg("encoding not supported".into()))
    }
}

// ============================================================================
// Color management
// ============================================================================

/// Color space description of an image.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColorInfo {
    /// gAMA value in units of 1/100000.
    pub gamma: Option<u32>,
    /// cHRM white point and primaries, 1/100000 units.
    pub chroma: Option<[u32; 8]>,
    /// sRGB rendering intent.
    pub srgb: Option<u8>,
    /// Inflated iCCP profile.
    pub icc: Option<Vec<u8>>,
}

impl ColorInfo {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.gamma.is_none() && self.chroma.is_none() && self.srgb.is_none() && self.icc.is_none()
    }

    /// Overlay `other` where it has values.
    pub fn merge(&mut self, other: &ColorInfo) {
        if other.gamma.is_some() {
            self.gamma = other.gamma;
        }
        if other.chroma.is_some() {
            self.chroma = other.chroma;
        }
        if other.srgb.is_some() {
            self.srgb = other.srgb;
        }
        if other.icc.is_some() {
            self.icc.clone_from(&other.icc);
        }
    }
}

/// Converts RGBA pixels in place.
pub trait PixelTransform {
    /// `pixels` is RGBA8, or big-endian RGBA16 when `bit16` is set.
    fn apply(&self, pixels: &mut [u8], bit16: bool);
}

/// Builds transforms from an image's color description to the display.
pub trait ColorManager {
    /// `None` when no conversion is needed.
    fn transform(&self, info: &ColorInfo, bit16: bool) -> Result<Option<Box<dyn PixelTransform>>>;
}

// ============================================================================
// Canvas and row filters
// ============================================================================

/// Output surface in RGBA8.
pub trait Canvas {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn resize(&mut self, width: u32, height: u32);
    /// Row `y`, `4 * width` bytes.
    fn row(&self, y: u32) -> &[u8];
    fn row_mut(&mut self, y: u32) -> &mut [u8];
}

/// PNG scan-line unfiltering.
pub trait RowFilter {
    /// Reverse filter `filter_type` on `row` given the previous
    /// reconstructed row (all zero for the first row of a pass).
    fn unfilter(&self, filter_type: u8, bpp: usize, prev: &[u8], row: &mut [u8]) -> Result<()>;
}
