//! Color correction of image buffers.

use super::data::ImageData;
use crate::core::ColorManager;
use crate::util::{ColorType, Error, Result};

/// Run `data` through the color manager once.
///
/// Only RGBA buffers of 8 or 16 bits qualify. A buffer already corrected is
/// left alone. Returns whether pixels were changed.
pub fn color_correct(data: &mut ImageData, cms: &dyn ColorManager) -> Result<bool> {
    let ct = data.color_type();
    if !matches!(ct, ColorType::Rgba | ColorType::JpegColorAlpha) || data.bit_depth() < 8 {
        return Err(Error::InvalidColorType { color_type: ct.as_u8(), bit_depth: data.bit_depth() });
    }
    if data.corrected {
        return Ok(false);
    }
    let bit16 = data.bit_depth() > 8;
    let changed = match cms.transform(&data.color, bit16)? {
        Some(transform) => {
            transform.apply(&mut data.pixels, bit16);
            true
        }
        None => false,
    };
    data.corrected = true;
    Ok(changed)
}
