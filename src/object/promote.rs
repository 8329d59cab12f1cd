//! Bit-depth and color-type promotion.
//!
//! Only widening conversions exist: gray gains color or alpha, indexed
//! expands through its palette, and samples grow to a larger depth. The
//! result is always a fresh buffer without palette or transparency.

use super::data::{ImageData, ImageHeader};
use super::pixel::{get, max_value, set, widen};
use crate::chunk::Transparency;
use crate::util::{ColorType, Error, Result};

/// Fill method for widened samples.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Fill {
    /// Shift left, low bits zero.
    #[default]
    Zero,
    /// Replicate the high bits into the low bits.
    Replicate,
}

impl Fill {
    pub const fn from_u8(value: u8) -> Self {
        if value == 1 { Self::Replicate } else { Self::Zero }
    }
}

/// Whether `from` may be promoted to `to` (color types only).
pub const fn can_promote(from: ColorType, to: ColorType) -> bool {
    use ColorType::*;
    matches!(
        (from, to),
        (Gray, Gray | GrayAlpha | Rgb | Rgba)
            | (GrayAlpha, GrayAlpha | Rgba)
            | (Rgb, Rgb | Rgba)
            | (Rgba, Rgba)
            | (Indexed, Rgb | Rgba)
            | (JpegGray, JpegGray | JpegGrayAlpha | JpegColor | JpegColorAlpha)
            | (JpegGrayAlpha, JpegGrayAlpha | JpegColorAlpha)
            | (JpegColor, JpegColor | JpegColorAlpha)
            | (JpegColorAlpha, JpegColorAlpha)
    )
}

fn invalid(data: &ImageData, to_type: ColorType, to_depth: u8) -> Error {
    Error::InvalidPromotion {
        from_type: data.color_type().as_u8(),
        from_depth: data.bit_depth(),
        to_type: to_type.as_u8(),
        to_depth,
    }
}

/// Promote `data` to `to_type` at `to_depth` bits.
///
/// The identity conversion returns an unchanged copy.
pub fn promote(data: &ImageData, to_type: ColorType, to_depth: u8, fill: Fill) -> Result<ImageData> {
    let from_type = data.color_type();
    let from_depth = data.bit_depth();
    if from_type == to_type && from_depth == to_depth {
        return Ok(data.clone());
    }
    if !can_promote(from_type, to_type) || !to_type.allows_depth(to_depth) {
        return Err(invalid(data, to_type, to_depth));
    }
    // Indexed samples are palette indices; the palette itself is 8-bit.
    let source_depth = if from_type == ColorType::Indexed { 8 } else { from_depth };
    if to_depth < source_depth {
        return Err(invalid(data, to_type, to_depth));
    }

    let header = ImageHeader { color_type: to_type, bit_depth: to_depth, ..data.header };
    let mut out = data.clone();
    out.header = header;
    out.pixels = vec![0; header.data_size()];
    out.palette.clear();
    out.transparency = None;
    out.corrected = false;

    let in16 = from_depth > 8;
    let out16 = to_depth > 8;
    let in_ch = from_type.channels();
    let out_ch = to_type.channels();
    let opaque = max_value(to_depth);
    let scale = |v: u16| widen(v, source_depth, to_depth, fill == Fill::Replicate);

    for y in 0..header.height {
        let src = data.row(y);
        let dst = out.row_mut(y);
        for x in 0..header.width as usize {
            let s = |c: usize| get(src, x * in_ch + c, in16);
            // Samples at source depth, alpha None when the source has none.
            let (r, g, b, alpha) = match from_type {
                ColorType::Indexed => {
                    let i = s(0) as usize;
                    let c = data.palette.get(i).copied().unwrap_or_default();
                    let a = match &data.transparency {
                        Some(Transparency::Indexed(t)) => t.get(i).map(|&a| a as u16),
                        _ => None,
                    };
                    (c.r as u16, c.g as u16, c.b as u16, a)
                }
                t if t.is_gray() => {
                    let v = s(0);
                    let a = if t.has_alpha() {
                        Some(s(1))
                    } else {
                        match data.transparency {
                            Some(Transparency::Gray(key)) => Some(if key == v { 0 } else { max_value(source_depth) }),
                            _ => None,
                        }
                    };
                    (v, v, v, a)
                }
                t => {
                    let (r, g, b) = (s(0), s(1), s(2));
                    let a = if t.has_alpha() {
                        Some(s(3))
                    } else {
                        match data.transparency {
                            Some(Transparency::Rgb(kr, kg, kb)) => {
                                Some(if (kr, kg, kb) == (r, g, b) { 0 } else { max_value(source_depth) })
                            }
                            _ => None,
                        }
                    };
                    (r, g, b, a)
                }
            };
            let a = alpha.map(scale).unwrap_or(opaque);
            let base = x * out_ch;
            if to_type.is_gray() {
                set(dst, base, out16, scale(r));
            } else {
                set(dst, base, out16, scale(r));
                set(dst, base + 1, out16, scale(g));
                set(dst, base + 2, out16, scale(b));
            }
            if to_type.has_alpha() {
                set(dst, base + out_ch - 1, out16, a);
            }
        }
    }
    tracing::trace!(from = %from_type, from_depth, to = %to_type, to_depth, "promoted");
    Ok(out)
}
