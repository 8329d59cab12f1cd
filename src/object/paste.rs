//! PAST composition.
//!
//! Sources are composited onto an RGBA destination buffer:
//!
//! - composition 0 puts the source over the destination, 1 replaces it, and
//!   2 slides the source under it
//! - orientation 2 flips both axes, 4 flips horizontally, 6 flips
//!   vertically and 8 tiles the source over the whole clip area
//! - offsets and boundaries are absolute or relative to the target point

use super::data::{ImageData, ImageHeader};
use super::pixel::{get, max_value, set, to_rgba16};
use super::promote::{promote, Fill};
use crate::chunk::PasteSource;
use crate::util::{ColorType, Error, Point, Rect, Result};

pub const COMPOSE_OVER: u8 = 0;
pub const COMPOSE_REPLACE: u8 = 1;
pub const COMPOSE_UNDER: u8 = 2;

pub const ORIENT_FLIP_XY: u8 = 2;
pub const ORIENT_FLIP_X: u8 = 4;
pub const ORIENT_FLIP_Y: u8 = 6;
pub const ORIENT_TILE: u8 = 8;

/// Target point of a PAST chunk.
///
/// Type 0 is absolute, 1 is relative to the destination object's previous
/// target and 2 is relative to the stream's previous target.
pub fn target_point(target_type: u8, x: i32, y: i32, object_prev: Point, stream_prev: Point) -> Point {
    match target_type {
        1 => object_prev.offset(x, y),
        2 => stream_prev.offset(x, y),
        _ => Point::new(x, y),
    }
}

/// Whether `data` can take pasted pixels without conversion.
#[inline]
pub fn is_paste_ready(data: &ImageData) -> bool {
    matches!(data.color_type(), ColorType::Rgba | ColorType::JpegColorAlpha) && data.bit_depth() >= 8
}

/// Convert a destination buffer to RGBA.
///
/// Deep color stays 16-bit; everything else becomes 8-bit. JNG buffers keep
/// their depth and gain color and alpha.
pub fn prepare_destination(data: &ImageData) -> Result<ImageData> {
    if is_paste_ready(data) {
        return Ok(data.clone());
    }
    let (to_type, to_depth) = match data.color_type() {
        ColorType::JpegGray | ColorType::JpegColor | ColorType::JpegGrayAlpha => {
            (ColorType::JpegColorAlpha, data.bit_depth().max(8))
        }
        ColorType::Indexed => (ColorType::Rgba, 8),
        _ if data.bit_depth() > 8 => (ColorType::Rgba, 16),
        _ => (ColorType::Rgba, 8),
    };
    promote(data, to_type, to_depth, Fill::Replicate)
}

/// Fresh RGBA8 destination for pastes into object 0.
pub fn blank_destination(width: u32, height: u32) -> ImageData {
    let mut data = ImageData::empty();
    data.reset_details(ImageHeader::new(width, height, 8, ColorType::Rgba), false, &Default::default());
    data.concrete = false;
    data.viewable = true;
    data
}

#[inline]
fn over(src: [u32; 4], dst: [u32; 4], max: u32) -> [u32; 4] {
    let (sa, da) = (src[3], dst[3]);
    if sa == 0 {
        return dst;
    }
    if sa == max || da == 0 {
        return src;
    }
    let m = max as u64;
    let (sa, da) = (sa as u64, da as u64);
    // Alpha of the result, then colors weighted by their contribution.
    let ra = sa * m + da * (m - sa);
    let mut out = [0u32; 4];
    for c in 0..3 {
        let v = (src[c] as u64 * sa * m + dst[c] as u64 * da * (m - sa) + ra / 2) / ra;
        out[c] = v.min(m) as u32;
    }
    out[3] = ((ra + m / 2) / m).min(m) as u32;
    out
}

/// Composite one source onto `dest`.
///
/// `dest` must be RGBA of at least 8 bits; see [`prepare_destination`].
pub fn paste(dest: &mut ImageData, target: Point, source: &ImageData, spec: &PasteSource) -> Result<()> {
    if !is_paste_ready(dest) {
        return Err(Error::InvalidColorType { color_type: dest.color_type().as_u8(), bit_depth: dest.bit_depth() });
    }
    if spec.composition > COMPOSE_UNDER {
        return Err(Error::other(format!("invalid PAST composition {}", spec.composition)));
    }
    let (sw, sh) = (source.width(), source.height());
    if sw == 0 || sh == 0 {
        return Ok(());
    }

    let origin = if spec.offset_type == 1 {
        target.offset(spec.offset_x, spec.offset_y)
    } else {
        Point::new(spec.offset_x, spec.offset_y)
    };
    let tile = spec.orientation == ORIENT_TILE;
    let boundary = if spec.boundary_type == 1 {
        spec.boundary.offset(target.x, target.y)
    } else {
        spec.boundary
    };
    let mut area = Rect::from_size(Point::default(), dest.width(), dest.height()).intersect(&boundary);
    if !tile {
        area = area.intersect(&Rect::from_size(origin, sw, sh));
    }
    if area.is_empty() {
        return Ok(());
    }

    let flip_x = matches!(spec.orientation, ORIENT_FLIP_XY | ORIENT_FLIP_X);
    let flip_y = matches!(spec.orientation, ORIENT_FLIP_XY | ORIENT_FLIP_Y);
    let bit16 = dest.bit_depth() > 8;
    let max = max_value(dest.bit_depth()) as u32;
    let shift = if bit16 { 0 } else { 8 };
    let pixels = to_rgba16(source);

    for y in area.top..area.bottom {
        let mut sy = (y as i64 - origin.y as i64).rem_euclid(sh as i64) as u32;
        if flip_y {
            sy = sh - 1 - sy;
        }
        let row = dest.row_mut(y as u32);
        for x in area.left..area.right {
            let mut sx = (x as i64 - origin.x as i64).rem_euclid(sw as i64) as u32;
            if flip_x {
                sx = sw - 1 - sx;
            }
            let at = (sy as usize * sw as usize + sx as usize) * 4;
            let mut src = [0u32; 4];
            for (c, v) in src.iter_mut().enumerate() {
                *v = (pixels[at + c] >> shift) as u32;
            }
            let base = x as usize * 4;
            let mut dst = [0u32; 4];
            for (c, v) in dst.iter_mut().enumerate() {
                *v = get(row, base + c, bit16) as u32;
            }
            let out = match spec.composition {
                COMPOSE_OVER => over(src, dst, max),
                COMPOSE_UNDER => over(dst, src, max),
                _ => src,
            };
            for (c, &v) in out.iter().enumerate() {
                set(row, base + c, bit16, v as u16);
            }
        }
    }
    Ok(())
}
