//! MAGN resampling.
//!
//! Each axis has its own method:
//!
//! | method | color    | alpha    |
//! |--------|----------|----------|
//! | 1      | replicate| replicate|
//! | 2      | linear   | linear   |
//! | 3      | nearest  | nearest  |
//! | 4      | linear   | nearest  |
//! | 5      | nearest  | linear   |
//!
//! Method 1 repeats every source pixel (ML times for the first, MR for the
//! last, MX for the rest). The other methods keep every source pixel and
//! insert M-1 new ones in each interval.

use super::data::{ImageData, ImageHeader};
use super::pixel::{get, set};
use super::promote::{promote, Fill};
use crate::chunk::{MagnifySpec, Transparency};
use crate::util::{ColorType, Error, Result};

/// Pending magnification of one object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Magnification {
    pub method_x: u8,
    pub method_y: u8,
    pub mx: u32,
    pub my: u32,
    pub ml: u32,
    pub mr: u32,
    pub mt: u32,
    pub mb: u32,
}

impl Magnification {
    /// Nothing to do on either axis.
    #[inline]
    pub const fn is_noop(&self) -> bool {
        self.method_x == 0 && self.method_y == 0
    }
}

impl From<&MagnifySpec> for Magnification {
    fn from(spec: &MagnifySpec) -> Self {
        Self {
            method_x: spec.method_x,
            method_y: spec.method_y,
            mx: spec.mx as u32,
            my: spec.my as u32,
            ml: spec.ml as u32,
            mr: spec.mr as u32,
            mt: spec.mt as u32,
            mb: spec.mb as u32,
        }
    }
}

/// New length of one axis.
pub fn magnified_len(len: u32, method: u8, m: u32, first: u32, last: u32) -> u32 {
    match method {
        0 => len,
        1 => {
            let mut n = first;
            if len > 1 {
                n += last;
            }
            if len > 2 {
                n += (len - 2) * m;
            }
            n
        }
        _ => {
            let mut n = len + first.saturating_sub(1);
            if len > 2 {
                n += last.saturating_sub(1);
            }
            if len > 3 {
                n += (len - 3) * m.saturating_sub(1);
            }
            n
        }
    }
}

#[inline]
fn linear(s1: u16, s2: u16, step: u32, count: u32) -> u16 {
    if s1 == s2 {
        return s1;
    }
    let (s1, s2) = (s1 as i64, s2 as i64);
    let (step, count) = (step as i64, count as i64);
    // Truncating division matches the integer formula used by MNG writers.
    (((2 * step * (s2 - s1) + count) / (2 * count)) + s1) as u16
}

#[inline]
fn nearest(s1: u16, s2: u16, step: u32, count: u32) -> u16 {
    if step < count.div_ceil(2) { s1 } else { s2 }
}

/// Sample between `s1` and `s2` at `step` of `count`.
fn between(method: u8, is_alpha: bool, s1: u16, s2: u16, step: u32, count: u32) -> u16 {
    let lin = match method {
        2 => true,
        3 => false,
        4 => !is_alpha,
        5 => is_alpha,
        _ => false,
    };
    if lin { linear(s1, s2, step, count) } else { nearest(s1, s2, step, count) }
}

struct Layout {
    channels: usize,
    alpha: Option<usize>,
    bit16: bool,
}

impl Layout {
    fn pixel(&self, row: &[u8], x: usize, out: &mut [u16; 4]) {
        for (c, v) in out.iter_mut().enumerate().take(self.channels) {
            *v = get(row, x * self.channels + c, self.bit16);
        }
    }

    fn push(&self, dst: &mut Vec<u16>, px: &[u16; 4]) {
        dst.extend_from_slice(&px[..self.channels]);
    }
}

/// Magnify one row horizontally into `dst` (samples as u16).
fn magnify_row(src: &[u8], width: u32, mag: &Magnification, layout: &Layout, dst: &mut Vec<u16>) {
    let w = width as usize;
    let mut p1 = [0u16; 4];
    let mut p2 = [0u16; 4];
    if mag.method_x == 0 {
        for x in 0..w {
            layout.pixel(src, x, &mut p1);
            layout.push(dst, &p1);
        }
        return;
    }
    for x in 0..w {
        layout.pixel(src, x, &mut p1);
        let m = if x == 0 {
            mag.ml
        } else if (mag.method_x == 1 && x == w - 1) || (mag.method_x != 1 && x + 2 == w) {
            mag.mr
        } else {
            mag.mx
        };
        if mag.method_x == 1 {
            for _ in 0..m {
                layout.push(dst, &p1);
            }
            continue;
        }
        layout.push(dst, &p1);
        if x + 1 < w || w == 1 {
            let has_next = x + 1 < w;
            if has_next {
                layout.pixel(src, x + 1, &mut p2);
            }
            for step in 1..m {
                let mut out = p1;
                if has_next {
                    for c in 0..layout.channels {
                        out[c] = between(mag.method_x, layout.alpha == Some(c), p1[c], p2[c], step, m);
                    }
                }
                layout.push(dst, &out);
            }
        }
    }
}

/// Resample `data` per `mag`.
///
/// Indexed images are expanded to RGB (RGBA with tRNS) first; for a
/// concrete indexed buffer outside object 0 that is not allowed.
pub fn magnify(data: &ImageData, mag: &Magnification, object_zero: bool) -> Result<ImageData> {
    if mag.is_noop() {
        return Ok(data.clone());
    }
    for method in [mag.method_x, mag.method_y] {
        if method > 5 {
            return Err(Error::other(format!("invalid magnification method {method}")));
        }
    }

    let promoted;
    let src = if data.color_type() == ColorType::Indexed {
        if data.concrete && !object_zero {
            return Err(Error::InvalidColorType { color_type: 3, bit_depth: data.bit_depth() });
        }
        let target = match data.transparency {
            Some(Transparency::Indexed(_)) => ColorType::Rgba,
            _ => ColorType::Rgb,
        };
        promoted = promote(data, target, 8, Fill::Zero)?;
        &promoted
    } else {
        data
    };

    let width = src.width();
    let height = src.height();
    let new_w = magnified_len(width, mag.method_x, mag.mx, mag.ml, mag.mr);
    let new_h = magnified_len(height, mag.method_y, mag.my, mag.mt, mag.mb);
    let layout = Layout {
        channels: src.color_type().channels(),
        alpha: src.color_type().has_alpha().then(|| src.color_type().channels() - 1),
        bit16: src.bit_depth() > 8,
    };

    let mut samples: Vec<u16> = Vec::with_capacity(new_w as usize * new_h as usize * layout.channels);
    let mut scratch = vec![0u8; src.row_size()];
    let h = height as usize;
    for y in 0..h {
        let row1 = src.row(y as u32);
        magnify_row(row1, width, mag, &layout, &mut samples);

        let method = mag.method_y;
        if method == 0 || !(y + 1 < h || h == 1 || method == 1) {
            continue;
        }
        let row2 = if y + 1 < h { Some(src.row(y as u32 + 1)) } else { None };
        let m = if y == 0 {
            mag.mt
        } else if (method == 1 && y == h - 1) || (method != 1 && y + 2 == h) {
            mag.mb
        } else {
            mag.my
        };
        let row_samples = width as usize * layout.channels;
        for step in 1..m {
            for i in 0..row_samples {
                let s1 = get(row1, i, layout.bit16);
                let v = match (method, row2) {
                    (1, _) | (_, None) => s1,
                    (_, Some(r2)) => {
                        let c = i % layout.channels;
                        between(method, layout.alpha == Some(c), s1, get(r2, i, layout.bit16), step, m)
                    }
                };
                set(&mut scratch, i, layout.bit16, v);
            }
            magnify_row(&scratch, width, mag, &layout, &mut samples);
        }
    }

    let header = ImageHeader { width: new_w, height: new_h, ..src.header };
    let mut out = src.clone();
    out.header = header;
    out.pixels = vec![0; header.data_size()];
    for (i, v) in samples.iter().enumerate().take(out.pixels.len() / if layout.bit16 { 2 } else { 1 }) {
        set(&mut out.pixels, i, layout.bit16, *v);
    }
    tracing::trace!(width, height, new_w, new_h, "magnified");
    Ok(out)
}
