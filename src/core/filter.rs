//! PNG scan-line filters and Adam7 interlacing.

use super::collab::RowFilter;
use crate::util::{Error, Result};

/// Filter types of filter method 0.
pub const FILTER_NONE: u8 = 0;
pub const FILTER_SUB: u8 = 1;
pub const FILTER_UP: u8 = 2;
pub const FILTER_AVERAGE: u8 = 3;
pub const FILTER_PAETH: u8 = 4;

/// MNG intrapixel differencing (filter method 64).
pub const INTRAPIXEL_METHOD: u8 = 64;

#[inline]
const fn paeth_predict(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();
    // Order of the tests is fixed by the format.
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

/// The five standard filter types.
#[derive(Clone, Copy, Debug, Default)]
pub struct PngRowFilter;

impl RowFilter for PngRowFilter {
    fn unfilter(&self, filter_type: u8, bpp: usize, prev: &[u8], row: &mut [u8]) -> Result<()> {
        let bpp = bpp.max(1);
        match filter_type {
            FILTER_NONE => {}
            FILTER_SUB => {
                for i in bpp..row.len() {
                    row[i] = row[i].wrapping_add(row[i - bpp]);
                }
            }
            FILTER_UP => {
                for (p, b) in row.iter_mut().zip(prev) {
                    *p = p.wrapping_add(*b);
                }
            }
            FILTER_AVERAGE => {
                for i in 0..row.len() {
                    let a = if i >= bpp { row[i - bpp] as u16 } else { 0 };
                    let b = prev[i] as u16;
                    row[i] = row[i].wrapping_add(((a + b) / 2) as u8);
                }
            }
            FILTER_PAETH => {
                for i in 0..row.len() {
                    let (a, c) = if i >= bpp { (row[i - bpp], prev[i - bpp]) } else { (0, 0) };
                    row[i] = row[i].wrapping_add(paeth_predict(a, prev[i], c));
                }
            }
            other => return Err(Error::other(format!("invalid filter type {other}"))),
        }
        Ok(())
    }
}

/// Undo intrapixel differencing on an unfiltered RGB/RGBA row.
///
/// Red and blue were stored minus green.
pub fn undo_intrapixel(row: &mut [u8], channels: usize, bit16: bool) {
    if channels < 3 {
        return;
    }
    if bit16 {
        for px in row.chunks_exact_mut(channels * 2) {
            let g = u16::from_be_bytes([px[2], px[3]]);
            let r = u16::from_be_bytes([px[0], px[1]]).wrapping_add(g);
            let b = u16::from_be_bytes([px[4], px[5]]).wrapping_add(g);
            px[..2].copy_from_slice(&r.to_be_bytes());
            px[4..6].copy_from_slice(&b.to_be_bytes());
        }
    } else {
        for px in row.chunks_exact_mut(channels) {
            px[0] = px[0].wrapping_add(px[1]);
            px[2] = px[2].wrapping_add(px[1]);
        }
    }
}

// ============================================================================
// Adam7
// ============================================================================

/// One Adam7 pass: start and step per axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Adam7Pass {
    pub x0: u32,
    pub y0: u32,
    pub dx: u32,
    pub dy: u32,
}

pub const ADAM7: [Adam7Pass; 7] = [
    Adam7Pass { x0: 0, y0: 0, dx: 8, dy: 8 },
    Adam7Pass { x0: 4, y0: 0, dx: 8, dy: 8 },
    Adam7Pass { x0: 0, y0: 4, dx: 4, dy: 8 },
    Adam7Pass { x0: 2, y0: 0, dx: 4, dy: 4 },
    Adam7Pass { x0: 0, y0: 2, dx: 2, dy: 4 },
    Adam7Pass { x0: 1, y0: 0, dx: 2, dy: 2 },
    Adam7Pass { x0: 0, y0: 1, dx: 1, dy: 2 },
];

impl Adam7Pass {
    /// Size of the reduced image for a full `width` x `height`.
    pub const fn size(&self, width: u32, height: u32) -> (u32, u32) {
        let w = if width > self.x0 { (width - self.x0).div_ceil(self.dx) } else { 0 };
        let h = if height > self.y0 { (height - self.y0).div_ceil(self.dy) } else { 0 };
        (w, h)
    }
}

/// Bytes in a packed scan line, without the filter byte.
#[inline]
pub const fn packed_row_len(width: u32, channels: usize, bit_depth: u8) -> usize {
    (width as usize * channels * bit_depth as usize).div_ceil(8)
}
