//! Gamma-only color management.
//!
//! Honors gAMA and sRGB; cHRM and iCCP are accepted but not converted.

use super::collab::{ColorInfo, ColorManager, PixelTransform};
use crate::util::Result;

/// Gamma of sRGB content, as written in gAMA units.
pub const SRGB_GAMMA: u32 = 45455;

/// Gamma correction from file gamma to display gamma.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GammaOnly {
    pub display_gamma: f64,
    /// Used when the image carries neither gAMA nor sRGB.
    pub default_file_gamma: f64,
}

impl Default for GammaOnly {
    fn default() -> Self {
        Self { display_gamma: 2.2, default_file_gamma: 0.45455 }
    }
}

impl GammaOnly {
    pub fn new(display_gamma: f64, default_file_gamma: f64) -> Self {
        Self { display_gamma, default_file_gamma }
    }

    /// Exponent applied to normalized samples.
    pub fn exponent(&self, info: &ColorInfo) -> f64 {
        let file = match (info.srgb, info.gamma) {
            (Some(_), _) => SRGB_GAMMA as f64 / 100_000.0,
            (None, Some(g)) if g > 0 => g as f64 / 100_000.0,
            _ => self.default_file_gamma,
        };
        1.0 / (file * self.display_gamma)
    }
}

impl ColorManager for GammaOnly {
    fn transform(&self, info: &ColorInfo, bit16: bool) -> Result<Option<Box<dyn PixelTransform>>> {
        let exponent = self.exponent(info);
        if !exponent.is_finite() || (exponent - 1.0).abs() < 0.01 {
            return Ok(None);
        }
        tracing::trace!(exponent, bit16, "gamma transform");
        Ok(Some(Box::new(GammaTable::new(exponent))))
    }
}

/// Lookup table for 8-bit samples; 16-bit samples are computed directly.
struct GammaTable {
    exponent: f64,
    lut: [u8; 256],
}

impl GammaTable {
    fn new(exponent: f64) -> Self {
        let mut lut = [0u8; 256];
        for (i, v) in lut.iter_mut().enumerate() {
            *v = ((i as f64 / 255.0).powf(exponent) * 255.0 + 0.5) as u8;
        }
        Self { exponent, lut }
    }
}

impl PixelTransform for GammaTable {
    fn apply(&self, pixels: &mut [u8], bit16: bool) {
        if bit16 {
            for px in pixels.chunks_exact_mut(8) {
                for c in 0..3 {
                    let v = u16::from_be_bytes([px[c * 2], px[c * 2 + 1]]) as f64 / 65535.0;
                    let out = (v.powf(self.exponent) * 65535.0 + 0.5) as u16;
                    px[c * 2..c * 2 + 2].copy_from_slice(&out.to_be_bytes());
                }
            }
        } else {
            for px in pixels.chunks_exact_mut(4) {
                for c in &mut px[..3] {
                    *c = self.lut[*c as usize];
                }
            }
        }
    }
}
