//! Color types and sample layout.
//!
//! Samples below 8 bits are stored one per byte, so the layout of a pixel
//! buffer only depends on the color type and whether the depth exceeds 8.

use std::fmt;

/// PNG and JNG color types.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ColorType {
    /// Grayscale
    #[default]
    Gray = 0,
    /// Truecolor
    Rgb = 2,
    /// Palette index
    Indexed = 3,
    /// Grayscale with alpha
    GrayAlpha = 4,
    /// Truecolor with alpha
    Rgba = 6,
    /// JPEG grayscale
    JpegGray = 8,
    /// JPEG color
    JpegColor = 10,
    /// JPEG grayscale with alpha
    JpegGrayAlpha = 12,
    /// JPEG color with alpha
    JpegColorAlpha = 14,
}

impl ColorType {
    /// Parse a wire value.
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Gray),
            2 => Some(Self::Rgb),
            3 => Some(Self::Indexed),
            4 => Some(Self::GrayAlpha),
            6 => Some(Self::Rgba),
            8 => Some(Self::JpegGray),
            10 => Some(Self::JpegColor),
            12 => Some(Self::JpegGrayAlpha),
            14 => Some(Self::JpegColorAlpha),
            _ => None,
        }
    }

    /// Wire value.
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Number of stored channels.
    #[inline]
    pub const fn channels(self) -> usize {
        match self {
            Self::Gray | Self::Indexed | Self::JpegGray => 1,
            Self::GrayAlpha | Self::JpegGrayAlpha => 2,
            Self::Rgb | Self::JpegColor => 3,
            Self::Rgba | Self::JpegColorAlpha => 4,
        }
    }

    /// Whether the last channel is alpha.
    #[inline]
    pub const fn has_alpha(self) -> bool {
        matches!(self, Self::GrayAlpha | Self::Rgba | Self::JpegGrayAlpha | Self::JpegColorAlpha)
    }

    /// Whether the color channels are a single gray channel.
    #[inline]
    pub const fn is_gray(self) -> bool {
        matches!(self, Self::Gray | Self::GrayAlpha | Self::JpegGray | Self::JpegGrayAlpha)
    }

    /// JPEG-backed color types (8..14).
    #[inline]
    pub const fn is_jpeg(self) -> bool {
        (self as u8) >= 8
    }

    /// Bytes per pixel for the given bit depth.
    #[inline]
    pub const fn sample_size(self, bit_depth: u8) -> usize {
        let wide = if bit_depth > 8 { 2 } else { 1 };
        self.channels() * wide
    }

    /// Whether `bit_depth` is legal for this color type in a PNG-style header.
    pub const fn allows_depth(self, bit_depth: u8) -> bool {
        match self {
            Self::Gray => matches!(bit_depth, 1 | 2 | 4 | 8 | 16),
            Self::Indexed => matches!(bit_depth, 1 | 2 | 4 | 8),
            Self::Rgb | Self::GrayAlpha | Self::Rgba => matches!(bit_depth, 8 | 16),
            Self::JpegGray | Self::JpegColor | Self::JpegGrayAlpha | Self::JpegColorAlpha => {
                matches!(bit_depth, 8 | 12 | 16)
            }
        }
    }

    /// The same color type with an alpha channel added.
    pub const fn with_alpha(self) -> Self {
        match self {
            Self::Gray => Self::GrayAlpha,
            Self::Rgb | Self::Indexed => Self::Rgba,
            Self::JpegGray => Self::JpegGrayAlpha,
            Self::JpegColor => Self::JpegColorAlpha,
            other => other,
        }
    }
}

impl fmt::Display for ColorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Gray => "gray",
            Self::Rgb => "rgb",
            Self::Indexed => "indexed",
            Self::GrayAlpha => "gray+alpha",
            Self::Rgba => "rgba",
            Self::JpegGray => "jpeg-gray",
            Self::JpegColor => "jpeg-color",
            Self::JpegGrayAlpha => "jpeg-gray+alpha",
            Self::JpegColorAlpha => "jpeg-color+alpha",
        };
        f.write_str(name)
    }
}

/// An 8-bit palette entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb8 {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// A 16-bit color as carried by bKGD/BACK.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb16 {
    pub r: u16,
    pub g: u16,
    pub b: u16,
}

/// Scale a sample of `depth` bits up to 8 bits by bit replication.
#[inline]
pub const fn scale_to_8(value: u16, depth: u8) -> u8 {
    match depth {
        1 => if value & 1 != 0 { 0xFF } else { 0 },
        2 => ((value & 3) * 0x55) as u8,
        4 => ((value & 0xF) * 0x11) as u8,
        8 => value as u8,
        _ => (value >> 8) as u8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_sizes() {
        assert_eq!(ColorType::Gray.sample_size(1), 1);
        assert_eq!(ColorType::Gray.sample_size(16), 2);
        assert_eq!(ColorType::Rgb.sample_size(8), 3);
        assert_eq!(ColorType::Rgb.sample_size(16), 6);
        assert_eq!(ColorType::Indexed.sample_size(4), 1);
        assert_eq!(ColorType::GrayAlpha.sample_size(16), 4);
        assert_eq!(ColorType::Rgba.sample_size(16), 8);
        assert_eq!(ColorType::JpegGray.sample_size(12), 2);
        assert_eq!(ColorType::JpegColorAlpha.sample_size(8), 4);
    }

    #[test]
    fn test_from_u8() {
        for v in 0..=20u8 {
            if let Some(ct) = ColorType::from_u8(v) {
                assert_eq!(ct.as_u8(), v);
            }
        }
        assert_eq!(ColorType::from_u8(1), None);
        assert_eq!(ColorType::from_u8(7), None);
    }

    #[test]
    fn test_allowed_depths() {
        assert!(ColorType::Gray.allows_depth(2));
        assert!(!ColorType::Rgb.allows_depth(4));
        assert!(!ColorType::Indexed.allows_depth(16));
        assert!(ColorType::Rgba.allows_depth(16));
    }

    #[test]
    fn test_scale_to_8() {
        assert_eq!(scale_to_8(1, 1), 0xFF);
        assert_eq!(scale_to_8(2, 2), 0xAA);
        assert_eq!(scale_to_8(0xF, 4), 0xFF);
        assert_eq!(scale_to_8(0x1234, 16), 0x12);
    }
}
