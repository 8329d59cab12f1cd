//! Sample access and conversion to display pixels.

use super::data::ImageData;
use crate::chunk::Transparency;
use crate::util::{scale_to_8, ColorType};

/// Largest sample value at `depth` bits.
#[inline]
pub const fn max_value(depth: u8) -> u16 {
    if depth >= 16 { u16::MAX } else { (1u16 << depth) - 1 }
}

/// Read one sample.
#[inline]
pub fn get(row: &[u8], index: usize, bit16: bool) -> u16 {
    if bit16 {
        u16::from_be_bytes([row[index * 2], row[index * 2 + 1]])
    } else {
        row[index] as u16
    }
}

/// Write one sample.
#[inline]
pub fn set(row: &mut [u8], index: usize, bit16: bool, value: u16) {
    if bit16 {
        row[index * 2..index * 2 + 2].copy_from_slice(&value.to_be_bytes());
    } else {
        row[index] = value as u8;
    }
}

/// Widen a sample from `from` to `to` bits, by bit replication or by
/// shifting in zeros.
pub fn widen(value: u16, from: u8, to: u8, replicate: bool) -> u16 {
    if from >= to {
        return value;
    }
    if !replicate {
        return value << (to - from);
    }
    let mut out = 0u32;
    let mut filled = 0u8;
    while filled < to {
        out = (out << from) | value as u32;
        filled += from;
    }
    (out >> (filled - to)) as u16
}

/// Convert any supported buffer to RGBA8 for display.
///
/// tRNS is honored for gray, truecolor and indexed images.
pub fn to_rgba8(data: &ImageData) -> Vec<u8> {
    let header = &data.header;
    let depth = header.bit_depth;
    let bit16 = depth > 8;
    let channels = header.color_type.channels();
    let mut out = Vec::with_capacity(header.width as usize * header.height as usize * 4);

    for y in 0..header.height {
        let row = data.row(y);
        for x in 0..header.width as usize {
            let base = x * channels;
            let s = |c: usize| get(row, base + c, bit16);
            let px = match header.color_type {
                ColorType::Gray | ColorType::JpegGray => {
                    let v = s(0);
                    let a = match data.transparency {
                        Some(Transparency::Gray(key)) if key == v => 0,
                        _ => 255,
                    };
                    let g = scale_to_8(v, depth);
                    [g, g, g, a]
                }
                ColorType::Rgb | ColorType::JpegColor => {
                    let (r, g, b) = (s(0), s(1), s(2));
                    let a = match data.transparency {
                        Some(Transparency::Rgb(kr, kg, kb)) if (kr, kg, kb) == (r, g, b) => 0,
                        _ => 255,
                    };
                    [scale_to_8(r, depth), scale_to_8(g, depth), scale_to_8(b, depth), a]
                }
                ColorType::Indexed => {
                    let i = s(0) as usize;
                    let c = data.palette.get(i).copied().unwrap_or_default();
                    let a = match &data.transparency {
                        Some(Transparency::Indexed(alpha)) => alpha.get(i).copied().unwrap_or(255),
                        _ => 255,
                    };
                    [c.r, c.g, c.b, a]
                }
                ColorType::GrayAlpha | ColorType::JpegGrayAlpha => {
                    let g = scale_to_8(s(0), depth);
                    [g, g, g, scale_to_8(s(1), depth)]
                }
                ColorType::Rgba | ColorType::JpegColorAlpha => [
                    scale_to_8(s(0), depth),
                    scale_to_8(s(1), depth),
                    scale_to_8(s(2), depth),
                    scale_to_8(s(3), depth),
                ],
            };
            out.extend_from_slice(&px);
        }
    }
    out
}

/// Convert any supported buffer to RGBA16 samples.
///
/// Lower depths are widened by bit replication, so full intensity stays
/// full intensity.
pub fn to_rgba16(data: &ImageData) -> Vec<u16> {
    let header = &data.header;
    let depth = header.bit_depth;
    let bit16 = depth > 8;
    let channels = header.color_type.channels();
    let w = |v: u16| widen(v, depth, 16, true);
    let mut out = Vec::with_capacity(header.width as usize * header.height as usize * 4);

    for y in 0..header.height {
        let row = data.row(y);
        for x in 0..header.width as usize {
            let base = x * channels;
            let s = |c: usize| get(row, base + c, bit16);
            let px = match header.color_type {
                ColorType::Gray | ColorType::JpegGray => {
                    let v = s(0);
                    let a = match data.transparency {
                        Some(Transparency::Gray(key)) if key == v => 0,
                        _ => u16::MAX,
                    };
                    [w(v), w(v), w(v), a]
                }
                ColorType::Rgb | ColorType::JpegColor => {
                    let (r, g, b) = (s(0), s(1), s(2));
                    let a = match data.transparency {
                        Some(Transparency::Rgb(kr, kg, kb)) if (kr, kg, kb) == (r, g, b) => 0,
                        _ => u16::MAX,
                    };
                    [w(r), w(g), w(b), a]
                }
                ColorType::Indexed => {
                    let i = s(0) as usize;
                    let c = data.palette.get(i).copied().unwrap_or_default();
                    let a = match &data.transparency {
                        Some(Transparency::Indexed(alpha)) => alpha.get(i).copied().unwrap_or(255),
                        _ => 255,
                    };
                    let e = |v: u8| widen(v as u16, 8, 16, true);
                    [e(c.r), e(c.g), e(c.b), e(a)]
                }
                ColorType::GrayAlpha | ColorType::JpegGrayAlpha => [w(s(0)), w(s(0)), w(s(0)), w(s(1))],
                ColorType::Rgba | ColorType::JpegColorAlpha => [w(s(0)), w(s(1)), w(s(2)), w(s(3))],
            };
            out.extend_from_slice(&px);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::data::{GlobalDefaults, ImageHeader};
    use crate::util::Rgb8;

    #[test]
    fn test_widen() {
        assert_eq!(widen(1, 1, 8, true), 0xFF);
        assert_eq!(widen(1, 1, 8, false), 0x80);
        assert_eq!(widen(0b10, 2, 8, true), 0b1010_1010);
        assert_eq!(widen(0xAB, 8, 16, true), 0xABAB);
        assert_eq!(widen(0xAB, 8, 16, false), 0xAB00);
        assert_eq!(widen(0x5, 4, 4, true), 0x5);
    }

    #[test]
    fn test_get_set() {
        let mut row = vec![0u8; 4];
        set(&mut row, 1, true, 0x1234);
        assert_eq!(row, vec![0, 0, 0x12, 0x34]);
        assert_eq!(get(&row, 1, true), 0x1234);
        assert_eq!(get(&row, 3, false), 0x34);
        assert_eq!(max_value(4), 15);
        assert_eq!(max_value(16), 0xFFFF);
    }

    #[test]
    fn test_indexed_to_rgba() {
        let mut data = ImageData::new(
            ImageHeader::new(2, 1, 8, ColorType::Indexed),
            true,
            true,
            &GlobalDefaults::default(),
        );
        data.palette = vec![Rgb8::new(10, 20, 30), Rgb8::new(40, 50, 60)];
        data.transparency = Some(Transparency::Indexed(vec![0]));
        data.pixels = vec![0, 1];
        assert_eq!(to_rgba8(&data), vec![10, 20, 30, 0, 40, 50, 60, 255]);
    }

    #[test]
    fn test_gray_key_transparency() {
        let mut data = ImageData::new(
            ImageHeader::new(2, 1, 2, ColorType::Gray),
            true,
            true,
            &GlobalDefaults::default(),
        );
        data.transparency = Some(Transparency::Gray(1));
        data.pixels = vec![1, 3];
        assert_eq!(to_rgba8(&data), vec![0x55, 0x55, 0x55, 0, 0xFF, 0xFF, 0xFF, 255]);
        assert_eq!(to_rgba16(&data), vec![0x5555, 0x5555, 0x5555, 0, 0xFFFF, 0xFFFF, 0xFFFF, 0xFFFF]);
    }
}
