//! Pixel reconstruction from IDAT and JDAT data.
//!
//! PNG data is inflated, unfiltered row by row, de-interlaced and unpacked so
//! that every sample below 8 bits occupies its own byte. JNG color comes from
//! the JPEG collaborator; its alpha channel is either a PNG-style grayscale
//! stream (IDAT) or a grayscale JPEG (JDAA).

use super::data::ImageHeader;
use super::pixel::{max_value, widen};
use crate::core::{packed_row_len, undo_intrapixel, Adam7Pass, Inflater, JpegCodec, RowFilter, ADAM7, INTRAPIXEL_METHOD};
use crate::util::{ColorType, Error, Result};

const FULL: Adam7Pass = Adam7Pass { x0: 0, y0: 0, dx: 1, dy: 1 };

fn truncated(what: &str) -> Error {
    Error::Decompression(format!("{what} data ends early"))
}

/// Rebuild the pixel buffer described by `header` from concatenated IDAT
/// payloads.
pub fn decode_png(header: &ImageHeader, compressed: &[u8], inflater: &dyn Inflater, filter: &dyn RowFilter) -> Result<Vec<u8>> {
    let raw = inflater.inflate(compressed)?;
    unfilter_image(header, &raw, filter)
}

/// [`decode_png`] on already inflated scan lines.
pub fn unfilter_image(header: &ImageHeader, raw: &[u8], filter: &dyn RowFilter) -> Result<Vec<u8>> {
    let channels = header.color_type.channels();
    let depth = header.bit_depth;
    let bpp = (channels * depth as usize).div_ceil(8);
    let sample = header.sample_size();
    let mut pixels = vec![0u8; header.data_size()];

    let passes: &[Adam7Pass] = if header.interlace == 1 { &ADAM7 } else { std::slice::from_ref(&FULL) };
    let mut pos = 0usize;
    for pass in passes {
        let (w, h) = if header.interlace == 1 { pass.size(header.width, header.height) } else { (header.width, header.height) };
        if w == 0 || h == 0 {
            continue;
        }
        let len = packed_row_len(w, channels, depth);
        let mut prev = vec![0u8; len];
        let mut row = vec![0u8; len];
        for j in 0..h {
            if pos + 1 + len > raw.len() {
                return Err(truncated("IDAT"));
            }
            let kind = raw[pos];
            row.copy_from_slice(&raw[pos + 1..pos + 1 + len]);
            pos += 1 + len;
            filter.unfilter(kind, bpp, &prev, &mut row)?;
            prev.copy_from_slice(&row);
            if header.filter == INTRAPIXEL_METHOD {
                undo_intrapixel(&mut row, channels, depth > 8);
            }

            let y = pass.y0 + j * pass.dy;
            let out_row = y as usize * header.row_size();
            for i in 0..w {
                let x = pass.x0 + i * pass.dx;
                let at = out_row + x as usize * sample;
                if depth >= 8 {
                    let from = i as usize * sample;
                    pixels[at..at + sample].copy_from_slice(&row[from..from + sample]);
                } else {
                    // Sub-byte samples: one channel, packed high bits first.
                    let bit = i as usize * depth as usize;
                    let shift = 8 - depth as usize - bit % 8;
                    pixels[at] = (row[bit / 8] >> shift) & max_value(depth) as u8;
                }
            }
        }
    }
    Ok(pixels)
}

// ============================================================================
// JNG
// ============================================================================

/// Compressed parts of a JNG image.
#[derive(Clone, Debug, Default)]
pub struct JngParts {
    /// Concatenated JDAT payloads.
    pub jdat: Vec<u8>,
    /// Concatenated IDAT payloads carrying the alpha channel.
    pub idat: Vec<u8>,
    /// Concatenated JDAA payloads carrying the alpha channel.
    pub jdaa: Vec<u8>,
}

/// Alpha channel parameters from JHDR.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JngAlpha {
    pub depth: u8,
    /// 0 = PNG grayscale in IDAT, 8 = JPEG in JDAA.
    pub compression: u8,
    pub filter: u8,
    pub interlace: u8,
}

/// Decode a JNG image to 8-bit samples of `color_type`.
///
/// Alpha samples are scaled to 8 bits. A missing alpha stream leaves the
/// image opaque.
#[allow(clippy::too_many_arguments)]
pub fn decode_jng(
    width: u32,
    height: u32,
    color_type: ColorType,
    alpha: JngAlpha,
    parts: &JngParts,
    jpeg: &dyn JpegCodec,
    inflater: &dyn Inflater,
    filter: &dyn RowFilter,
) -> Result<Vec<u8>> {
    let color = jpeg.decode(&parts.jdat)?;
    if color.width != width || color.height != height {
        return Err(Error::Jpeg(format!(
            "JPEG is {}x{}, header says {width}x{height}",
            color.width, color.height
        )));
    }
    let count = width as usize * height as usize;
    let gray_out = color_type.is_gray();
    let color_channels = if gray_out { 1 } else { 3 };

    let alpha_values: Option<Vec<u8>> = if !color_type.has_alpha() {
        None
    } else if alpha.compression == 8 && !parts.jdaa.is_empty() {
        let a = jpeg.decode(&parts.jdaa)?;
        let step = a.channels();
        Some(a.pixels.iter().step_by(step).copied().take(count).collect())
    } else if !parts.idat.is_empty() {
        let depth = alpha.depth.max(1);
        let mut header = ImageHeader::new(width, height, depth, ColorType::Gray);
        header.filter = alpha.filter;
        header.interlace = alpha.interlace;
        let raw = decode_png(&header, &parts.idat, inflater, filter)?;
        let values = if depth > 8 {
            raw.chunks_exact(2).map(|p| p[0]).collect()
        } else {
            raw.iter().map(|&v| widen(v as u16, depth, 8, true) as u8).collect()
        };
        Some(values)
    } else {
        None
    };

    let out_channels = color_type.channels();
    let mut pixels = Vec::with_capacity(count * out_channels);
    let src_channels = color.channels();
    for i in 0..count {
        let px = &color.pixels[i * src_channels..(i + 1) * src_channels];
        if gray_out {
            pixels.push(px[0]);
        } else if src_channels == 1 {
            pixels.extend_from_slice(&[px[0]; 3]);
        } else {
            pixels.extend_from_slice(&px[..color_channels]);
        }
        if color_type.has_alpha() {
            let a = alpha_values.as_ref().and_then(|v| v.get(i).copied()).unwrap_or(u8::MAX);
            pixels.push(a);
        }
    }
    if pixels.len() != count * out_channels {
        return Err(truncated("JDAT"));
    }
    Ok(pixels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{JpegImage, PngRowFilter, ZlibCodec};

    fn deflate(data: &[u8]) -> Vec<u8> {
        ZlibCodec::default().deflate(data, 6).unwrap()
    }

    #[test]
    fn test_gray_rows() {
        let header = ImageHeader::new(2, 2, 8, ColorType::Gray);
        // Row 0 unfiltered, row 1 with Up.
        let raw = [0, 10, 20, 2, 1, 1];
        let out = decode_png(&header, &deflate(&raw), &ZlibCodec::default(), &PngRowFilter).unwrap();
        assert_eq!(out, vec![10, 20, 11, 21]);
    }

    #[test]
    fn test_unpacks_sub_byte() {
        let header = ImageHeader::new(5, 1, 2, ColorType::Indexed);
        let raw = [0, 0b00_01_10_11, 0b01_000000];
        let out = unfilter_image(&header, &raw, &PngRowFilter).unwrap();
        assert_eq!(out, vec![0, 1, 2, 3, 1]);
    }

    #[test]
    fn test_adam7() {
        let mut header = ImageHeader::new(2, 2, 8, ColorType::Gray);
        header.interlace = 1;
        // Passes with pixels for 2x2: 1 (0,0), 6 (1,0), 7 (row 1).
        let raw = [0, 1, 0, 2, 0, 3, 4];
        let out = unfilter_image(&header, &raw, &PngRowFilter).unwrap();
        assert_eq!(out, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_truncated() {
        let header = ImageHeader::new(4, 4, 8, ColorType::Rgb);
        assert!(matches!(
            unfilter_image(&header, &[0, 1, 2], &PngRowFilter),
            Err(Error::Decompression(_))
        ));
    }

    struct SolidJpeg(u8, ColorType);

    impl JpegCodec for SolidJpeg {
        fn decode(&self, _data: &[u8]) -> Result<JpegImage> {
            let channels = self.1.channels();
            Ok(JpegImage { width: 2, height: 1, color_type: self.1, pixels: vec![self.0; 2 * channels] })
        }
    }

    #[test]
    fn test_jng_with_png_alpha() {
        let parts = JngParts { jdat: vec![1], idat: deflate(&[0, 0b1000_0000]), jdaa: Vec::new() };
        let alpha = JngAlpha { depth: 1, ..Default::default() };
        let out = decode_jng(
            2,
            1,
            ColorType::JpegColorAlpha,
            alpha,
            &parts,
            &SolidJpeg(50, ColorType::JpegColor),
            &ZlibCodec::default(),
            &PngRowFilter,
        )
        .unwrap();
        assert_eq!(out, vec![50, 50, 50, 255, 50, 50, 50, 0]);
    }

    #[test]
    fn test_jng_size_mismatch() {
        let parts = JngParts { jdat: vec![1], ..Default::default() };
        let err = decode_jng(
            3,
            1,
            ColorType::JpegGray,
            JngAlpha::default(),
            &parts,
            &SolidJpeg(0, ColorType::JpegGray),
            &ZlibCodec::default(),
            &PngRowFilter,
        );
        assert!(matches!(err, Err(Error::Jpeg(_))));
    }
}
