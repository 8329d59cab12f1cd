//! Delta-PNG composition.
//!
//! A DHDR block carries a small image that is added to or replaces part of
//! an existing object, or a PPLT that edits its palette.

use super::data::ImageData;
use super::pixel::{get, max_value, set};
use crate::chunk::{PaletteRange, Transparency};
use crate::util::{ColorType, Error, Result, Rgb8};

/// DHDR delta types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeltaType {
    FullReplace,
    BlockPixelAdd,
    BlockAlphaAdd,
    BlockColorAdd,
    BlockPixelReplace,
    BlockAlphaReplace,
    BlockColorReplace,
    NoChange,
}

impl DeltaType {
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::FullReplace),
            1 => Some(Self::BlockPixelAdd),
            2 => Some(Self::BlockAlphaAdd),
            3 => Some(Self::BlockColorAdd),
            4 => Some(Self::BlockPixelReplace),
            5 => Some(Self::BlockAlphaReplace),
            6 => Some(Self::BlockColorReplace),
            7 => Some(Self::NoChange),
            _ => None,
        }
    }

    #[inline]
    pub const fn is_block(self) -> bool {
        !matches!(self, Self::FullReplace | Self::NoChange)
    }

    #[inline]
    const fn is_add(self) -> bool {
        matches!(self, Self::BlockPixelAdd | Self::BlockAlphaAdd | Self::BlockColorAdd)
    }
}

/// Which target channels a block delta touches.
fn target_channels(kind: DeltaType, target: ColorType) -> Result<Vec<usize>> {
    let channels = target.channels();
    match kind {
        DeltaType::BlockPixelAdd | DeltaType::BlockPixelReplace => Ok((0..channels).collect()),
        DeltaType::BlockAlphaAdd | DeltaType::BlockAlphaReplace => {
            if !target.has_alpha() {
                return Err(Error::InvalidDelta(format!("alpha delta on {target} image")));
            }
            Ok(vec![channels - 1])
        }
        DeltaType::BlockColorAdd | DeltaType::BlockColorReplace => {
            let color = if target.has_alpha() { channels - 1 } else { channels };
            Ok((0..color).collect())
        }
        _ => Ok(Vec::new()),
    }
}

/// Apply a block delta at `(x0, y0)` of `target`.
///
/// `delta` must match the target depth and supply exactly the touched
/// channels. Additions wrap modulo the sample range.
pub fn apply_block(target: &mut ImageData, delta: &ImageData, kind: DeltaType, x0: u32, y0: u32) -> Result<()> {
    match kind {
        DeltaType::NoChange => return Ok(()),
        DeltaType::FullReplace => {
            let keep_frozen = target.frozen;
            *target = delta.clone();
            target.frozen = keep_frozen;
            return Ok(());
        }
        _ => {}
    }
    let touched = target_channels(kind, target.color_type())?;
    if delta.bit_depth() != target.bit_depth() {
        return Err(Error::InvalidDelta(format!(
            "bit depth {} does not match target depth {}",
            delta.bit_depth(),
            target.bit_depth()
        )));
    }
    if delta.color_type().channels() != touched.len() {
        return Err(Error::InvalidDelta(format!(
            "{} delta cannot update {} channel(s) of a {} image",
            delta.color_type(),
            touched.len(),
            target.color_type()
        )));
    }

    let depth = target.bit_depth();
    let bit16 = depth > 8;
    let mask = max_value(depth) as u32;
    let t_ch = target.color_type().channels();
    let d_ch = delta.color_type().channels();
    let add = kind.is_add();
    let width = target.width();
    let height = target.height();

    for dy in 0..delta.height() {
        let ty = y0 as u64 + dy as u64;
        if ty >= height as u64 {
            break;
        }
        let src = delta.row(dy);
        let dst = target.row_mut(ty as u32);
        for dx in 0..delta.width() {
            let tx = x0 as u64 + dx as u64;
            if tx >= width as u64 {
                break;
            }
            for (i, &c) in touched.iter().enumerate() {
                let d = get(src, dx as usize * d_ch + i, bit16) as u32;
                let at = tx as usize * t_ch + c;
                let v = if add { (get(dst, at, bit16) as u32 + d) & mask } else { d };
                set(dst, at, bit16, v as u16);
            }
        }
    }
    Ok(())
}

/// PPLT delta types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaletteDelta {
    ReplaceRgb,
    AddRgb,
    ReplaceAlpha,
    AddAlpha,
    ReplaceRgba,
    AddRgba,
}

impl PaletteDelta {
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::ReplaceRgb),
            1 => Some(Self::AddRgb),
            2 => Some(Self::ReplaceAlpha),
            3 => Some(Self::AddAlpha),
            4 => Some(Self::ReplaceRgba),
            5 => Some(Self::AddRgba),
            _ => None,
        }
    }

    const fn color(self) -> bool {
        !matches!(self, Self::ReplaceAlpha | Self::AddAlpha)
    }

    const fn alpha(self) -> bool {
        !matches!(self, Self::ReplaceRgb | Self::AddRgb)
    }

    const fn add(self) -> bool {
        matches!(self, Self::AddRgb | Self::AddAlpha | Self::AddRgba)
    }
}

/// Apply PPLT ranges to the palette and tRNS of `target`.
///
/// Entries past the current palette grow it; new alpha entries start opaque.
pub fn apply_palette(target: &mut ImageData, kind: PaletteDelta, ranges: &[PaletteRange]) -> Result<()> {
    for range in ranges {
        if range.last < range.first {
            return Err(Error::InvalidDelta(format!("PPLT range {}..{} reversed", range.first, range.last)));
        }
        for (offset, entry) in range.entries.iter().enumerate() {
            let index = range.first as usize + offset;
            if index > range.last as usize {
                break;
            }
            if kind.color() {
                if target.palette.len() <= index {
                    target.palette.resize(index + 1, Rgb8::default());
                }
                let p = &mut target.palette[index];
                if kind.add() {
                    *p = Rgb8::new(
                        p.r.wrapping_add(entry[0]),
                        p.g.wrapping_add(entry[1]),
                        p.b.wrapping_add(entry[2]),
                    );
                } else {
                    *p = Rgb8::new(entry[0], entry[1], entry[2]);
                }
            }
            if kind.alpha() {
                let a = if kind.color() { entry[3] } else { entry[0] };
                if !matches!(target.transparency, Some(Transparency::Indexed(_))) {
                    target.transparency = Some(Transparency::Indexed(Vec::new()));
                }
                if let Some(Transparency::Indexed(table)) = &mut target.transparency {
                    if table.len() <= index {
                        table.resize(index + 1, 255);
                    }
                    table[index] = if kind.add() { table[index].wrapping_add(a) } else { a };
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::data::{GlobalDefaults, ImageHeader};

    fn image(w: u32, h: u32, ct: ColorType, pixels: Vec<u8>) -> ImageData {
        let mut data = ImageData::new(ImageHeader::new(w, h, 8, ct), true, true, &GlobalDefaults::default());
        data.pixels = pixels;
        data
    }

    #[test]
    fn test_pixel_add_wraps() {
        let mut target = image(2, 2, ColorType::Gray, vec![10, 20, 30, 250]);
        let delta = image(1, 1, ColorType::Gray, vec![10]);
        apply_block(&mut target, &delta, DeltaType::BlockPixelAdd, 1, 1).unwrap();
        assert_eq!(target.pixels, vec![10, 20, 30, 4]);
    }

    #[test]
    fn test_replace_clipped_to_target() {
        let mut target = image(2, 1, ColorType::Gray, vec![1, 2]);
        let delta = image(3, 2, ColorType::Gray, vec![7, 8, 9, 7, 8, 9]);
        apply_block(&mut target, &delta, DeltaType::BlockPixelReplace, 1, 0).unwrap();
        assert_eq!(target.pixels, vec![1, 7]);
    }

    #[test]
    fn test_alpha_and_color_blocks() {
        let mut target = image(1, 1, ColorType::Rgba, vec![1, 2, 3, 4]);
        let alpha = image(1, 1, ColorType::Gray, vec![99]);
        apply_block(&mut target, &alpha, DeltaType::BlockAlphaReplace, 0, 0).unwrap();
        assert_eq!(target.pixels, vec![1, 2, 3, 99]);

        let color = image(1, 1, ColorType::Rgb, vec![1, 1, 1]);
        apply_block(&mut target, &color, DeltaType::BlockColorAdd, 0, 0).unwrap();
        assert_eq!(target.pixels, vec![2, 3, 4, 99]);

        let mut gray = image(1, 1, ColorType::Gray, vec![0]);
        assert!(matches!(
            apply_block(&mut gray, &alpha, DeltaType::BlockAlphaAdd, 0, 0),
            Err(Error::InvalidDelta(_))
        ));
    }

    #[test]
    fn test_full_replace_and_no_change() {
        let mut target = image(1, 1, ColorType::Gray, vec![1]);
        target.frozen = true;
        let delta = image(2, 1, ColorType::Rgb, vec![0; 6]);
        apply_block(&mut target, &delta, DeltaType::NoChange, 0, 0).unwrap();
        assert_eq!(target.width(), 1);
        apply_block(&mut target, &delta, DeltaType::FullReplace, 0, 0).unwrap();
        assert_eq!(target.width(), 2);
        assert!(target.frozen);
    }

    #[test]
    fn test_palette_delta() {
        let mut target = image(1, 1, ColorType::Indexed, vec![0]);
        target.palette = vec![Rgb8::new(10, 10, 10)];
        let ranges = [PaletteRange { first: 0, last: 1, entries: vec![[1, 2, 3, 0], [5, 5, 5, 0]] }];
        apply_palette(&mut target, PaletteDelta::AddRgb, &ranges).unwrap();
        assert_eq!(target.palette, vec![Rgb8::new(11, 12, 13), Rgb8::new(5, 5, 5)]);

        let alpha = [PaletteRange { first: 1, last: 1, entries: vec![[7, 0, 0, 0]] }];
        apply_palette(&mut target, PaletteDelta::ReplaceAlpha, &alpha).unwrap();
        assert_eq!(target.transparency, Some(Transparency::Indexed(vec![255, 7])));
    }

    #[test]
    fn test_delta_type_codes() {
        assert_eq!(DeltaType::from_u8(7), Some(DeltaType::NoChange));
        assert!(DeltaType::from_u8(4).unwrap().is_block());
        assert!(!DeltaType::FullReplace.is_block());
        assert_eq!(DeltaType::from_u8(8), None);
        assert_eq!(PaletteDelta::from_u8(6), None);
    }
}
