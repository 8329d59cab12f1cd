//! Image data: a pixel buffer plus its color metadata.
//!
//! Several image objects may share one [`ImageData`] through an
//! [`ImageRef`]. Writes go through [`ImageRef::make_mut`], which detaches a
//! private copy first when the buffer is shared.

use std::ops::Deref;
use std::rc::Rc;

use crate::chunk::Transparency;
use crate::core::ColorInfo;
use crate::util::{ColorType, Rgb16, Rgb8};

/// Format parameters of an image buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImageHeader {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub color_type: ColorType,
    pub compression: u8,
    pub filter: u8,
    pub interlace: u8,
}

impl ImageHeader {
    pub const fn new(width: u32, height: u32, bit_depth: u8, color_type: ColorType) -> Self {
        Self { width, height, bit_depth, color_type, compression: 0, filter: 0, interlace: 0 }
    }

    #[inline]
    pub const fn sample_size(&self) -> usize {
        self.color_type.sample_size(self.bit_depth)
    }

    #[inline]
    pub const fn row_size(&self) -> usize {
        self.sample_size() * self.width as usize
    }

    #[inline]
    pub const fn data_size(&self) -> usize {
        self.row_size() * self.height as usize
    }
}

/// Stream-wide defaults inherited by new buffers (top-level gAMA, cHRM,
/// sRGB, iCCP and bKGD of an MNG).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GlobalDefaults {
    pub color: ColorInfo,
    pub background: Option<Rgb16>,
}

/// A pixel buffer with metadata.
///
/// Samples below 8 bits occupy one byte each; 16-bit samples are big-endian.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageData {
    pub header: ImageHeader,
    pub concrete: bool,
    pub viewable: bool,
    pub pixels: Vec<u8>,
    pub palette: Vec<Rgb8>,
    pub transparency: Option<Transparency>,
    pub color: ColorInfo,
    pub background: Option<Rgb16>,
    /// JNG alpha channel depth.
    pub alpha_depth: u8,
    pub frozen: bool,
    pub corrected: bool,
}

impl ImageData {
    /// Allocate a zeroed buffer.
    pub fn new(header: ImageHeader, concrete: bool, viewable: bool, globals: &GlobalDefaults) -> Self {
        Self {
            header,
            concrete,
            viewable,
            pixels: vec![0; header.data_size()],
            palette: Vec::new(),
            transparency: None,
            color: globals.color.clone(),
            background: globals.background,
            alpha_depth: 0,
            frozen: false,
            corrected: false,
        }
    }

    /// Empty 0x0 buffer, as held by object 0 before any image.
    pub fn empty() -> Self {
        Self::new(ImageHeader::default(), false, false, &GlobalDefaults::default())
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.header.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.header.height
    }

    #[inline]
    pub fn color_type(&self) -> ColorType {
        self.header.color_type
    }

    #[inline]
    pub fn bit_depth(&self) -> u8 {
        self.header.bit_depth
    }

    #[inline]
    pub fn sample_size(&self) -> usize {
        self.header.sample_size()
    }

    #[inline]
    pub fn row_size(&self) -> usize {
        self.header.row_size()
    }

    pub fn row(&self, y: u32) -> &[u8] {
        let size = self.row_size();
        let start = y as usize * size;
        &self.pixels[start..start + size]
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let size = self.row_size();
        let start = y as usize * size;
        &mut self.pixels[start..start + size]
    }

    #[inline]
    pub fn has_palette(&self) -> bool {
        !self.palette.is_empty()
    }

    /// Independent copy with its own concreteness; never frozen.
    pub fn deep_clone(&self, concrete: bool) -> Self {
        let mut copy = self.clone();
        copy.concrete = concrete;
        copy.frozen = false;
        copy
    }

    /// Change the format in place.
    ///
    /// The buffer is reallocated when its size changes and zeroed otherwise.
    /// With `reset_all` the palette and transparency are dropped and the
    /// color metadata goes back to `globals`.
    pub fn reset_details(&mut self, header: ImageHeader, reset_all: bool, globals: &GlobalDefaults) {
        let size = header.data_size();
        if size != self.pixels.len() {
            self.pixels = vec![0; size];
        } else {
            self.pixels.fill(0);
        }
        self.header = header;
        self.corrected = false;
        self.alpha_depth = 0;
        if reset_all {
            self.palette.clear();
            self.transparency = None;
            self.color = globals.color.clone();
            self.background = globals.background;
        }
    }
}

// ============================================================================
// Shared handle
// ============================================================================

/// Reference-counted, copy-on-write handle to [`ImageData`].
#[derive(Clone, Debug)]
pub struct ImageRef(Rc<ImageData>);

impl ImageRef {
    pub fn new(data: ImageData) -> Self {
        Self(Rc::new(data))
    }

    /// Another handle to the same buffer.
    #[inline]
    pub fn share(&self) -> Self {
        Self(Rc::clone(&self.0))
    }

    /// Number of handles to this buffer.
    #[inline]
    pub fn refcount(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    #[inline]
    pub fn ptr_eq(&self, other: &ImageRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    #[inline]
    pub fn is_shared(&self) -> bool {
        self.refcount() > 1
    }

    /// Mutable access; a shared buffer is deep-copied first.
    pub fn make_mut(&mut self) -> &mut ImageData {
        if Rc::get_mut(&mut self.0).is_none() {
            let copy = self.0.deep_clone(self.0.concrete);
            self.0 = Rc::new(copy);
        }
        Rc::make_mut(&mut self.0)
    }

    /// Mark the buffer frozen.
    ///
    /// A shared buffer is detached first; callers holding the other handles
    /// swap them for [`share`](Self::share) of this one to keep sharing.
    pub fn freeze(&mut self) {
        if self.0.frozen {
            return;
        }
        match Rc::get_mut(&mut self.0) {
            Some(data) => data.frozen = true,
            None => {
                let mut copy = (*self.0).clone();
                copy.frozen = true;
                self.0 = Rc::new(copy);
            }
        }
    }

    /// Replace the buffer behind this handle only.
    pub fn replace(&mut self, data: ImageData) {
        self.0 = Rc::new(data);
    }
}

impl Deref for ImageRef {
    type Target = ImageData;

    fn deref(&self) -> &ImageData {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(width: u32, height: u32) -> ImageData {
        ImageData::new(ImageHeader::new(width, height, 8, ColorType::Gray), true, true, &GlobalDefaults::default())
    }

    #[test]
    fn test_sizes() {
        let data = ImageData::new(
            ImageHeader::new(3, 2, 16, ColorType::Rgba),
            false,
            true,
            &GlobalDefaults::default(),
        );
        assert_eq!(data.sample_size(), 8);
        assert_eq!(data.row_size(), 24);
        assert_eq!(data.pixels.len(), 48);

        let one = ImageData::new(ImageHeader::new(5, 1, 1, ColorType::Gray), false, true, &GlobalDefaults::default());
        assert_eq!(one.sample_size(), 1);
        assert_eq!(one.pixels.len(), 5);
    }

    #[test]
    fn test_globals_inherited() {
        let globals = GlobalDefaults {
            color: ColorInfo { gamma: Some(45455), ..Default::default() },
            background: Some(Rgb16 { r: 1, g: 2, b: 3 }),
        };
        let data = ImageData::new(ImageHeader::new(1, 1, 8, ColorType::Rgb), true, true, &globals);
        assert_eq!(data.color.gamma, Some(45455));
        assert_eq!(data.background, Some(Rgb16 { r: 1, g: 2, b: 3 }));
    }

    #[test]
    fn test_reset_details() {
        let mut data = gray(2, 2);
        data.pixels.fill(7);
        data.palette.push(Rgb8::new(1, 2, 3));
        data.corrected = true;

        data.reset_details(ImageHeader::new(2, 2, 8, ColorType::Gray), false, &GlobalDefaults::default());
        assert_eq!(data.pixels, vec![0; 4]);
        assert!(!data.corrected);
        assert!(data.has_palette());

        data.reset_details(ImageHeader::new(4, 1, 8, ColorType::Rgb), true, &GlobalDefaults::default());
        assert_eq!(data.pixels.len(), 12);
        assert!(!data.has_palette());
    }

    #[test]
    fn test_copy_on_write() {
        let mut a = ImageRef::new(gray(1, 1));
        let b = a.share();
        assert_eq!(a.refcount(), 2);
        assert!(a.ptr_eq(&b));

        a.make_mut().pixels[0] = 9;
        assert!(!a.ptr_eq(&b));
        assert_eq!(a.refcount(), 1);
        assert_eq!(b.refcount(), 1);
        assert_eq!(b.pixels[0], 0);
        assert_eq!(a.pixels[0], 9);
    }

    #[test]
    fn test_deep_clone_unfreezes() {
        let mut data = gray(1, 1);
        data.frozen = true;
        let copy = data.deep_clone(false);
        assert!(!copy.frozen);
        assert!(!copy.concrete);
        assert_eq!(copy.pixels, data.pixels);
    }
}
