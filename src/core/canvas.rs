//! In-memory RGBA8 canvas.

use super::collab::Canvas;

/// Heap-backed RGBA8 canvas.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RgbaCanvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RgbaCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, pixels: vec![0; width as usize * height as usize * 4] }
    }

    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([self.pixels[i], self.pixels[i + 1], self.pixels[i + 2], self.pixels[i + 3]])
    }

    /// Fill every pixel with `rgba`.
    pub fn fill(&mut self, rgba: [u8; 4]) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }

    /// CRC-32 of the pixel bytes, for comparing renders.
    pub fn checksum(&self) -> u32 {
        crc32fast::hash(&self.pixels)
    }
}

impl Canvas for RgbaCanvas {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.resize(width as usize * height as usize * 4, 0);
    }

    fn row(&self, y: u32) -> &[u8] {
        let stride = self.width as usize * 4;
        let start = y as usize * stride;
        &self.pixels[start..start + stride]
    }

    fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let stride = self.width as usize * 4;
        let start = y as usize * stride;
        &mut self.pixels[start..start + stride]
    }
}

/// Blend `src` over `dst` (both RGBA8, straight alpha).
#[inline]
pub fn blend_over(dst: &mut [u8], src: [u8; 4]) {
    let sa = src[3] as u32;
    match sa {
        0 => {}
        255 => dst[..4].copy_from_slice(&src),
        _ => {
            let da = dst[3] as u32;
            // Result alpha in 0..=255*255 then normalized.
            let out_a = sa * 255 + da * (255 - sa);
            if out_a == 0 {
                return;
            }
            for c in 0..3 {
                let s = src[c] as u32 * sa * 255;
                let d = dst[c] as u32 * da * (255 - sa);
                dst[c] = ((s + d + out_a / 2) / out_a) as u8;
            }
            dst[3] = ((out_a + 127) / 255) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canvas_rows() {
        let mut canvas = RgbaCanvas::new(2, 2);
        canvas.row_mut(1)[4..8].copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(canvas.pixel(1, 1), Some([1, 2, 3, 4]));
        assert_eq!(canvas.pixel(2, 0), None);
        assert_eq!(canvas.row(0), &[0; 8]);

        canvas.fill([9, 9, 9, 255]);
        assert_eq!(canvas.pixel(0, 0), Some([9, 9, 9, 255]));

        canvas.resize(3, 1);
        assert_eq!(canvas.pixels().len(), 12);
    }

    #[test]
    fn test_checksum_changes() {
        let mut canvas = RgbaCanvas::new(4, 4);
        let before = canvas.checksum();
        canvas.fill([1, 0, 0, 0]);
        assert_ne!(before, canvas.checksum());
    }

    #[test]
    fn test_blend_over() {
        let mut dst = [0, 0, 0, 255];
        blend_over(&mut dst, [255, 255, 255, 255]);
        assert_eq!(dst, [255, 255, 255, 255]);

        let mut dst = [10, 20, 30, 255];
        blend_over(&mut dst, [255, 0, 0, 0]);
        assert_eq!(dst, [10, 20, 30, 255]);

        let mut dst = [0, 0, 0, 255];
        blend_over(&mut dst, [255, 255, 255, 128]);
        assert_eq!(dst[3], 255);
        assert!((127..=129).contains(&dst[0]));
    }
}
