//! Drawing objects onto the canvas.

use crate::core::{blend_over, Canvas, ColorManager};
use crate::object::{to_rgba8, ImageObject};
use crate::util::{Point, Rect, Result};

/// Fill `area` of the canvas with `rgba`.
pub fn fill(canvas: &mut dyn Canvas, area: Rect, rgba: [u8; 4]) {
    let area = area.intersect(&canvas_rect(canvas));
    for y in area.top..area.bottom {
        let row = canvas.row_mut(y as u32);
        for x in area.left..area.right {
            let at = x as usize * 4;
            row[at..at + 4].copy_from_slice(&rgba);
        }
    }
}

#[inline]
fn canvas_rect(canvas: &dyn Canvas) -> Rect {
    Rect::from_size(Point::default(), canvas.width(), canvas.height())
}

/// Display pixels of `obj`, color corrected when a manager is given.
fn display_pixels(obj: &ImageObject, cms: Option<&dyn ColorManager>) -> Result<Vec<u8>> {
    let mut pixels = to_rgba8(&obj.data);
    if let Some(cms) = cms {
        if !obj.data.corrected {
            if let Some(transform) = cms.transform(&obj.data.color, false)? {
                transform.apply(&mut pixels, false);
            }
        }
    }
    Ok(pixels)
}

/// Blend `obj` over the canvas inside `clip`, honoring its own position and
/// clip. Returns the area touched.
pub fn draw_object(canvas: &mut dyn Canvas, obj: &ImageObject, clip: Rect, cms: Option<&dyn ColorManager>) -> Result<Rect> {
    let area = obj.bounds().intersect(&clip).intersect(&canvas_rect(canvas));
    if area.is_empty() {
        return Ok(area);
    }
    let pixels = display_pixels(obj, cms)?;
    let width = obj.data.width() as usize;
    for y in area.top..area.bottom {
        let sy = (y - obj.position.y) as usize;
        let row = canvas.row_mut(y as u32);
        for x in area.left..area.right {
            let sx = (x - obj.position.x) as usize;
            let at = (sy * width + sx) * 4;
            let px = [pixels[at], pixels[at + 1], pixels[at + 2], pixels[at + 3]];
            blend_over(&mut row[x as usize * 4..], px);
        }
    }
    Ok(area)
}

/// Repeat `obj` over `clip`, starting at its position.
pub fn tile_object(canvas: &mut dyn Canvas, obj: &ImageObject, clip: Rect, cms: Option<&dyn ColorManager>) -> Result<Rect> {
    let area = clip.intersect(&canvas_rect(canvas));
    let (w, h) = (obj.data.width() as i64, obj.data.height() as i64);
    if area.is_empty() || w == 0 || h == 0 {
        return Ok(Rect::default());
    }
    let pixels = display_pixels(obj, cms)?;
    for y in area.top..area.bottom {
        let sy = (y as i64 - obj.position.y as i64).rem_euclid(h) as usize;
        let row = canvas.row_mut(y as u32);
        for x in area.left..area.right {
            let sx = (x as i64 - obj.position.x as i64).rem_euclid(w) as usize;
            let at = (sy * w as usize + sx) * 4;
            let px = [pixels[at], pixels[at + 1], pixels[at + 2], pixels[at + 3]];
            blend_over(&mut row[x as usize * 4..], px);
        }
    }
    Ok(area)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RgbaCanvas;
    use crate::object::{GlobalDefaults, ImageData, ImageHeader};
    use crate::util::ColorType;

    fn object(w: u32, h: u32, gray: &[u8]) -> ImageObject {
        let mut data = ImageData::new(ImageHeader::new(w, h, 8, ColorType::Gray), false, true, &GlobalDefaults::default());
        data.pixels = gray.to_vec();
        ImageObject::new(1, data)
    }

    #[test]
    fn test_fill_clipped() {
        let mut canvas = RgbaCanvas::new(3, 1);
        fill(&mut canvas, Rect::new(1, 10, -1, 1), [1, 2, 3, 4]);
        assert_eq!(canvas.pixel(0, 0), Some([0; 4]));
        assert_eq!(canvas.pixel(2, 0), Some([1, 2, 3, 4]));
    }

    #[test]
    fn test_draw_at_position() {
        let mut canvas = RgbaCanvas::new(3, 2);
        let mut obj = object(2, 1, &[10, 20]);
        obj.position = Point::new(2, 1);
        let area = draw_object(&mut canvas, &obj, Rect::unbounded(), None).unwrap();
        assert_eq!(area, Rect::new(2, 3, 1, 2));
        assert_eq!(canvas.pixel(2, 1), Some([10, 10, 10, 255]));
        assert_eq!(canvas.pixel(1, 1), Some([0; 4]));
    }

    #[test]
    fn test_object_clip() {
        let mut canvas = RgbaCanvas::new(2, 1);
        let mut obj = object(2, 1, &[10, 20]);
        obj.clipped = true;
        obj.clip = Rect::new(1, 2, 0, 1);
        draw_object(&mut canvas, &obj, Rect::unbounded(), None).unwrap();
        assert_eq!(canvas.pixel(0, 0), Some([0; 4]));
        assert_eq!(canvas.pixel(1, 0), Some([20, 20, 20, 255]));
    }

    #[test]
    fn test_tile() {
        let mut canvas = RgbaCanvas::new(3, 1);
        let obj = object(2, 1, &[10, 20]);
        tile_object(&mut canvas, &obj, Rect::unbounded(), None).unwrap();
        assert_eq!(canvas.pixel(2, 0), Some([10, 10, 10, 255]));
    }
}
