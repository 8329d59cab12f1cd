//! JPEG codec backed by the `image` crate.

use image::{DynamicImage, ImageFormat};

use super::collab::{JpegCodec, JpegImage};
use crate::util::{ColorType, Error, Result};

/// Baseline JPEG through `image`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageJpeg;

impl JpegCodec for ImageJpeg {
    fn decode(&self, data: &[u8]) -> Result<JpegImage> {
        let img = image::load_from_memory_with_format(data, ImageFormat::Jpeg)
            .map_err(|e| Error::Jpeg(e.to_string()))?;
        let (width, height) = (img.width(), img.height());
        let (color_type, pixels) = match img {
            DynamicImage::ImageLuma8(buf) => (ColorType::JpegGray, buf.into_raw()),
            other => (ColorType::JpegColor, other.to_rgb8().into_raw()),
        };
        Ok(JpegImage { width, height, color_type, pixels })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_garbage() {
        let err = ImageJpeg.decode(b"\xFF\xD8not really a jpeg").unwrap_err();
        assert!(matches!(err, Error::Jpeg(_)));
    }
}
