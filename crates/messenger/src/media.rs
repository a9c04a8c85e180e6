//! Bitmap encoding for image uploads.

use std::io::Cursor;

use image::{DynamicImage, codecs::jpeg::JpegEncoder};

use crate::Result;

/// JPEG quality for encoded images (0-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Encode a bitmap as JPEG. Alpha is dropped since JPEG has no alpha channel.
pub fn encode_jpeg(img: &DynamicImage) -> Result<Vec<u8>> {
    encode_jpeg_with_quality(img, DEFAULT_JPEG_QUALITY)
}

pub fn encode_jpeg_with_quality(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut output = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut output, quality);
    rgb.write_with_encoder(encoder)?;
    Ok(output.into_inner())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, image::RgbaImage};

    #[test]
    fn encodes_rgba_as_jpeg() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            4,
            4,
            image::Rgba([255, 0, 0, 128]),
        ));
        let data = encode_jpeg(&img).unwrap();
        assert_eq!(&data[..3], &[0xFF, 0xD8, 0xFF]);
        assert_eq!(crate::sniff::sniff_content_type(&data), "image/jpeg");
    }
}
