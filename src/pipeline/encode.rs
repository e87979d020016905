//! PNG encoding of page rasters.
//!
//! Thumbnails and export rasters are both kept PNG-encoded: lossless, so
//! text stays crisp through filtering, and several times smaller than the raw
//! RGBA buffer of a 4× render.

use image::{ImageFormat, RgbaImage};
use std::io::Cursor;
use tracing::debug;

/// Encode a raster as PNG bytes.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    debug!(
        "Encoded {}x{} raster → {} bytes PNG",
        img.width(),
        img.height(),
        buf.len()
    );
    Ok(buf)
}

/// Decode PNG bytes back into an RGBA pixel buffer.
pub fn decode_png(bytes: &[u8]) -> Result<RgbaImage, image::ImageError> {
    Ok(image::load_from_memory_with_format(bytes, ImageFormat::Png)?.into_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn encode_small_image() {
        let img = RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255]));
        let data = encode_png(&img).expect("encode should succeed");
        assert!(data.starts_with(b"\x89PNG"));

        let back = decode_png(&data).expect("decode should succeed");
        assert_eq!(back.dimensions(), (10, 10));
        assert_eq!(back.get_pixel(4, 4).0, [255, 0, 0, 255]);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_png(b"not a png").is_err());
    }
}
