/// Screenshot preparation for the vision API: device screenshots arrive as
/// full-resolution PNG and are downscaled and re-encoded as JPEG before upload.
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;

use crate::errors::{TapSightError, TapSightResult};

/// Maximum width sent to the vision API.
const MAX_WIDTH: u32 = 1080;
const JPEG_QUALITY: u8 = 85;

/// Decode `src_bytes` (PNG/JPEG), downscale to at most [`MAX_WIDTH`] wide,
/// re-encode as JPEG and return the base64 payload for the API request body.
pub fn encode_for_api(src_bytes: &[u8]) -> TapSightResult<String> {
    let img = image::load_from_memory(src_bytes)
        .map_err(|e| TapSightError::Perception(format!("screenshot decode: {e}")))?;

    let img = if img.width() > MAX_WIDTH {
        let ratio = MAX_WIDTH as f32 / img.width() as f32;
        let new_height = (img.height() as f32 * ratio) as u32;
        img.resize_exact(MAX_WIDTH, new_height, image::imageops::FilterType::Lanczos3)
    } else {
        img
    };

    // JPEG has no alpha channel.
    let rgb = img.to_rgb8();

    let mut jpeg_bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut jpeg_bytes, JPEG_QUALITY);
    rgb.write_with_encoder(encoder)
        .map_err(|e| TapSightError::Perception(format!("JPEG encode: {e}")))?;

    Ok(base64::engine::general_purpose::STANDARD.encode(&jpeg_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use image::{DynamicImage, RgbaImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            image::Rgba([120, 20, 200, 255]),
        ));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn decode_b64(encoded: &str) -> image::DynamicImage {
        let jpeg = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .unwrap();
        image::load_from_memory(&jpeg).unwrap()
    }

    #[test]
    fn wide_screenshot_is_downscaled() {
        let encoded = encode_for_api(&png_bytes(2160, 4800)).unwrap();
        let img = decode_b64(&encoded);
        assert_eq!(img.width(), 1080);
        assert_eq!(img.height(), 2400);
    }

    #[test]
    fn small_screenshot_keeps_dimensions() {
        let encoded = encode_for_api(&png_bytes(720, 1280)).unwrap();
        let img = decode_b64(&encoded);
        assert_eq!(img.width(), 720);
        assert_eq!(img.height(), 1280);
    }

    #[test]
    fn garbage_input_is_a_perception_error() {
        let err = encode_for_api(b"not an image").unwrap_err();
        assert!(matches!(err, TapSightError::Perception(_)));
    }
}
