//! PNG / JPEG Encoder Adapter

use crate::types::{PixelFormat, RasterImage, TargetFormat, MAX_JPEG_QUALITY, MIN_JPEG_QUALITY};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use shared_utils::{ConvertError, Result};

fn color_type(format: PixelFormat) -> ExtendedColorType {
    match format {
        PixelFormat::Gray => ExtendedColorType::L8,
        PixelFormat::GrayAlpha => ExtendedColorType::La8,
        PixelFormat::Rgb => ExtendedColorType::Rgb8,
        PixelFormat::Rgba => ExtendedColorType::Rgba8,
    }
}

/// Encode a normalized raster.
///
/// JPEG requires `quality` in 1..=100; anything else is a configuration
/// error, since the batch validates quality before any item runs.
pub fn encode(image: &RasterImage, format: TargetFormat, quality: Option<u8>) -> Result<Vec<u8>> {
    if image.width == 0 || image.height == 0 {
        return Err(ConvertError::Encode(format!(
            "cannot encode empty image {}x{}",
            image.width, image.height
        )));
    }
    if !image.is_consistent() {
        return Err(ConvertError::Encode(format!(
            "pixel buffer holds {} bytes but {}x{} {:?} needs {}",
            image.pixels.len(),
            image.width,
            image.height,
            image.pixel_format,
            image
                .expected_len()
                .map(|n| n.to_string())
                .unwrap_or_else(|| "more than addressable memory".to_string())
        )));
    }

    let mut out = Vec::new();
    let color = color_type(image.pixel_format);

    match format {
        TargetFormat::Png => PngEncoder::new(&mut out)
            .write_image(&image.pixels, image.width, image.height, color)
            .map_err(|e| ConvertError::Encode(format!("PNG: {}", e)))?,
        TargetFormat::Jpeg => {
            let quality = quality
                .filter(|q| (MIN_JPEG_QUALITY..=MAX_JPEG_QUALITY).contains(&(*q as u32)))
                .ok_or_else(|| {
                    ConvertError::Config(format!(
                        "JPEG quality must be in {}..={}, got {:?}",
                        MIN_JPEG_QUALITY, MAX_JPEG_QUALITY, quality
                    ))
                })?;
            JpegEncoder::new_with_quality(&mut out, quality)
                .write_image(&image.pixels, image.width, image.height, color)
                .map_err(|e| ConvertError::Encode(format!("JPEG: {}", e)))?
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color_model::normalize;

    fn gradient(format: PixelFormat, width: u32, height: u32) -> RasterImage {
        let channels = format.channels();
        let mut pixels = Vec::with_capacity((width * height) as usize * channels);
        for y in 0..height {
            for x in 0..width {
                for c in 0..channels {
                    let v = if format.has_alpha() && c == channels - 1 {
                        255
                    } else {
                        (x * 4 + y * 2 + c as u32 * 20) as u8
                    };
                    pixels.push(v);
                }
            }
        }
        RasterImage::new(format, width, height, pixels)
    }

    #[test]
    fn test_png_is_lossless() {
        let src = gradient(PixelFormat::Rgb, 24, 16);
        let png = encode(&src, TargetFormat::Png, None).unwrap();
        assert_eq!(&png[1..4], b"PNG");

        let back = image::load_from_memory(&png).unwrap().to_rgb8();
        assert_eq!(back.dimensions(), (24, 16));
        assert_eq!(back.into_raw(), src.pixels);
    }

    #[test]
    fn test_png_keeps_alpha() {
        let mut src = gradient(PixelFormat::Rgba, 4, 4);
        src.pixels[3] = 0;
        let png = encode(&src, TargetFormat::Png, None).unwrap();
        let back = image::load_from_memory(&png).unwrap();
        assert!(back.color().has_alpha());
        assert_eq!(back.to_rgba8().into_raw(), src.pixels);
    }

    #[test]
    fn test_jpeg_quality_100_within_tolerance() {
        let src = gradient(PixelFormat::Rgb, 32, 32);
        let jpeg = encode(&src, TargetFormat::Jpeg, Some(100)).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);

        let back = image::load_from_memory(&jpeg).unwrap().to_rgb8();
        assert_eq!(back.dimensions(), (32, 32));
        let max_diff = back
            .into_raw()
            .iter()
            .zip(&src.pixels)
            .map(|(a, b)| (*a as i16 - *b as i16).unsigned_abs())
            .max()
            .unwrap();
        assert!(max_diff <= 12, "max channel difference {}", max_diff);
    }

    #[test]
    fn test_jpeg_lower_quality_is_smaller() {
        let src = gradient(PixelFormat::Rgb, 64, 64);
        let high = encode(&src, TargetFormat::Jpeg, Some(100)).unwrap();
        let low = encode(&src, TargetFormat::Jpeg, Some(10)).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn test_jpeg_from_normalized_rgba() {
        let src = normalize(gradient(PixelFormat::Rgba, 8, 8), TargetFormat::Jpeg);
        assert!(encode(&src, TargetFormat::Jpeg, Some(90)).is_ok());
    }

    #[test]
    fn test_jpeg_grayscale() {
        let src = gradient(PixelFormat::Gray, 8, 8);
        let jpeg = encode(&src, TargetFormat::Jpeg, Some(90)).unwrap();
        let back = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(back.color(), image::ColorType::L8);
    }

    #[test]
    fn test_mismatched_buffer_is_encode_error() {
        let src = RasterImage::new(PixelFormat::Rgb, 4, 4, vec![0; 10]);
        let err = encode(&src, TargetFormat::Png, None).unwrap_err();
        assert!(matches!(err, ConvertError::Encode(_)));
    }

    #[test]
    fn test_jpeg_quality_contract() {
        let src = gradient(PixelFormat::Rgb, 4, 4);
        for quality in [None, Some(0), Some(101)] {
            let err = encode(&src, TargetFormat::Jpeg, quality).unwrap_err();
            assert!(matches!(err, ConvertError::Config(_)), "{:?}", quality);
        }
    }
}
