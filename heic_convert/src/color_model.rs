//! Color-model normalization between the decoder and an encoder.
//!
//! JPEG has no alpha channel. Alpha is truncated rather than composited
//! onto a background colour, so transparent regions keep whatever colour
//! values the decoder produced for them.

use crate::types::{PixelFormat, RasterImage, TargetFormat};

/// Map `image` into a pixel format `target` can encode.
///
/// Returns the input untouched when no change is needed, so normalizing an
/// already-normalized image is a no-op.
pub fn normalize(image: RasterImage, target: TargetFormat) -> RasterImage {
    if target_pixel_format(image.pixel_format, target) == image.pixel_format {
        return image;
    }
    drop_alpha(&image)
}

/// Build a new raster without the trailing alpha channel.
pub fn drop_alpha(image: &RasterImage) -> RasterImage {
    let src_channels = image.pixel_format.channels();
    let dst_format = image.pixel_format.without_alpha();
    let dst_channels = dst_format.channels();

    let pixels: Vec<u8> = image
        .pixels
        .chunks_exact(src_channels)
        .flat_map(|px| px[..dst_channels].iter().copied())
        .collect();

    RasterImage::new(dst_format, image.width, image.height, pixels)
}

/// Pixel format `target` will receive for a source in `source`.
pub fn target_pixel_format(source: PixelFormat, target: TargetFormat) -> PixelFormat {
    if target.supports_alpha() {
        source
    } else {
        source.without_alpha()
    }
}
