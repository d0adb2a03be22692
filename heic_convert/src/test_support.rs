//! Deterministic stand-in decoder for pipeline and batch tests, plus the
//! real HEIC fixtures under `tests/fixtures`.
//!
//! Container layout: `b"RAST"`, width (u8), height (u8), alpha flag (u8),
//! then `width * height * channels` pixel bytes.

use crate::heic_decoder::{DecodeLimits, HeicDecoder};
use crate::types::{InputItem, PixelFormat, RasterImage};
use shared_utils::{ConvertError, Result};

pub struct FakeDecoder;

impl HeicDecoder for FakeDecoder {
    fn decode(&self, data: &[u8], limits: &DecodeLimits) -> Result<RasterImage> {
        limits.check_input(data.len())?;
        if data.len() < 7 || &data[..4] != b"RAST" {
            return Err(ConvertError::Decode("not a test raster".to_string()));
        }
        let (width, height) = (data[4] as u32, data[5] as u32);
        let format = if data[6] == 1 {
            PixelFormat::Rgba
        } else {
            PixelFormat::Rgb
        };
        let len = limits.check_dimensions(width, height, format.channels())?;
        let pixels = data[7..].to_vec();
        if pixels.len() != len {
            return Err(ConvertError::Decode(format!(
                "truncated: {} of {} pixel bytes",
                pixels.len(),
                len
            )));
        }
        Ok(RasterImage::new(format, width, height, pixels))
    }
}

pub fn fake_container(width: u8, height: u8, alpha: bool, seed: u8) -> Vec<u8> {
    let channels = if alpha { 4 } else { 3 };
    let mut out = b"RAST".to_vec();
    out.extend_from_slice(&[width, height, alpha as u8]);
    let len = width as usize * height as usize * channels;
    out.extend((0..len).map(|i| (i as u8).wrapping_mul(7).wrapping_add(seed)));
    out
}

pub fn good_item(name: &str) -> InputItem {
    InputItem::new(name, fake_container(4, 3, false, name.len() as u8))
}

pub fn garbage_item(name: &str) -> InputItem {
    InputItem::new(name, b"this is not an image".to_vec())
}

/// 16x12 opaque HEVC-coded HEIC. Source pixel (x, y) is `(40 + 6x, 60 + 6y, 120)`.
pub const OPAQUE_HEIC: &[u8] = include_bytes!("../tests/fixtures/opaque_16x12.heic");

/// 16x12 HEIC with an alpha plane: left half opaque, right half transparent,
/// colours as in [`OPAQUE_HEIC`].
pub const ALPHA_HEIC: &[u8] = include_bytes!("../tests/fixtures/alpha_16x12.heic");

pub fn heic_item(name: &str, bytes: &[u8]) -> InputItem {
    InputItem::new(name, bytes.to_vec())
}

/// Largest per-byte difference between two equally sized buffers.
pub fn max_abs_diff(a: &[u8], b: &[u8]) -> u8 {
    assert_eq!(a.len(), b.len(), "buffer lengths differ");
    a.iter().zip(b).map(|(x, y)| x.abs_diff(*y)).max().unwrap_or(0)
}
