//! HEIC Decoder Adapter
//!
//! Uses libheif-rs to turn HEIC/HEIF container bytes into an 8-bit
//! interleaved [`RasterImage`]. Size guards run before libheif allocates
//! the pixel planes.

use crate::types::{PixelFormat, RasterImage};
use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};
use shared_utils::{ConvertError, Result};
use tracing::debug;

/// Upper bounds applied to every input before and during decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Largest accepted container, in bytes
    pub max_input_bytes: usize,
    /// Largest accepted `width * height`
    pub max_pixels: u64,
    /// Largest accepted width or height
    pub max_dimension: u32,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_input_bytes: 512 * 1024 * 1024,
            // 200 MP comfortably covers 48 MP phone captures and panoramas
            max_pixels: 200_000_000,
            max_dimension: 65_535,
        }
    }
}

impl DecodeLimits {
    pub fn with_max_input_bytes(mut self, bytes: usize) -> Self {
        self.max_input_bytes = bytes;
        self
    }

    pub fn with_max_pixels(mut self, pixels: u64) -> Self {
        self.max_pixels = pixels;
        self
    }

    pub fn with_max_dimension(mut self, dimension: u32) -> Self {
        self.max_dimension = dimension;
        self
    }

    pub fn check_input(&self, len: usize) -> Result<()> {
        if len == 0 {
            return Err(ConvertError::Decode("input is empty".to_string()));
        }
        if len > self.max_input_bytes {
            return Err(ConvertError::Decode(format!(
                "input is {} bytes, limit is {}",
                len, self.max_input_bytes
            )));
        }
        Ok(())
    }

    /// Validate declared dimensions and return the pixel buffer length they need.
    pub fn check_dimensions(&self, width: u32, height: u32, channels: usize) -> Result<usize> {
        if width == 0 || height == 0 {
            return Err(ConvertError::Decode(format!(
                "invalid image dimensions {}x{}",
                width, height
            )));
        }
        if width > self.max_dimension || height > self.max_dimension {
            return Err(ConvertError::Decode(format!(
                "image dimensions {}x{} exceed maximum {}",
                width, height, self.max_dimension
            )));
        }
        let pixels = width as u64 * height as u64;
        if pixels > self.max_pixels {
            return Err(ConvertError::Decode(format!(
                "image has {} pixels, limit is {}",
                pixels, self.max_pixels
            )));
        }
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(channels))
            .ok_or_else(|| {
                ConvertError::Decode(format!(
                    "image buffer {}x{}x{} overflows addressable memory",
                    width, height, channels
                ))
            })
    }
}

/// Anything that can turn container bytes into a raster.
pub trait HeicDecoder: Send + Sync {
    fn decode(&self, data: &[u8], limits: &DecodeLimits) -> Result<RasterImage>;
}

/// Decoder backed by the system libheif.
#[derive(Debug, Clone, Copy, Default)]
pub struct LibHeifDecoder;

impl HeicDecoder for LibHeifDecoder {
    fn decode(&self, data: &[u8], limits: &DecodeLimits) -> Result<RasterImage> {
        limits.check_input(data.len())?;
        if !is_heif_container(data) {
            return Err(ConvertError::Decode(
                "not a HEIF container (missing ftyp box with a HEIF brand)".to_string(),
            ));
        }

        let ctx = HeifContext::read_from_bytes(data).map_err(|e| {
            let error_msg = format!("{}", e);
            if error_msg.contains("SecurityLimitExceeded") {
                ConvertError::Decode(format!("HEIC security limit exceeded: {}", e))
            } else {
                ConvertError::Decode(format!("failed to read container: {}", e))
            }
        })?;

        let handle = ctx
            .primary_image_handle()
            .map_err(|e| ConvertError::Decode(format!("failed to get primary image: {}", e)))?;

        let width = handle.width();
        let height = handle.height();
        let (pixel_format, chroma) = if handle.has_alpha_channel() {
            (PixelFormat::Rgba, RgbChroma::Rgba)
        } else {
            (PixelFormat::Rgb, RgbChroma::Rgb)
        };
        limits.check_dimensions(width, height, pixel_format.channels())?;

        debug!(
            width,
            height,
            bit_depth = handle.luma_bits_per_pixel(),
            ?pixel_format,
            "Decoding HEIC primary image"
        );

        let lib_heif = LibHeif::new();
        let decoded = lib_heif
            .decode(&handle, ColorSpace::Rgb(chroma), None)
            .map_err(|e| ConvertError::Decode(format!("failed to decode image: {}", e)))?;

        let planes = decoded.planes();
        let plane = planes
            .interleaved
            .ok_or_else(|| ConvertError::Decode("no interleaved RGB plane found".to_string()))?;

        let pixels = pack_rows(
            plane.data,
            plane.stride,
            width,
            height,
            pixel_format.channels(),
        )?;

        Ok(RasterImage::new(pixel_format, width, height, pixels))
    }
}

/// Copy `height` rows of `width * channels` bytes out of a strided plane.
///
/// libheif pads rows for alignment, so the stride is usually wider than
/// the visible row.
pub(crate) fn pack_rows(
    data: &[u8],
    stride: usize,
    width: u32,
    height: u32,
    channels: usize,
) -> Result<Vec<u8>> {
    let row_len = (width as usize)
        .checked_mul(channels)
        .ok_or_else(|| ConvertError::Decode("row length overflow".to_string()))?;
    if stride < row_len {
        return Err(ConvertError::Decode(format!(
            "plane stride {} shorter than row length {}",
            stride, row_len
        )));
    }
    let rows = height as usize;
    let needed = match rows {
        0 => 0,
        n => stride
            .checked_mul(n - 1)
            .and_then(|v| v.checked_add(row_len))
            .ok_or_else(|| ConvertError::Decode("plane size overflow".to_string()))?,
    };
    if data.len() < needed {
        return Err(ConvertError::Decode(format!(
            "plane holds {} bytes, {} needed",
            data.len(),
            needed
        )));
    }

    if stride == row_len {
        return Ok(data[..needed].to_vec());
    }

    let mut pixels = Vec::with_capacity(row_len * rows);
    for row in 0..rows {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_len]);
    }
    Ok(pixels)
}

const HEIF_BRANDS: &[&[u8; 4]] = &[
    b"heic", b"heix", b"heim", b"heis", b"hevc", b"hevx", b"mif1", b"msf1",
];

/// Cheap check for an ISO-BMFF `ftyp` box naming a HEIF brand, major or compatible.
pub fn is_heif_container(data: &[u8]) -> bool {
    if data.len() < 12 || &data[4..8] != b"ftyp" {
        return false;
    }
    let box_len = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    // size 0: the box extends to the end of the file
    let end = match box_len {
        0 => data.len(),
        n => n.clamp(12, data.len()),
    };

    // major brand, then minor version, then compatible brands
    let is_heif = |brand: &[u8]| HEIF_BRANDS.iter().any(|b| &b[..] == brand);
    if is_heif(&data[8..12]) {
        return true;
    }
    data.get(16..end)
        .map(|rest| rest.chunks_exact(4).any(is_heif))
        .unwrap_or(false)
}
