//! Core data types for one conversion batch

use serde::{Deserialize, Serialize};
use shared_utils::{ConvertError, Result};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_JPEG_QUALITY: u8 = 95;
pub const MIN_JPEG_QUALITY: u32 = 1;
pub const MAX_JPEG_QUALITY: u32 = 100;

/// One uploaded file: its base name (no extension) and raw container bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputItem {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl InputItem {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Build an item from an uploaded file name, dropping its extension.
    ///
    /// `IMG_0001.HEIC` becomes `IMG_0001`; `holiday.2024.heic` keeps
    /// `holiday.2024`; a leading-dot name such as `.heic` is kept whole.
    pub fn from_file_name(file_name: &str, bytes: Vec<u8>) -> Self {
        let stem = Path::new(file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| file_name.to_string());
        Self::new(stem, bytes)
    }

    /// Read a file from disk; read failures surface as [`ConvertError::Io`].
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Self::from_file_name(&file_name, bytes))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TargetFormat {
    Png,
    Jpeg,
}

impl TargetFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetFormat::Png => "PNG",
            TargetFormat::Jpeg => "JPEG",
        }
    }

    /// File extension (without dot) used for converted outputs.
    pub fn extension(&self) -> &'static str {
        match self {
            TargetFormat::Png => "png",
            TargetFormat::Jpeg => "jpg",
        }
    }

    pub fn supports_alpha(&self) -> bool {
        matches!(self, TargetFormat::Png)
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "png" => Ok(TargetFormat::Png),
            "jpeg" | "jpg" => Ok(TargetFormat::Jpeg),
            other => Err(ConvertError::Config(format!(
                "Unknown target format '{}', expected PNG or JPEG",
                other
            ))),
        }
    }
}

/// Target format plus its encode options.
///
/// `quality` only means something for JPEG. Use [`ConversionConfig::validated`]
/// before a batch to get the canonical form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionConfig {
    pub format: TargetFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u32>,
}

impl ConversionConfig {
    pub fn png() -> Self {
        Self {
            format: TargetFormat::Png,
            quality: None,
        }
    }

    pub fn jpeg(quality: u32) -> Self {
        Self {
            format: TargetFormat::Jpeg,
            quality: Some(quality),
        }
    }

    pub fn new(format: TargetFormat, quality: Option<u32>) -> Self {
        Self { format, quality }
    }

    /// Check the configuration once per batch and return its canonical form.
    ///
    /// PNG drops any quality, JPEG without a quality gets the default, and a
    /// JPEG quality outside 1..=100 is a configuration error.
    pub fn validated(&self) -> Result<Self> {
        match self.format {
            TargetFormat::Png => Ok(Self::png()),
            TargetFormat::Jpeg => {
                let quality = self.quality.unwrap_or(DEFAULT_JPEG_QUALITY as u32);
                if !(MIN_JPEG_QUALITY..=MAX_JPEG_QUALITY).contains(&quality) {
                    return Err(ConvertError::Config(format!(
                        "JPEG quality must be in {}..={}, got {}",
                        MIN_JPEG_QUALITY, MAX_JPEG_QUALITY, quality
                    )));
                }
                Ok(Self::jpeg(quality))
            }
        }
    }

    /// Quality to hand the JPEG encoder, if this is a valid JPEG config.
    pub fn jpeg_quality(&self) -> Option<u8> {
        match self.format {
            TargetFormat::Jpeg => self
                .quality
                .filter(|q| (MIN_JPEG_QUALITY..=MAX_JPEG_QUALITY).contains(q))
                .map(|q| q as u8),
            TargetFormat::Png => None,
        }
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self::png()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    Gray,
    GrayAlpha,
    Rgb,
    Rgba,
}

impl PixelFormat {
    pub fn channels(&self) -> usize {
        match self {
            PixelFormat::Gray => 1,
            PixelFormat::GrayAlpha => 2,
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }

    pub fn has_alpha(&self) -> bool {
        matches!(self, PixelFormat::GrayAlpha | PixelFormat::Rgba)
    }

    pub fn without_alpha(&self) -> PixelFormat {
        match self {
            PixelFormat::GrayAlpha => PixelFormat::Gray,
            PixelFormat::Rgba => PixelFormat::Rgb,
            other => *other,
        }
    }
}

/// Decoded 8-bit interleaved bitmap.
///
/// Fields are plain data; encoders check [`RasterImage::is_consistent`]
/// before trusting `pixels`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub pixel_format: PixelFormat,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RasterImage {
    pub fn new(pixel_format: PixelFormat, width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            pixel_format,
            width,
            height,
            pixels,
        }
    }

    /// `width * height * channels`, or `None` on overflow.
    pub fn expected_len(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(self.pixel_format.channels())
    }

    pub fn is_consistent(&self) -> bool {
        self.expected_len() == Some(self.pixels.len())
    }
}

/// Outcome of converting one [`InputItem`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionResult {
    Success { output_name: String, bytes: Vec<u8> },
    Failure { input_name: String, reason: String },
}

impl ConversionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ConversionResult::Success { .. })
    }

    pub fn name(&self) -> &str {
        match self {
            ConversionResult::Success { output_name, .. } => output_name,
            ConversionResult::Failure { input_name, .. } => input_name,
        }
    }
}
