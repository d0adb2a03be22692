//! Conversion Pipeline
//!
//! decode -> normalize -> encode for a single item. Every failure, including
//! a panic inside a codec, is folded into [`ConversionResult::Failure`] so
//! one bad file never takes the batch down with it. A panic is attributed to
//! the stage it escaped from.

use crate::color_model::normalize;
use crate::encoder::encode;
use crate::heic_decoder::{DecodeLimits, HeicDecoder, LibHeifDecoder};
use crate::output_names::output_file_name;
use crate::types::{ConversionConfig, ConversionResult, InputItem};
use shared_utils::{ConvertError, Result};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;
use tracing::{debug, error, warn};

pub struct ConversionPipeline<D: HeicDecoder = LibHeifDecoder> {
    decoder: D,
    config: ConversionConfig,
    limits: DecodeLimits,
}

impl ConversionPipeline<LibHeifDecoder> {
    /// Pipeline over libheif. Fails with a configuration error when `config` is invalid.
    pub fn new(config: &ConversionConfig) -> Result<Self> {
        Self::with_decoder(LibHeifDecoder, config)
    }
}

impl<D: HeicDecoder> ConversionPipeline<D> {
    pub fn with_decoder(decoder: D, config: &ConversionConfig) -> Result<Self> {
        Ok(Self {
            decoder,
            config: config.validated()?,
            limits: DecodeLimits::default(),
        })
    }

    pub fn with_limits(mut self, limits: DecodeLimits) -> Self {
        self.limits = limits;
        self
    }

    /// The validated configuration this pipeline encodes with.
    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    pub fn limits(&self) -> &DecodeLimits {
        &self.limits
    }

    /// Run all three stages, propagating the first error.
    pub fn try_convert(&self, item: &InputItem) -> Result<Vec<u8>> {
        let format = self.config.format;

        let start = Instant::now();
        let raster = guard_stage(ConvertError::Decode, "decoder", || {
            self.decoder.decode(&item.bytes, &self.limits)
        })?;
        debug!(
            item = %item.name,
            width = raster.width,
            height = raster.height,
            pixel_format = ?raster.pixel_format,
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "decoded"
        );

        let start = Instant::now();
        let quality = self.config.jpeg_quality();
        let bytes = guard_stage(ConvertError::Encode, "encoder", move || {
            encode(&normalize(raster, format), format, quality)
        })?;
        debug!(
            item = %item.name,
            format = %format,
            output_bytes = bytes.len(),
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "encoded"
        );

        Ok(bytes)
    }

    /// Convert one item; never fails, never panics past this point.
    pub fn convert_one(&self, item: &InputItem) -> ConversionResult {
        match self.try_convert(item) {
            Ok(bytes) => ConversionResult::Success {
                output_name: output_file_name(&item.name, self.config.format),
                bytes,
            },
            Err(e) => {
                if e.is_item_level() {
                    warn!(item = %item.name, kind = e.kind(), error = %e, "conversion failed");
                } else {
                    error!(item = %item.name, kind = e.kind(), error = %e, "conversion failed");
                }
                ConversionResult::Failure {
                    input_name: item.name.clone(),
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// Convert one item with the libheif decoder.
///
/// An invalid `config` is reported as a failure for this item; batch
/// callers should validate once up front instead.
pub fn convert_one(item: &InputItem, config: &ConversionConfig) -> ConversionResult {
    match ConversionPipeline::new(config) {
        Ok(pipeline) => pipeline.convert_one(item),
        Err(e) => ConversionResult::Failure {
            input_name: item.name.clone(),
            reason: e.to_string(),
        },
    }
}

/// Run one codec stage, turning a panic into that stage's error variant.
fn guard_stage<T, F>(stage_error: fn(String) -> ConvertError, stage: &str, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|panic| {
        Err(stage_error(format!(
            "{} panicked: {}",
            stage,
            panic_message(panic.as_ref())
        )))
    })
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
