//! Batch HEIC -> PNG/JPEG conversion with ZIP packaging.
//!
//! ```no_run
//! use heic_convert::{run_batch, BatchOptions, ConversionConfig, InputItem};
//!
//! let items = vec![InputItem::from_file_name("IMG_0001.HEIC", std::fs::read("IMG_0001.HEIC")?)];
//! let report = run_batch(&items, &ConversionConfig::jpeg(90), &BatchOptions::default(), |p| {
//!     println!("{}/{} {}", p.completed, p.total, p.name);
//! })?;
//! let archive = report.pack()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod archive;
pub mod batch;
pub mod color_model;
pub mod encoder;
pub mod heic_decoder;
pub mod output_names;
pub mod pipeline;
pub mod types;

#[cfg(test)]
mod test_support;

pub use archive::{archive_file_name, pack, pack_with, ArchiveCompression};
pub use batch::{
    run_batch, run_batch_with_decoder, BatchOptions, BatchReport, CancelToken, ItemFailure,
    NamedOutput, ProgressEvent,
};
pub use color_model::normalize;
pub use encoder::encode;
pub use heic_decoder::{is_heif_container, DecodeLimits, HeicDecoder, LibHeifDecoder};
pub use output_names::{output_file_name, OutputNamer};
pub use pipeline::{convert_one, ConversionPipeline};
pub use types::{
    ConversionConfig, ConversionResult, InputItem, PixelFormat, RasterImage, TargetFormat,
    DEFAULT_JPEG_QUALITY,
};

pub use shared_utils::img_errors::{ConvertError, Result};
pub use shared_utils::BatchSummary;
