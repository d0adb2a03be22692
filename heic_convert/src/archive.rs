//! Archive Packager
//!
//! Writes converted outputs into an in-memory ZIP. Entry timestamps are
//! pinned so identical input yields byte-identical archives.

use crate::types::TargetFormat;
use serde::{Deserialize, Serialize};
use shared_utils::{ConvertError, Result};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArchiveCompression {
    /// PNG and JPEG are already compressed; storing skips the wasted effort
    Stored,
    #[default]
    Deflated,
}

impl ArchiveCompression {
    fn method(&self) -> CompressionMethod {
        match self {
            ArchiveCompression::Stored => CompressionMethod::Stored,
            ArchiveCompression::Deflated => CompressionMethod::Deflated,
        }
    }
}

/// Download name for a batch archive, e.g. `converted_images_jpeg.zip`.
pub fn archive_file_name(format: TargetFormat) -> String {
    format!("converted_images_{}.zip", format.as_str().to_lowercase())
}

/// Pack `(name, bytes)` entries, in iteration order, with deflate compression.
pub fn pack<'a, I>(entries: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    pack_with(entries, ArchiveCompression::default())
}

pub fn pack_with<'a, I>(entries: I, compression: ArchiveCompression) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let options = SimpleFileOptions::default()
        .compression_method(compression.method())
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644);

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let mut count = 0usize;

    for (name, bytes) in entries {
        writer
            .start_file(name, options)
            .map_err(|e| ConvertError::Pack(format!("{}: {}", name, e)))?;
        writer
            .write_all(bytes)
            .map_err(|e| ConvertError::Pack(format!("{}: {}", name, e)))?;
        count += 1;
    }

    let cursor = writer
        .finish()
        .map_err(|e| ConvertError::Pack(e.to_string()))?;
    let archive = cursor.into_inner();

    tracing::debug!(entries = count, archive_bytes = archive.len(), "Archive packed");
    Ok(archive)
}
