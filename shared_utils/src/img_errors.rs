//! Shared Conversion Error Types
//!
//! One taxonomy for the whole batch: configuration problems stop a batch
//! before it starts, decode/encode problems stay with the item that caused
//! them, packing problems surface after the per-item work is done.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to decode HEIC: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Failed to build archive: {0}")]
    Pack(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    /// Decode and encode failures belong to a single item and never abort a batch.
    pub fn is_item_level(&self) -> bool {
        matches!(self, ConvertError::Decode(_) | ConvertError::Encode(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ConvertError::Config(_) => "config",
            ConvertError::Decode(_) => "decode",
            ConvertError::Encode(_) => "encode",
            ConvertError::Pack(_) => "pack",
            ConvertError::Io(_) => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
