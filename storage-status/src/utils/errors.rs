//! Error taxonomy for status reporting and share reads.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatusError {
    /// The storage index text is not a valid base32 encoding
    #[error("Invalid storage index: {0}")]
    Decode(String),

    /// The Range header is missing, malformed or unsupported
    #[error("Invalid range: {0}")]
    Range(String),

    /// The share, or the requested span of it, does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Opaque failure from the storage engine
    #[error("Storage engine error: {0}")]
    Engine(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StatusError>;
