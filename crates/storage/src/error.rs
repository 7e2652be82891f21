//! Error types for manifest operations.

use std::path::PathBuf;

use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No manifest entry contains the requested substring
    #[error("no entry containing '{substring}' in {}", manifest.display())]
    NotFound { substring: String, manifest: PathBuf },

    #[error("invalid manifest: {0}")]
    InvalidManifest(String),
}
