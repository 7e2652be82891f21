//! Error types for KML and KMZ output.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KmlError {
    #[error("invalid KML colour '{0}': expected 8 hex digits aabbggrr")]
    InvalidColor(String),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("invalid archive entry: {0}")]
    InvalidEntry(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type KmlResult<T> = Result<T, KmlError>;
