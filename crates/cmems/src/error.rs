//! Error types for CMEMS downloads.

use thiserror::Error;

pub type CmemsResult<T> = Result<T, CmemsError>;

#[derive(Debug, Error)]
pub enum CmemsError {
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Dataset id matches neither the model nor the observation convention.
    #[error("unknown product '{0}': expected '_mod_' or '_obs-' in the dataset id")]
    UnknownProduct(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("manifest error: {0}")]
    Storage(#[from] storage::StorageError),
}

impl CmemsError {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            CmemsError::Http { status, .. } => *status == 429 || *status >= 500,
            CmemsError::Request(e) => e.is_timeout() || e.is_connect() || e.is_body(),
            _ => false,
        }
    }
}
