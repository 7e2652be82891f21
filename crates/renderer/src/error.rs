//! Error types for plot rendering.

use thiserror::Error;

/// Errors raised while drawing or encoding an image.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid image dimensions: {0}")]
    InvalidDimensions(String),

    #[error("grid shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("nothing to draw: {0}")]
    EmptyData(String),

    #[error("PNG encoding failed: {0}")]
    Encode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RenderResult<T> = Result<T, RenderError>;
