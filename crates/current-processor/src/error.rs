//! Error types for current-field processing.

use netcdf_io::NetCdfError;
use rtdata_common::CommonError;
use storage::StorageError;
use thiserror::Error;

/// Errors that can occur while reducing a velocity field.
#[derive(Error, Debug)]
pub enum ProcessingError {
    /// The requested depth level is not on the depth axis.
    #[error("depth {requested} m not found in depth coordinate (nearest level is {nearest} m)")]
    DepthNotFound { requested: f64, nearest: f64 },

    /// Depth axis cannot support the reduction (too short, zero thickness).
    #[error("degenerate depth axis: {0}")]
    DegenerateDepth(String),

    /// A variable's layout does not fit the reduction.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A requested variable is absent from the dataset.
    #[error("missing variable: {0}")]
    MissingVariable(String),

    #[error(transparent)]
    NetCdf(#[from] NetCdfError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl ProcessingError {
    pub fn degenerate_depth(msg: impl Into<String>) -> Self {
        Self::DegenerateDepth(msg.into())
    }

    pub fn shape_mismatch(msg: impl Into<String>) -> Self {
        Self::ShapeMismatch(msg.into())
    }
}

/// Result type for processing operations.
pub type Result<T> = std::result::Result<T, ProcessingError>;
