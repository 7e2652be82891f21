//! Storage abstractions for rtdata.
//!
//! Provides the JSON manifest that records which downloaded and derived
//! files exist, grouped by category (e.g. `cmems_files`, `processed data`).

pub mod error;
pub mod manifest;

pub use error::{StorageError, StorageResult};
pub use manifest::{resolve, update, Manifest, ResolvedEntry, CMEMS_FILES, PROCESSED_DATA};
