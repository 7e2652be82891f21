//! Copernicus Marine (CMEMS) subset downloads.
//!
//! Builds one [`SubsetRequest`] per configured product around the latest
//! glider position, downloads each with [`SubsetDownloader`] and records the
//! resulting files in the manifest under `cmems_files`.

pub mod download;
pub mod error;
pub mod request;

pub use download::{DownloadConfig, SubsetDownloader};
pub use error::{CmemsError, CmemsResult};
pub use request::{ProductKind, SubsetRequest};
