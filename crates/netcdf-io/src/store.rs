//! Storage seam for gridded datasets.
//!
//! Processing code talks to a [`GridStore`] rather than to libnetcdf so it
//! can run against in-memory fixtures.

use std::path::{Path, PathBuf};

use crate::dataset::Dataset;
use crate::error::NetCdfResult;
use crate::{native, writer};

/// Load, persist, move and delete gridded datasets.
pub trait GridStore {
    fn open(&self, path: &Path) -> NetCdfResult<Dataset>;

    /// Persist `dataset` as `directory/filename` and return the full path.
    fn write(&self, dataset: &Dataset, filename: &str, directory: &Path) -> NetCdfResult<PathBuf>;

    fn remove(&self, path: &Path) -> NetCdfResult<()>;

    /// Move a stored dataset from `from` to `to`, replacing any existing one.
    fn rename(&self, from: &Path, to: &Path) -> NetCdfResult<()>;
}

/// NetCDF files on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetCdfStore;

impl GridStore for NetCdfStore {
    fn open(&self, path: &Path) -> NetCdfResult<Dataset> {
        native::open(path)
    }

    fn write(&self, dataset: &Dataset, filename: &str, directory: &Path) -> NetCdfResult<PathBuf> {
        writer::write(dataset, filename, directory)
    }

    fn remove(&self, path: &Path) -> NetCdfResult<()> {
        std::fs::remove_file(path)?;
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> NetCdfResult<()> {
        std::fs::rename(from, to)?;
        Ok(())
    }
}
