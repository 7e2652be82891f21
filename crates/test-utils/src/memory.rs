//! In-memory [`GridStore`] for pipeline tests without libnetcdf.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use netcdf_io::{Dataset, GridStore, NetCdfError, NetCdfResult};

/// Holds datasets keyed by path.
///
/// Every write also drops an empty marker file at the target path, so tests
/// can check the filesystem the same way they would with real NetCDF files.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: Mutex<HashMap<PathBuf, Dataset>>,
    fail_writes: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `open` at `path` return `dataset`.
    pub fn insert(&self, path: impl Into<PathBuf>, dataset: Dataset) {
        self.files
            .lock()
            .expect("store lock poisoned")
            .insert(path.into(), dataset);
    }

    /// Fail any later write whose file name contains `pattern`.
    pub fn fail_writes_matching(&self, pattern: &str) {
        self.fail_writes
            .lock()
            .expect("store lock poisoned")
            .push(pattern.to_string());
    }

    pub fn get(&self, path: &Path) -> Option<Dataset> {
        self.files
            .lock()
            .expect("store lock poisoned")
            .get(path)
            .cloned()
    }

    /// Paths currently held, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .files
            .lock()
            .expect("store lock poisoned")
            .keys()
            .cloned()
            .collect();
        paths.sort();
        paths
    }
}

impl GridStore for MemoryStore {
    fn open(&self, path: &Path) -> NetCdfResult<Dataset> {
        self.get(path).ok_or_else(|| {
            NetCdfError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            ))
        })
    }

    fn write(&self, dataset: &Dataset, filename: &str, directory: &Path) -> NetCdfResult<PathBuf> {
        let failing = self
            .fail_writes
            .lock()
            .expect("store lock poisoned")
            .iter()
            .any(|p| filename.contains(p.as_str()));
        if failing {
            return Err(NetCdfError::InvalidFormat(format!(
                "injected write failure for {}",
                filename
            )));
        }

        std::fs::create_dir_all(directory)?;
        let path = directory.join(filename);
        std::fs::write(&path, b"")?;
        self.insert(path.clone(), dataset.clone());
        Ok(path)
    }

    fn remove(&self, path: &Path) -> NetCdfResult<()> {
        self.files
            .lock()
            .expect("store lock poisoned")
            .remove(path);
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn rename(&self, from: &Path, to: &Path) -> NetCdfResult<()> {
        let mut files = self.files.lock().expect("store lock poisoned");
        let dataset = files.remove(from).ok_or_else(|| {
            NetCdfError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", from.display()),
            ))
        })?;
        if let Err(e) = std::fs::rename(from, to) {
            files.insert(from.to_path_buf(), dataset);
            return Err(e.into());
        }
        files.insert(to.to_path_buf(), dataset);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netcdf_io::Attributes;

    #[test]
    fn test_write_open_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();
        let path = store
            .write(&Dataset::new(Attributes::new()), "a.nc", dir.path())
            .unwrap();
        assert!(path.exists());
        assert!(store.open(&path).is_ok());
        store.remove(&path).unwrap();
        assert!(!path.exists());
        assert!(store.open(&path).is_err());
    }

    #[test]
    fn test_rename_moves_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();
        let staged = store
            .write(&Dataset::new(Attributes::new()), ".a.nc.pending", dir.path())
            .unwrap();
        let target = dir.path().join("a.nc");
        store.rename(&staged, &target).unwrap();
        assert!(!staged.exists());
        assert!(target.exists());
        assert_eq!(store.paths(), vec![target]);
    }

    #[test]
    fn test_injected_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();
        store.fail_writes_matching("_averaged");
        let result = store.write(&Dataset::default(), "x_averaged.nc", dir.path());
        assert!(result.is_err());
        assert!(store.paths().is_empty());
    }
}
