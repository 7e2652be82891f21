//! JSON manifest of produced files.
//!
//! The manifest is a single JSON object mapping a category name to an
//! ordered list of file paths:
//!
//! ```json
//! {
//!     "cmems_files": ["2025-03-01_2025-03-06_model_currents.nc"],
//!     "processed data": ["2025-03-01_2025-03-06_model_currents_1000m.nc"]
//! }
//! ```
//!
//! Every update is a whole-file read-modify-write. The rewrite goes through a
//! sibling temp file and a rename, so readers see either the old or the new
//! document. Concurrent writers are not supported: the last rename wins and
//! silently discards the other writer's changes.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};

/// Category holding raw CMEMS downloads.
pub const CMEMS_FILES: &str = "cmems_files";

/// Category holding derived current products.
pub const PROCESSED_DATA: &str = "processed data";

/// A manifest entry located by substring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    /// Entry joined onto the data directory.
    pub full_path: PathBuf,
    /// File name without extension, used to name derived outputs.
    pub base_name: String,
}

/// In-memory manifest document.
///
/// Categories and entries keep insertion order. Unknown categories and
/// non-list values are preserved untouched on save.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    document: Map<String, Value>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> StorageResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Like [`Manifest::load`], but a missing file yields an empty manifest.
    pub fn load_or_default(path: &Path) -> StorageResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_json(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Manifest absent, starting empty");
                Ok(Self::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn from_json(content: &str) -> StorageResult<Self> {
        match serde_json::from_str(content)? {
            Value::Object(document) => Ok(Self { document }),
            other => Err(StorageError::InvalidManifest(format!(
                "expected a JSON object at the top level, found {}",
                json_kind(&other)
            ))),
        }
    }

    /// Pretty-printed JSON with 4-space indentation.
    pub fn to_json(&self) -> StorageResult<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        serde::Serialize::serialize(&self.document, &mut serializer)?;
        String::from_utf8(buf).map_err(|e| StorageError::InvalidManifest(e.to_string()))
    }

    /// Rewrite `path` atomically with the full document.
    pub fn save(&self, path: &Path) -> StorageResult<()> {
        let json = self.to_json()?;
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&directory)?;

        let file_name = path
            .file_name()
            .ok_or_else(|| {
                StorageError::InvalidManifest(format!("{} has no file name", path.display()))
            })?
            .to_string_lossy();
        let temp = directory.join(format!(".{}.{}.tmp", file_name, std::process::id()));

        std::fs::write(&temp, json)?;
        if let Err(e) = std::fs::rename(&temp, path) {
            let _ = std::fs::remove_file(&temp);
            return Err(e.into());
        }
        debug!(path = %path.display(), categories = self.document.len(), "Saved manifest");
        Ok(())
    }

    /// Category names in insertion order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.document.keys().map(String::as_str)
    }

    /// String entries of a category, in order. Missing categories are empty.
    pub fn category(&self, name: &str) -> Vec<&str> {
        match self.document.get(name) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn first_in(&self, name: &str) -> Option<&str> {
        self.category(name).into_iter().next()
    }

    /// First entry containing `substring`, scanning categories and then
    /// entries in insertion order. Matching is case-sensitive.
    pub fn find(&self, substring: &str) -> Option<&str> {
        self.document
            .values()
            .filter_map(Value::as_array)
            .flatten()
            .filter_map(Value::as_str)
            .find(|entry| entry.contains(substring))
    }

    /// Append entries to a category, creating it when absent. Duplicates are
    /// kept.
    pub fn append<I, S>(&mut self, category: &str, entries: I) -> StorageResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let slot = self
            .document
            .entry(category.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        let list = slot.as_array_mut().ok_or_else(|| {
            StorageError::InvalidManifest(format!("category '{}' is not a list", category))
        })?;
        list.extend(entries.into_iter().map(|e| Value::String(e.into())));
        Ok(())
    }
}

/// Find the first manifest entry containing `substring`.
///
/// Relative entries are resolved against `base_dir`.
pub fn resolve(manifest_path: &Path, substring: &str, base_dir: &Path) -> StorageResult<ResolvedEntry> {
    let manifest = Manifest::load(manifest_path)?;
    let entry = manifest
        .find(substring)
        .ok_or_else(|| StorageError::NotFound {
            substring: substring.to_string(),
            manifest: manifest_path.to_path_buf(),
        })?;

    let base_name = Path::new(entry)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| StorageError::InvalidManifest(format!("entry '{}' has no file name", entry)))?;

    let resolved = ResolvedEntry {
        full_path: base_dir.join(entry),
        base_name,
    };
    debug!(substring, path = %resolved.full_path.display(), "Resolved manifest entry");
    Ok(resolved)
}

/// Append `new_paths` to `category` and rewrite the manifest.
pub fn update<I, P>(manifest_path: &Path, category: &str, new_paths: I) -> StorageResult<()>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut manifest = Manifest::load_or_default(manifest_path)?;
    let entries: Vec<String> = new_paths
        .into_iter()
        .map(|p| p.as_ref().to_string_lossy().into_owned())
        .collect();
    let added = entries.len();
    manifest.append(category, entries)?;
    manifest.save(manifest_path)?;
    info!(path = %manifest_path.display(), category, added, "Updated manifest");
    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_scans_categories_in_order() {
        let manifest = Manifest::from_json(
            r#"{"b": ["x_model_currents.nc"], "a": ["y_model_currents.nc"]}"#,
        )
        .unwrap();
        assert_eq!(manifest.find("model_currents"), Some("x_model_currents.nc"));
    }

    #[test]
    fn test_find_is_case_sensitive() {
        let manifest = Manifest::from_json(r#"{"c": ["MODEL.nc"]}"#).unwrap();
        assert_eq!(manifest.find("model"), None);
    }

    #[test]
    fn test_non_list_values_tolerated_and_preserved() {
        let mut manifest =
            Manifest::from_json(r#"{"version": 2, "cmems_files": ["a.nc"]}"#).unwrap();
        assert!(manifest.category("version").is_empty());
        manifest.append("cmems_files", ["b.nc"]).unwrap();
        let json = manifest.to_json().unwrap();
        assert!(json.contains("\"version\": 2"));
        assert!(manifest.append("version", ["c.nc"]).is_err());
    }

    #[test]
    fn test_rejects_non_object_document() {
        assert!(matches!(
            Manifest::from_json("[1, 2]"),
            Err(StorageError::InvalidManifest(_))
        ));
    }

    #[test]
    fn test_pretty_printed_with_four_spaces() {
        let mut manifest = Manifest::new();
        manifest.append("cmems_files", ["a.nc"]).unwrap();
        assert_eq!(
            manifest.to_json().unwrap(),
            "{\n    \"cmems_files\": [\n        \"a.nc\"\n    ]\n}"
        );
    }
}
