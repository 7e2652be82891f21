//! Manifest file behaviour on disk.

use std::path::{Path, PathBuf};

use storage::{resolve, update, Manifest, StorageError, PROCESSED_DATA};

fn write_manifest(dir: &Path, json: &str) -> PathBuf {
    let path = dir.join("cmems_prod_config.json");
    std::fs::write(&path, json).unwrap();
    path
}

// ============================================================================
// update
// ============================================================================

#[test]
fn test_update_fresh_manifest_creates_single_category() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("manifest.json");

    update(&path, PROCESSED_DATA, ["a_1000m.nc", "a_averaged.nc"]).unwrap();

    let manifest = Manifest::load(&path).unwrap();
    assert_eq!(manifest.categories().collect::<Vec<_>>(), vec![PROCESSED_DATA]);
    assert_eq!(
        manifest.category(PROCESSED_DATA),
        vec!["a_1000m.nc", "a_averaged.nc"]
    );
}

#[test]
fn test_update_appends_and_keeps_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_manifest(dir.path(), r#"{"cmems_files": ["a.nc"]}"#);

    update(&path, "cmems_files", ["b.nc"]).unwrap();
    update(&path, "cmems_files", ["a.nc"]).unwrap();

    let manifest = Manifest::load(&path).unwrap();
    assert_eq!(manifest.category("cmems_files"), vec!["a.nc", "b.nc", "a.nc"]);
}

#[test]
fn test_update_preserves_unknown_categories_and_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_manifest(
        dir.path(),
        r#"{"zeta": ["z.nc"], "cmems_files": ["a.nc"], "notes": "keep me"}"#,
    );

    update(&path, PROCESSED_DATA, ["p.nc"]).unwrap();

    let manifest = Manifest::load(&path).unwrap();
    assert_eq!(
        manifest.categories().collect::<Vec<_>>(),
        vec!["zeta", "cmems_files", "notes", PROCESSED_DATA]
    );
    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\"notes\": \"keep me\""));
}

#[test]
fn test_update_leaves_no_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("manifest.json");
    update(&path, "cmems_files", ["a.nc"]).unwrap();

    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn test_update_rejects_corrupt_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_manifest(dir.path(), "{ not json");
    assert!(matches!(
        update(&path, "cmems_files", ["a.nc"]),
        Err(StorageError::Json(_))
    ));
    // Corrupt file is left as it was
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
}

// ============================================================================
// resolve
// ============================================================================

#[test]
fn test_resolve_first_match_across_categories() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_manifest(
        dir.path(),
        r#"{
            "cmems_files": ["obs_currents.nc", "first_model_currents.nc"],
            "processed data": ["second_model_currents.nc"]
        }"#,
    );

    let entry = resolve(&path, "model_currents.nc", dir.path()).unwrap();
    assert_eq!(entry.full_path, dir.path().join("first_model_currents.nc"));
    assert_eq!(entry.base_name, "first_model_currents");
}

#[test]
fn test_resolve_absolute_entry_stays_absolute() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_manifest(
        dir.path(),
        r#"{"cmems_files": ["/data/cmems/x_model_currents.nc"]}"#,
    );

    let entry = resolve(&path, "model_currents", dir.path()).unwrap();
    assert_eq!(entry.full_path, PathBuf::from("/data/cmems/x_model_currents.nc"));
    assert_eq!(entry.base_name, "x_model_currents");
}

#[test]
fn test_resolve_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_manifest(dir.path(), r#"{"cmems_files": ["obs_currents.nc"]}"#);

    match resolve(&path, "model_currents.nc", dir.path()) {
        Err(StorageError::NotFound { substring, manifest }) => {
            assert_eq!(substring, "model_currents.nc");
            assert_eq!(manifest, path);
        }
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[test]
fn test_resolve_missing_manifest_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = resolve(&dir.path().join("absent.json"), "x", dir.path());
    assert!(matches!(result, Err(StorageError::Io(_))));
}

#[test]
fn test_first_in_category() {
    let manifest =
        Manifest::from_json(r#"{"cmems_files": ["obs.nc", "mod.nc"], "processed data": []}"#)
            .unwrap();
    assert_eq!(manifest.first_in("cmems_files"), Some("obs.nc"));
    assert_eq!(manifest.first_in("processed data"), None);
    assert_eq!(manifest.first_in("absent"), None);
}
