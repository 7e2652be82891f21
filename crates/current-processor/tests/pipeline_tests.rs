//! End-to-end pipeline tests against the in-memory grid store.

use std::path::Path;

use current_processor::{
    depth_weighted_average, depth_weights, extract_depth_bin, process_currents, DepthMatch,
    GriddedVelocityField, NanPolicy, PipelineOptions, ProcessingError,
};
use netcdf_io::{AttrValue, GridStore};
use storage::Manifest;
use test_utils::{
    assert_all_approx_eq, assert_approx_eq, constant_velocity_dataset, depths,
    velocity_dataset, velocity_dataset_with, write_manifest, MemoryStore,
};

const SOURCE: &str = "a_model_currents.nc";

fn setup(dir: &Path, depth_axis: &[f64]) -> (MemoryStore, PipelineOptions) {
    let manifest = write_manifest(dir, &format!(r#"{{"cmems_files": ["{}"]}}"#, SOURCE));
    let store = MemoryStore::new();
    store.insert(dir.join(SOURCE), velocity_dataset(depth_axis, 2, 3, 4));
    (store, PipelineOptions::new(manifest, dir))
}

// ============================================================================
// Depth weights
// ============================================================================

#[test]
fn test_weights_sum_identity() {
    for axis in [
        &depths::SHALLOW[..],
        &depths::WITH_1000M[..],
        &depths::CMEMS_GLOBAL[..],
        &[3.0, 7.5][..],
    ] {
        let n = axis.len();
        let total: f64 = depth_weights(axis).unwrap().sum();
        let expected = axis[n - 1] - axis[0] + (axis[n - 1] - axis[n - 2]);
        assert_approx_eq!(total, expected, 1e-9);
    }
}

#[test]
fn test_weights_non_negative() {
    let weights = depth_weights(&depths::CMEMS_GLOBAL).unwrap();
    assert!(weights.iter().all(|&w| w >= 0.0));
}

// ============================================================================
// Reductions
// ============================================================================

#[test]
fn test_constant_column_average_equals_constant() {
    let ds = constant_velocity_dataset(&depths::CMEMS_GLOBAL, 3, 2, 2, 0.37, -0.12);
    let field = GriddedVelocityField::from_dataset(ds, &["uo", "vo"]).unwrap();

    for policy in [NanPolicy::MaskAndRenormalize, NanPolicy::Propagate] {
        let avg = depth_weighted_average(&field, &["uo", "vo"], policy).unwrap();
        assert!(avg
            .require_variable("uo")
            .unwrap()
            .data
            .iter()
            .all(|&v| (v - 0.37).abs() < 1e-12));
        assert!(avg
            .require_variable("vo")
            .unwrap()
            .data
            .iter()
            .all(|&v| (v + 0.12).abs() < 1e-12));
    }
}

#[test]
fn test_average_is_per_time_step() {
    // uo = 0.1 * (k + 1) + 0.01 * t over depths [0, 10, 20], weights [10, 10, 10]
    let ds = velocity_dataset(&depths::SHALLOW, 3, 1, 1);
    let field = GriddedVelocityField::from_dataset(ds, &["uo"]).unwrap();
    let avg = depth_weighted_average(&field, &["uo"], NanPolicy::default()).unwrap();

    let uo = avg.require_variable("uo").unwrap();
    assert_eq!(uo.dims, vec!["time", "latitude", "longitude"]);
    assert_eq!(uo.data.shape(), &[3, 1, 1]);
    assert_all_approx_eq!(uo.data.iter().copied(), vec![0.2, 0.21, 0.22], 1e-12);
}

#[test]
fn test_average_masks_missing_level() {
    // Level 1 missing everywhere at t=0
    let ds = velocity_dataset_with(&depths::SHALLOW, 2, 1, 1, |t, k, _, _| {
        if t == 0 && k == 1 {
            (f64::NAN, f64::NAN)
        } else {
            ((k + 1) as f64, 0.0)
        }
    });
    let field = GriddedVelocityField::from_dataset(ds, &["uo"]).unwrap();

    let masked = depth_weighted_average(&field, &["uo"], NanPolicy::MaskAndRenormalize).unwrap();
    let uo = &masked.require_variable("uo").unwrap().data;
    assert_approx_eq!(uo[[0, 0, 0]], 2.0, 1e-12); // (1 + 3) / 2
    assert_approx_eq!(uo[[1, 0, 0]], 2.0, 1e-12); // (1 + 2 + 3) / 3

    let propagated = depth_weighted_average(&field, &["uo"], NanPolicy::Propagate).unwrap();
    let uo = &propagated.require_variable("uo").unwrap().data;
    assert!(uo[[0, 0, 0]].is_nan());
    assert_approx_eq!(uo[[1, 0, 0]], 2.0, 1e-12);
}

#[test]
fn test_single_level_average_is_degenerate() {
    let ds = velocity_dataset(&[5.0], 1, 1, 1);
    let field = GriddedVelocityField::from_dataset(ds, &["uo"]).unwrap();
    assert!(matches!(
        depth_weighted_average(&field, &["uo"], NanPolicy::default()),
        Err(ProcessingError::DegenerateDepth(_))
    ));
}

#[test]
fn test_depth_bin_removes_depth_only() {
    let ds = velocity_dataset(&depths::WITH_1000M, 2, 3, 4);
    let field = GriddedVelocityField::from_dataset(ds, &["uo", "vo"]).unwrap();
    let bin = extract_depth_bin(&field, &["uo", "vo"], 1000.0, DepthMatch::Exact).unwrap();

    let uo = bin.require_variable("uo").unwrap();
    assert_eq!(uo.dims, vec!["time", "latitude", "longitude"]);
    assert_eq!(uo.data.shape(), &[2, 3, 4]);
    // Deepest of five levels at t=1: 0.1 * 5 + 0.01
    assert_approx_eq!(uo.data[[1, 0, 0]], 0.51, 1e-12);
    assert!(bin.coordinate("depth").is_none());
    assert_eq!(bin.coordinate("latitude").unwrap().len(), 3);
}

#[test]
fn test_depth_bin_copies_attributes() {
    let ds = velocity_dataset(&depths::WITH_1000M, 1, 1, 1);
    let field = GriddedVelocityField::from_dataset(ds, &["uo"]).unwrap();
    let bin = extract_depth_bin(&field, &["uo"], 1000.0, DepthMatch::Exact).unwrap();

    assert_eq!(
        bin.attributes.get("title").and_then(AttrValue::as_str),
        Some("synthetic currents")
    );
    let uo = bin.require_variable("uo").unwrap();
    assert_eq!(
        uo.attributes.get("standard_name").and_then(AttrValue::as_str),
        Some("eastward_sea_water_velocity")
    );
}

#[test]
fn test_cmems_levels_need_nearest_for_1000m() {
    let ds = velocity_dataset(&depths::CMEMS_GLOBAL, 1, 1, 1);
    let field = GriddedVelocityField::from_dataset(ds, &["uo"]).unwrap();

    assert!(matches!(
        extract_depth_bin(&field, &["uo"], 1000.0, DepthMatch::Exact),
        Err(ProcessingError::DepthNotFound { nearest, .. }) if nearest == 1062.44
    ));

    let bin = extract_depth_bin(&field, &["uo"], 1000.0, DepthMatch::Nearest).unwrap();
    // 1062.44 m is level 16
    assert_approx_eq!(bin.require_variable("uo").unwrap().data[[0, 0, 0]], 1.6, 1e-12);
}

// ============================================================================
// process_currents
// ============================================================================

#[test]
fn test_pipeline_writes_both_products_and_updates_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let (store, options) = setup(dir.path(), &depths::WITH_1000M);

    let output = process_currents(&store, &options).unwrap();

    assert_eq!(output.source, dir.path().join(SOURCE));
    assert_eq!(output.depth_bin_path, dir.path().join("a_model_currents_1000m.nc"));
    assert_eq!(output.averaged_path, dir.path().join("a_model_currents_averaged.nc"));
    assert!(store.open(&output.depth_bin_path).is_ok());
    assert!(store.open(&output.averaged_path).is_ok());

    let manifest = Manifest::load(&options.manifest_path).unwrap();
    assert_eq!(manifest.category("cmems_files"), vec![SOURCE]);
    let depth_bin = output.depth_bin_path.to_string_lossy().into_owned();
    let averaged = output.averaged_path.to_string_lossy().into_owned();
    assert_eq!(
        manifest.category("processed data"),
        vec![depth_bin.as_str(), averaged.as_str()]
    );
}

#[test]
fn test_pipeline_missing_depth_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (store, options) = setup(dir.path(), &depths::SHALLOW);
    let manifest_before = std::fs::read_to_string(&options.manifest_path).unwrap();

    let result = process_currents(&store, &options);

    assert!(matches!(
        result,
        Err(ProcessingError::DepthNotFound { requested, nearest })
            if requested == 1000.0 && nearest == 20.0
    ));
    assert_eq!(store.paths(), vec![dir.path().join(SOURCE)]);
    assert_eq!(
        std::fs::read_to_string(&options.manifest_path).unwrap(),
        manifest_before
    );
}

#[test]
fn test_pipeline_second_write_failure_rolls_back() {
    let dir = tempfile::tempdir().unwrap();
    let (store, options) = setup(dir.path(), &depths::WITH_1000M);
    store.fail_writes_matching("_averaged");

    assert!(process_currents(&store, &options).is_err());

    assert!(!dir.path().join("a_model_currents_1000m.nc").exists());
    assert_eq!(store.paths(), vec![dir.path().join(SOURCE)]);
    let manifest = Manifest::load(&options.manifest_path).unwrap();
    assert!(manifest.category("processed data").is_empty());
}

#[test]
fn test_failed_rerun_keeps_previous_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let (store, options) = setup(dir.path(), &depths::WITH_1000M);
    let first = process_currents(&store, &options).unwrap();
    let manifest_before = std::fs::read_to_string(&options.manifest_path).unwrap();

    store.fail_writes_matching("_averaged");
    assert!(process_currents(&store, &options).is_err());

    assert!(first.depth_bin_path.exists());
    assert!(first.averaged_path.exists());
    assert!(store.open(&first.depth_bin_path).is_ok());
    assert!(store.open(&first.averaged_path).is_ok());
    assert_eq!(
        store.paths(),
        vec![
            dir.path().join(SOURCE),
            first.depth_bin_path.clone(),
            first.averaged_path.clone(),
        ]
    );
    assert_eq!(
        std::fs::read_to_string(&options.manifest_path).unwrap(),
        manifest_before
    );
}

#[test]
fn test_pipeline_leaves_no_staged_files() {
    let dir = tempfile::tempdir().unwrap();
    let (store, options) = setup(dir.path(), &depths::WITH_1000M);
    process_currents(&store, &options).unwrap();

    let pending: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".pending"))
        .collect();
    assert!(pending.is_empty(), "{:?}", pending);
}

#[test]
fn test_pipeline_no_manifest_match() {
    let dir = tempfile::tempdir().unwrap();
    let (store, mut options) = setup(dir.path(), &depths::WITH_1000M);
    options.match_str = "nonexistent.nc".to_string();

    assert!(matches!(
        process_currents(&store, &options),
        Err(ProcessingError::Storage(storage::StorageError::NotFound { .. }))
    ));
}

#[test]
fn test_pipeline_missing_variable() {
    let dir = tempfile::tempdir().unwrap();
    let (store, mut options) = setup(dir.path(), &depths::WITH_1000M);
    options.variables = vec!["uo".to_string(), "thetao".to_string()];

    assert!(matches!(
        process_currents(&store, &options),
        Err(ProcessingError::MissingVariable(name)) if name == "thetao"
    ));
}

#[test]
fn test_pipeline_runs_append_to_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let (store, options) = setup(dir.path(), &depths::WITH_1000M);

    process_currents(&store, &options).unwrap();
    process_currents(&store, &options).unwrap();

    let manifest = Manifest::load(&options.manifest_path).unwrap();
    assert_eq!(manifest.category("processed data").len(), 4);
}
