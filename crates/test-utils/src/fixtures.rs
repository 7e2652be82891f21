//! Common test fixtures for rtdata tests.

use std::path::{Path, PathBuf};

/// Manifest file name used by the pipeline.
pub const MANIFEST_NAME: &str = "cmems_prod_config.json";

/// Manifest with one observation and one model download.
pub const DOWNLOAD_MANIFEST: &str = r#"{
    "cmems_files": [
        "2025-03-01_2025-03-06_obs_currents.nc",
        "2025-03-01_2025-03-06_model_currents.nc"
    ]
}"#;

/// Writes `json` as the manifest inside `dir` and returns its path.
pub fn write_manifest(dir: &Path, json: &str) -> PathBuf {
    let path = dir.join(MANIFEST_NAME);
    std::fs::write(&path, json).expect("Failed to write manifest fixture");
    path
}

/// Depth axes for testing.
pub mod depths {
    /// Shallow three-level axis without a 1000 m level.
    pub const SHALLOW: [f64; 3] = [0.0, 10.0, 20.0];

    /// Axis that contains the 1000 m level.
    pub const WITH_1000M: [f64; 5] = [0.0, 10.0, 100.0, 500.0, 1000.0];

    /// Subset of the CMEMS global analysis/forecast levels down to 1100 m.
    /// 1000 m is not one of them.
    pub const CMEMS_GLOBAL: [f64; 16] = [
        0.494, 1.541, 2.646, 3.819, 5.078, 6.441, 7.930, 9.573, 11.405, 13.467, 15.810, 541.089,
        643.567, 763.333, 902.339, 1062.440,
    ];
}

/// Glider positions for testing, as `(lat, lon)`.
pub mod positions {
    /// Porcupine Abyssal Plain.
    pub const PAP: (f64, f64) = (49.0, -16.5);

    /// On the equator and prime meridian.
    pub const ORIGIN: (f64, f64) = (0.0, 0.0);
}
