//! Current-product reduction pipeline.
//!
//! ```text
//! manifest ──resolve──► source file ──open──► GriddedVelocityField
//!                                               │
//!                        ┌──────────────────────┴───────────────┐
//!                        ▼                                      ▼
//!               extract_depth_bin(1000 m)          depth_weighted_average
//!                        │                                      │
//!                        ▼                                      ▼
//!               {base}_1000m.nc                       {base}_averaged.nc
//!                        └──────────────► manifest["processed data"]
//! ```
//!
//! Both reductions are computed before anything is written. Products are
//! written under hidden `.{name}.pending` names and renamed into place only
//! after both writes succeed; on failure only the staged files are removed.
//! The manifest is updated once both outputs exist.

use std::path::{Path, PathBuf};

use netcdf_io::GridStore;
use rtdata_common::Config;
use storage::PROCESSED_DATA;
use tracing::{info, instrument, warn};

use crate::averaging::{depth_weighted_average, NanPolicy};
use crate::depth_bin::{extract_depth_bin, DepthMatch};
use crate::error::Result;
use crate::field::GriddedVelocityField;

/// Inputs of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub manifest_path: PathBuf,
    /// Base for relative manifest entries and destination of outputs.
    pub data_dir: PathBuf,
    /// Substring selecting the source entry.
    pub match_str: String,
    pub variables: Vec<String>,
    pub depth_bin_m: f64,
    pub depth_match: DepthMatch,
    pub nan_policy: NanPolicy,
    /// Manifest category receiving the outputs.
    pub category: String,
}

impl PipelineOptions {
    /// Defaults: `model_currents.nc`, `uo`/`vo`, 1000 m exact, masked NaNs.
    pub fn new(manifest_path: impl Into<PathBuf>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            data_dir: data_dir.into(),
            match_str: "model_currents.nc".to_string(),
            variables: vec!["uo".to_string(), "vo".to_string()],
            depth_bin_m: 1000.0,
            depth_match: DepthMatch::Exact,
            nan_policy: NanPolicy::MaskAndRenormalize,
            category: PROCESSED_DATA.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let processing = &config.processing;
        Self {
            match_str: processing.match_str.clone(),
            variables: processing.variables.clone(),
            depth_bin_m: processing.depth_bin_m,
            depth_match: if processing.nearest_depth {
                DepthMatch::Nearest
            } else {
                DepthMatch::Exact
            },
            nan_policy: if processing.propagate_nan {
                NanPolicy::Propagate
            } else {
                NanPolicy::MaskAndRenormalize
            },
            ..Self::new(config.manifest_path(), config.save_path.clone())
        }
    }
}

/// Files touched by a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutput {
    pub source: PathBuf,
    pub depth_bin_path: PathBuf,
    pub averaged_path: PathBuf,
}

/// Run the reduction pipeline once.
#[instrument(skip_all, fields(match_str = %options.match_str, depth = options.depth_bin_m))]
pub fn process_currents<G>(store: &G, options: &PipelineOptions) -> Result<PipelineOutput>
where
    G: GridStore + ?Sized,
{
    let entry = storage::resolve(&options.manifest_path, &options.match_str, &options.data_dir)?;
    info!(source = %entry.full_path.display(), "Processing current product");

    let field = GriddedVelocityField::open(store, &entry.full_path, &options.variables)?;

    let depth_bin = extract_depth_bin(
        &field,
        &options.variables,
        options.depth_bin_m,
        options.depth_match,
    )?;
    let averaged = depth_weighted_average(&field, &options.variables, options.nan_policy)?;
    drop(field);

    let depth_bin_name = format!("{}_{}m.nc", entry.base_name, depth_label(options.depth_bin_m));
    let averaged_name = format!("{}_averaged.nc", entry.base_name);

    // Outputs of an earlier run stay untouched until both products are staged
    let staged_bin = store.write(
        &depth_bin,
        &staging_name(&depth_bin_name),
        &options.data_dir,
    )?;
    let staged_avg = match store.write(
        &averaged,
        &staging_name(&averaged_name),
        &options.data_dir,
    ) {
        Ok(path) => path,
        Err(e) => {
            discard(store, &staged_bin);
            return Err(e.into());
        }
    };

    let depth_bin_path = options.data_dir.join(&depth_bin_name);
    let averaged_path = options.data_dir.join(&averaged_name);
    if let Err(e) = store.rename(&staged_bin, &depth_bin_path) {
        discard(store, &staged_bin);
        discard(store, &staged_avg);
        return Err(e.into());
    }
    if let Err(e) = store.rename(&staged_avg, &averaged_path) {
        discard(store, &staged_avg);
        return Err(e.into());
    }

    storage::update(
        &options.manifest_path,
        &options.category,
        [&depth_bin_path, &averaged_path],
    )?;

    info!(
        depth_bin = %depth_bin_path.display(),
        averaged = %averaged_path.display(),
        "Current products written"
    );
    Ok(PipelineOutput {
        source: entry.full_path,
        depth_bin_path,
        averaged_path,
    })
}

/// Depth as it appears in file names: `1000` for whole metres, `12.5`
/// otherwise.
fn depth_label(depth: f64) -> String {
    if depth.fract() == 0.0 && depth.abs() < 1e15 {
        format!("{}", depth as i64)
    } else {
        format!("{}", depth)
    }
}

/// Hidden sibling name used while a product is being written.
fn staging_name(filename: &str) -> String {
    format!(".{}.pending", filename)
}

fn discard<G: GridStore + ?Sized>(store: &G, path: &Path) {
    if let Err(e) = store.remove(path) {
        warn!(path = %path.display(), error = %e, "Failed to remove staged output");
    }
}
