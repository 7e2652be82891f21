//! Single-level extraction along the depth axis.

use ndarray::Axis;
use netcdf_io::{DataVariable, Dataset};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ProcessingError, Result};
use crate::field::{GriddedVelocityField, DEPTH};

/// Two depth values closer than this (metres) are the same level.
pub const DEPTH_TOLERANCE_M: f64 = 1e-6;

/// How a requested depth is matched against the depth coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DepthMatch {
    /// The level must exist (within [`DEPTH_TOLERANCE_M`]).
    #[default]
    Exact,
    /// Use the closest level, whatever the distance.
    Nearest,
}

/// Index of the level matching `requested`.
///
/// Ties in [`DepthMatch::Nearest`] go to the shallower level.
pub fn find_depth_index(depth: &[f64], requested: f64, mode: DepthMatch) -> Result<usize> {
    let nearest = depth
        .iter()
        .enumerate()
        .filter(|(_, d)| d.is_finite())
        .min_by(|(_, a), (_, b)| {
            (*a - requested)
                .abs()
                .total_cmp(&(*b - requested).abs())
        })
        .map(|(idx, _)| idx)
        .ok_or_else(|| ProcessingError::degenerate_depth("depth coordinate has no finite levels"))?;

    if !requested.is_finite() {
        return Err(ProcessingError::DepthNotFound {
            requested,
            nearest: depth[nearest],
        });
    }

    match mode {
        DepthMatch::Exact if (depth[nearest] - requested).abs() > DEPTH_TOLERANCE_M => {
            Err(ProcessingError::DepthNotFound {
                requested,
                nearest: depth[nearest],
            })
        }
        DepthMatch::Nearest if (depth[nearest] - requested).abs() > DEPTH_TOLERANCE_M => {
            warn!(requested, using = depth[nearest], "Depth not on grid, using nearest level");
            Ok(nearest)
        }
        _ => Ok(nearest),
    }
}

/// Slice every named variable at one depth level.
///
/// The depth dimension is removed; all other dimensions, the variables'
/// attributes and the global attributes are carried over unchanged.
pub fn extract_depth_bin<S: AsRef<str>>(
    field: &GriddedVelocityField,
    variables: &[S],
    depth_value: f64,
    mode: DepthMatch,
) -> Result<Dataset> {
    let depth = field.depth().to_vec();
    let idx = find_depth_index(&depth, depth_value, mode)?;
    debug!(requested = depth_value, index = idx, level = depth[idx], "Extracting depth bin");

    let mut sliced = Vec::with_capacity(variables.len());
    for name in variables {
        let var = field.velocity(name.as_ref())?;
        let axis = var.axis(DEPTH).ok_or_else(|| {
            ProcessingError::shape_mismatch(format!("variable '{}' has no depth axis", var.name))
        })?;

        let data = var.data.index_axis(Axis(axis), idx).to_owned();
        let dims = var
            .dims
            .iter()
            .filter(|d| d.as_str() != DEPTH)
            .cloned()
            .collect();
        sliced.push(DataVariable::new(
            var.name.clone(),
            dims,
            data,
            var.attributes.clone(),
        )?);
    }

    Ok(field.dataset().derive(sliced)?)
}
