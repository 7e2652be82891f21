//! Depth-weighted vertical averaging.
//!
//! Each sample is weighted by the thickness of the layer it represents,
//! taken as the gap to the next level down. The deepest level has no next
//! level and reuses the gap above it:
//!
//! ```text
//! depth   0    10    20    50
//! weight  10   10    30    30
//! ```
//!
//! The reduction runs independently for every water column, so each time
//! step is averaged on its own with no smoothing across time.

use ndarray::{Array1, ArrayD, ArrayView1, Axis, Zip};
use netcdf_io::{DataVariable, Dataset};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProcessingError, Result};
use crate::field::{GriddedVelocityField, DEPTH};

/// Treatment of missing (NaN) samples inside a water column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NanPolicy {
    /// Drop missing samples from both the weighted sum and the weight
    /// total. A column with no valid sample averages to NaN.
    #[default]
    MaskAndRenormalize,
    /// Any missing sample makes the column average NaN.
    Propagate,
}

/// Layer-thickness weights aligned with `depth`.
///
/// Requires at least two levels, non-decreasing depths and a positive total.
pub fn depth_weights(depth: &[f64]) -> Result<Array1<f64>> {
    let n = depth.len();
    if n < 2 {
        return Err(ProcessingError::degenerate_depth(format!(
            "need at least 2 depth levels to weight layers, got {}",
            n
        )));
    }

    let mut weights: Vec<f64> = depth.windows(2).map(|w| w[1] - w[0]).collect();
    weights.push(weights[n - 2]);

    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(ProcessingError::degenerate_depth(format!(
            "depth levels must be finite and ascending: {:?}",
            depth
        )));
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Err(ProcessingError::degenerate_depth(
            "depth layers have zero total thickness",
        ));
    }

    Ok(Array1::from(weights))
}

/// Collapse the depth axis of every named variable.
///
/// Output variables keep their remaining dimensions in order and copy the
/// source attributes; global attributes are carried over.
pub fn depth_weighted_average<S: AsRef<str>>(
    field: &GriddedVelocityField,
    variables: &[S],
    policy: NanPolicy,
) -> Result<Dataset> {
    let weights = depth_weights(&field.depth().to_vec())?;
    debug!(weights = ?weights.to_vec(), ?policy, "Computed depth weights");

    let mut averaged = Vec::with_capacity(variables.len());
    for name in variables {
        let var = field.velocity(name.as_ref())?;
        let axis = var.axis(DEPTH).ok_or_else(|| {
            ProcessingError::shape_mismatch(format!("variable '{}' has no depth axis", var.name))
        })?;

        let data = weighted_mean_along(&var.data, Axis(axis), &weights, policy)?;
        let dims = var
            .dims
            .iter()
            .filter(|d| d.as_str() != DEPTH)
            .cloned()
            .collect();
        averaged.push(DataVariable::new(
            var.name.clone(),
            dims,
            data,
            var.attributes.clone(),
        )?);
    }

    Ok(field.dataset().derive(averaged)?)
}

/// Weighted mean of every 1-D lane along `axis`.
pub fn weighted_mean_along(
    data: &ArrayD<f64>,
    axis: Axis,
    weights: &Array1<f64>,
    policy: NanPolicy,
) -> Result<ArrayD<f64>> {
    if data.len_of(axis) != weights.len() {
        return Err(ProcessingError::shape_mismatch(format!(
            "{} levels along axis {} but {} weights",
            data.len_of(axis),
            axis.index(),
            weights.len()
        )));
    }

    Ok(Zip::from(data.lanes(axis)).map_collect(|column| column_mean(column, weights.view(), policy)))
}

fn column_mean(column: ArrayView1<f64>, weights: ArrayView1<f64>, policy: NanPolicy) -> f64 {
    let mut sum = 0.0;
    let mut total = 0.0;

    for (&value, &weight) in column.iter().zip(weights.iter()) {
        if value.is_nan() {
            match policy {
                NanPolicy::Propagate => return f64::NAN,
                NanPolicy::MaskAndRenormalize => continue,
            }
        }
        sum += value * weight;
        total += weight;
    }

    if total > 0.0 {
        sum / total
    } else {
        f64::NAN
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    #[test]
    fn test_weights_repeat_last_gap() {
        let w = depth_weights(&[0.0, 10.0, 20.0, 50.0]).unwrap();
        assert_eq!(w.to_vec(), vec![10.0, 10.0, 30.0, 30.0]);
    }

    #[test]
    fn test_weights_reject_single_level() {
        assert!(matches!(
            depth_weights(&[5.0]),
            Err(ProcessingError::DegenerateDepth(_))
        ));
        assert!(matches!(
            depth_weights(&[]),
            Err(ProcessingError::DegenerateDepth(_))
        ));
    }

    #[test]
    fn test_weights_reject_zero_thickness() {
        assert!(matches!(
            depth_weights(&[3.0, 3.0, 3.0]),
            Err(ProcessingError::DegenerateDepth(_))
        ));
    }

    #[test]
    fn test_weights_reject_descending() {
        assert!(depth_weights(&[10.0, 0.0]).is_err());
    }

    #[test]
    fn test_column_mean_masks_nan() {
        let weights = Array1::from(vec![10.0, 10.0, 30.0]);
        let column = Array1::from(vec![1.0, f64::NAN, 3.0]);
        let mean = column_mean(column.view(), weights.view(), NanPolicy::MaskAndRenormalize);
        assert!((mean - (10.0 + 90.0) / 40.0).abs() < 1e-12);
    }

    #[test]
    fn test_column_mean_propagates_nan() {
        let weights = Array1::from(vec![10.0, 10.0]);
        let column = Array1::from(vec![1.0, f64::NAN]);
        assert!(column_mean(column.view(), weights.view(), NanPolicy::Propagate).is_nan());
    }

    #[test]
    fn test_all_nan_column_is_nan() {
        let weights = Array1::from(vec![1.0, 1.0]);
        let column = Array1::from(vec![f64::NAN, f64::NAN]);
        assert!(column_mean(column.view(), weights.view(), NanPolicy::MaskAndRenormalize).is_nan());
    }

    #[test]
    fn test_weighted_mean_along_middle_axis() {
        // shape (time=2, depth=2, x=1)
        let data =
            ArrayD::from_shape_vec(IxDyn(&[2, 2, 1]), vec![1.0, 3.0, 10.0, 20.0]).unwrap();
        let weights = Array1::from(vec![1.0, 3.0]);
        let out = weighted_mean_along(&data, Axis(1), &weights, NanPolicy::Propagate).unwrap();
        assert_eq!(out.shape(), &[2, 1]);
        assert!((out[[0, 0]] - 2.5).abs() < 1e-12);
        assert!((out[[1, 0]] - 17.5).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_mean_rejects_weight_length() {
        let data = ArrayD::from_elem(IxDyn(&[2, 3]), 1.0);
        let weights = Array1::from(vec![1.0, 1.0]);
        assert!(weighted_mean_along(&data, Axis(1), &weights, NanPolicy::Propagate).is_err());
    }
}
