//! Validated 4-D velocity fields.

use std::path::Path;

use ndarray::Array1;
use netcdf_io::{DataVariable, Dataset, GridStore, NetCdfError};
use tracing::debug;

use crate::error::{ProcessingError, Result};

/// Name of the vertical coordinate.
pub const DEPTH: &str = "depth";

/// Name of the time coordinate.
pub const TIME: &str = "time";

/// A gridded `(time, depth, lat, lon)` velocity dataset that has passed
/// validation.
///
/// Guarantees: `depth` is non-empty, strictly ascending and non-negative;
/// `time` is strictly ascending; every velocity variable has a `depth`
/// dimension whose length matches the coordinate.
#[derive(Debug, Clone)]
pub struct GriddedVelocityField {
    dataset: Dataset,
    depth: Array1<f64>,
    time: Array1<f64>,
    variables: Vec<String>,
}

impl GriddedVelocityField {
    /// Validate `dataset` for the named velocity components.
    pub fn from_dataset<S: AsRef<str>>(dataset: Dataset, variables: &[S]) -> Result<Self> {
        let depth = dataset.require_coordinate(DEPTH)?;
        if depth.is_empty() {
            return Err(ProcessingError::degenerate_depth("depth coordinate is empty"));
        }
        check_ascending(DEPTH, &depth.values)?;
        if depth.values.iter().any(|&d| d < 0.0) {
            return Err(NetCdfError::InvalidFormat(
                "depth coordinate must be non-negative (positive down)".to_string(),
            )
            .into());
        }

        let time = dataset.require_coordinate(TIME)?;
        check_ascending(TIME, &time.values)?;

        let mut names = Vec::with_capacity(variables.len());
        for name in variables {
            let name = name.as_ref();
            let var = dataset
                .variable(name)
                .ok_or_else(|| ProcessingError::MissingVariable(name.to_string()))?;
            let axis = var.axis(DEPTH).ok_or_else(|| {
                ProcessingError::shape_mismatch(format!(
                    "variable '{}' has no '{}' dimension (dims: {:?})",
                    name, DEPTH, var.dims
                ))
            })?;
            if var.data.shape()[axis] != depth.len() {
                return Err(ProcessingError::shape_mismatch(format!(
                    "variable '{}' has {} depth levels, coordinate has {}",
                    name,
                    var.data.shape()[axis],
                    depth.len()
                )));
            }
            names.push(name.to_string());
        }

        debug!(
            depth_levels = depth.len(),
            time_steps = time.len(),
            variables = ?names,
            "Validated velocity field"
        );
        let depth = depth.values.clone();
        let time = time.values.clone();
        Ok(Self {
            dataset,
            depth,
            time,
            variables: names,
        })
    }

    /// Load a file through `store` and validate it.
    pub fn open<G, S>(store: &G, path: &Path, variables: &[S]) -> Result<Self>
    where
        G: GridStore + ?Sized,
        S: AsRef<str>,
    {
        let dataset = store.open(path)?;
        Self::from_dataset(dataset, variables)
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Depth levels in metres, ascending.
    pub fn depth(&self) -> &Array1<f64> {
        &self.depth
    }

    pub fn time(&self) -> &Array1<f64> {
        &self.time
    }

    /// Names of the validated velocity components.
    pub fn variable_names(&self) -> &[String] {
        &self.variables
    }

    /// A validated velocity component.
    pub fn velocity(&self, name: &str) -> Result<&DataVariable> {
        if !self.variables.iter().any(|v| v == name) {
            return Err(ProcessingError::MissingVariable(name.to_string()));
        }
        Ok(self.dataset.require_variable(name)?)
    }
}

fn check_ascending(name: &str, values: &Array1<f64>) -> Result<()> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(NetCdfError::InvalidFormat(format!(
            "coordinate '{}' contains non-finite values",
            name
        ))
        .into());
    }
    let values = values.to_vec();
    if let Some(pair) = values.windows(2).find(|w| w[1] <= w[0]) {
        return Err(NetCdfError::InvalidFormat(format!(
            "coordinate '{}' is not strictly ascending ({} then {})",
            name, pair[0], pair[1]
        ))
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::generators::velocity_dataset;

    #[test]
    fn test_accepts_well_formed_field() {
        let ds = velocity_dataset(&[0.0, 10.0, 20.0], 2, 3, 4);
        let field = GriddedVelocityField::from_dataset(ds, &["uo", "vo"]).unwrap();
        assert_eq!(field.depth().to_vec(), vec![0.0, 10.0, 20.0]);
        assert_eq!(field.time().len(), 2);
        assert_eq!(field.variable_names(), &["uo".to_string(), "vo".to_string()]);
    }

    #[test]
    fn test_rejects_descending_depth() {
        let ds = velocity_dataset(&[20.0, 10.0, 0.0], 1, 2, 2);
        let result = GriddedVelocityField::from_dataset(ds, &["uo"]);
        assert!(matches!(
            result,
            Err(ProcessingError::NetCdf(NetCdfError::InvalidFormat(_)))
        ));
    }

    #[test]
    fn test_rejects_negative_depth() {
        let ds = velocity_dataset(&[-10.0, 0.0], 1, 2, 2);
        assert!(GriddedVelocityField::from_dataset(ds, &["uo"]).is_err());
    }

    #[test]
    fn test_rejects_unknown_variable() {
        let ds = velocity_dataset(&[0.0, 10.0], 1, 2, 2);
        let result = GriddedVelocityField::from_dataset(ds, &["thetao"]);
        assert!(matches!(result, Err(ProcessingError::MissingVariable(name)) if name == "thetao"));
    }

    #[test]
    fn test_velocity_limited_to_validated_names() {
        let ds = velocity_dataset(&[0.0, 10.0], 1, 2, 2);
        let field = GriddedVelocityField::from_dataset(ds, &["uo"]).unwrap();
        assert!(field.velocity("uo").is_ok());
        assert!(field.velocity("vo").is_err());
    }
}
