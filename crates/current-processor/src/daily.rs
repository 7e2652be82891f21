//! Daily mean surface currents for map overlays.

use chrono::NaiveDate;
use ndarray::{Array1, Array2, Array3, ArrayD, Axis, Ix3};
use netcdf_io::{AttrValue, DataVariable, Dataset, NetCdfError};
use rtdata_common::{group_by_day, CfTimeUnits};
use tracing::debug;

use crate::error::{ProcessingError, Result};
use crate::field::TIME;

/// Velocity component pairs tried in order: geostrophic observations, then
/// model currents.
const COMPONENT_PAIRS: [(&str, &str); 2] = [("ugos", "vgos"), ("uo", "vo")];

const LATITUDE_NAMES: [&str; 2] = ["latitude", "lat"];
const LONGITUDE_NAMES: [&str; 2] = ["longitude", "lon"];

/// Mean `u`/`v` on one calendar day, indexed `[lat, lon]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyMean {
    pub date: NaiveDate,
    pub u: Array2<f64>,
    pub v: Array2<f64>,
}

impl DailyMean {
    /// Current speed `sqrt(u² + v²)`.
    pub fn speed(&self) -> Array2<f64> {
        ndarray::Zip::from(&self.u)
            .and(&self.v)
            .map_collect(|&u, &v| u.hypot(v))
    }
}

/// Daily means of one dataset on its horizontal grid.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyCurrents {
    pub longitude: Array1<f64>,
    pub latitude: Array1<f64>,
    pub days: Vec<DailyMean>,
}

/// The `(u, v)` variable names present in `dataset`.
pub fn current_components(dataset: &Dataset) -> Option<(&'static str, &'static str)> {
    COMPONENT_PAIRS
        .iter()
        .copied()
        .find(|(u, v)| dataset.has_variable(u) && dataset.has_variable(v))
}

/// Group time steps by UTC day and average each component over the day.
///
/// Missing samples are skipped; a cell with no valid sample on a day is NaN.
/// Besides `time` and the horizontal axes, variables may only carry
/// singleton dimensions (e.g. a one-level `depth`).
pub fn daily_means(dataset: &Dataset) -> Result<DailyCurrents> {
    let (u_name, v_name) = current_components(dataset).ok_or_else(|| {
        ProcessingError::MissingVariable("ugos/vgos or uo/vo".to_string())
    })?;

    let time = dataset.require_coordinate(TIME)?;
    let units = time
        .attributes
        .get("units")
        .and_then(AttrValue::as_str)
        .ok_or_else(|| NetCdfError::MissingData("time units attribute".to_string()))?;
    let times = CfTimeUnits::parse(units)?.decode_all(&time.values.to_vec())?;

    let lat_name = first_present(dataset, &LATITUDE_NAMES)?;
    let lon_name = first_present(dataset, &LONGITUDE_NAMES)?;

    let u = time_lat_lon(dataset.require_variable(u_name)?, lat_name, lon_name)?;
    let v = time_lat_lon(dataset.require_variable(v_name)?, lat_name, lon_name)?;

    let days = group_by_day(&times)
        .into_iter()
        .map(|(date, indices)| DailyMean {
            date,
            u: nan_mean_over(&u, &indices),
            v: nan_mean_over(&v, &indices),
        })
        .collect::<Vec<_>>();

    debug!(u = u_name, v = v_name, days = days.len(), "Computed daily means");
    Ok(DailyCurrents {
        longitude: dataset.require_coordinate(lon_name)?.values.clone(),
        latitude: dataset.require_coordinate(lat_name)?.values.clone(),
        days,
    })
}

fn first_present(dataset: &Dataset, names: &[&'static str]) -> Result<&'static str> {
    names
        .iter()
        .copied()
        .find(|n| dataset.coordinate(n).is_some())
        .ok_or_else(|| NetCdfError::MissingData(format!("coordinate {}", names.join("/"))).into())
}

/// Reorder a variable to `(time, lat, lon)`, dropping singleton axes.
fn time_lat_lon(var: &DataVariable, lat: &str, lon: &str) -> Result<Array3<f64>> {
    let mut data: ArrayD<f64> = var.data.clone();
    let mut dims = var.dims.clone();

    // Remove singleton extras from the back so indices stay valid
    for axis in (0..dims.len()).rev() {
        let name = dims[axis].as_str();
        if name == TIME || name == lat || name == lon {
            continue;
        }
        if data.len_of(Axis(axis)) != 1 {
            return Err(ProcessingError::shape_mismatch(format!(
                "variable '{}' has non-singleton dimension '{}'",
                var.name, name
            )));
        }
        data = data.index_axis_move(Axis(axis), 0);
        dims.remove(axis);
    }

    let order: Vec<usize> = [TIME, lat, lon]
        .iter()
        .map(|want| {
            dims.iter().position(|d| d == want).ok_or_else(|| {
                ProcessingError::shape_mismatch(format!(
                    "variable '{}' lacks dimension '{}'",
                    var.name, want
                ))
            })
        })
        .collect::<Result<_>>()?;

    data.permuted_axes(order)
        .into_dimensionality::<Ix3>()
        .map_err(|e| ProcessingError::shape_mismatch(e.to_string()))
}

fn nan_mean_over(data: &Array3<f64>, time_indices: &[usize]) -> Array2<f64> {
    let (_, ny, nx) = data.dim();
    Array2::from_shape_fn((ny, nx), |(j, i)| {
        let (sum, count) = time_indices
            .iter()
            .map(|&t| data[[t, j, i]])
            .filter(|v| !v.is_nan())
            .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
        if count == 0 {
            f64::NAN
        } else {
            sum / count as f64
        }
    })
}
