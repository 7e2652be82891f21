//! Synthetic ocean-current datasets.
//!
//! These generators create predictable `(time, depth, latitude, longitude)`
//! fields shaped like CMEMS model products, so reductions can be checked by
//! hand.

use ndarray::{ArrayD, IxDyn};
use netcdf_io::{Attributes, Coordinate, DataVariable, Dataset};

/// Hours between synthetic time steps.
pub const TIME_STEP_HOURS: f64 = 6.0;

/// Time units of every generated dataset.
pub const TIME_UNITS: &str = "hours since 2025-03-01 00:00:00";

/// Creates a velocity dataset where `f(t, k, j, i)` gives `(uo, vo)` at
/// time `t`, depth level `k`, latitude row `j` and longitude column `i`.
///
/// Coordinates: `time` every 6 hours from 2025-03-01, `latitude` from 49.0
/// and `longitude` from -17.0 in 0.25 degree steps.
pub fn velocity_dataset_with<F>(
    depths: &[f64],
    n_time: usize,
    n_lat: usize,
    n_lon: usize,
    f: F,
) -> Dataset
where
    F: Fn(usize, usize, usize, usize) -> (f64, f64),
{
    let mut attrs = Attributes::new();
    attrs.set("title", "synthetic currents");
    attrs.set("source", "test-utils");
    let mut ds = Dataset::new(attrs);

    let times = (0..n_time).map(|t| t as f64 * TIME_STEP_HOURS).collect();
    let lats = (0..n_lat).map(|j| 49.0 + j as f64 * 0.25).collect();
    let lons = (0..n_lon).map(|i| -17.0 + i as f64 * 0.25).collect();

    ds.add_coordinate(
        Coordinate::new("time", times)
            .with_attribute("units", TIME_UNITS)
            .with_attribute("standard_name", "time"),
    )
    .expect("time coordinate");
    ds.add_coordinate(
        Coordinate::new("depth", depths.to_vec())
            .with_attribute("units", "m")
            .with_attribute("positive", "down"),
    )
    .expect("depth coordinate");
    ds.add_coordinate(
        Coordinate::new("latitude", lats).with_attribute("units", "degrees_north"),
    )
    .expect("latitude coordinate");
    ds.add_coordinate(
        Coordinate::new("longitude", lons).with_attribute("units", "degrees_east"),
    )
    .expect("longitude coordinate");

    let shape = [n_time, depths.len(), n_lat, n_lon];
    let u = ArrayD::from_shape_fn(IxDyn(&shape), |idx| f(idx[0], idx[1], idx[2], idx[3]).0);
    let v = ArrayD::from_shape_fn(IxDyn(&shape), |idx| f(idx[0], idx[1], idx[2], idx[3]).1);

    for (name, data, standard_name) in [
        ("uo", u, "eastward_sea_water_velocity"),
        ("vo", v, "northward_sea_water_velocity"),
    ] {
        let mut var_attrs = Attributes::new();
        var_attrs.set("units", "m s-1");
        var_attrs.set("standard_name", standard_name);
        let var = DataVariable::new(
            name,
            vec![
                "time".to_string(),
                "depth".to_string(),
                "latitude".to_string(),
                "longitude".to_string(),
            ],
            data,
            var_attrs,
        )
        .expect("velocity variable");
        ds.add_variable(var).expect("velocity variable fits grid");
    }
    ds
}

/// Creates a velocity dataset with depth- and time-dependent values.
///
/// `uo = 0.1 * (k + 1) + 0.01 * t` and `vo = -0.05 * (k + 1)`, constant
/// across the horizontal grid.
pub fn velocity_dataset(depths: &[f64], n_time: usize, n_lat: usize, n_lon: usize) -> Dataset {
    velocity_dataset_with(depths, n_time, n_lat, n_lon, |t, k, _, _| {
        (0.1 * (k + 1) as f64 + 0.01 * t as f64, -0.05 * (k + 1) as f64)
    })
}

/// Creates a velocity dataset that is the same everywhere.
pub fn constant_velocity_dataset(
    depths: &[f64],
    n_time: usize,
    n_lat: usize,
    n_lon: usize,
    u: f64,
    v: f64,
) -> Dataset {
    velocity_dataset_with(depths, n_time, n_lat, n_lon, |_, _, _, _| (u, v))
}
