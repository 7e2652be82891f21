//! Geographic bounding boxes.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, SQRT_2};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CommonError;

/// WGS84 semi-major axis used by the Web Mercator (EPSG:3857) projection.
const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Default half-width of the download box drawn around a platform position.
pub const DEFAULT_HALF_WIDTH_M: f64 = 150_000.0 / SQRT_2;

/// A geographic bounding box in degrees (EPSG:4326).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Square box centred on a point, `half_width_m` metres to each side.
    ///
    /// The square is built in Web Mercator and projected back to degrees, so
    /// its latitude extent is asymmetric away from the equator.
    pub fn square_around(lat: f64, lon: f64, half_width_m: f64) -> Self {
        let (x, y) = to_web_mercator(lon, lat);
        let (min_lon, min_lat) = from_web_mercator(x - half_width_m, y - half_width_m);
        let (max_lon, max_lat) = from_web_mercator(x + half_width_m, y + half_width_m);
        Self::new(min_lon, min_lat, max_lon, max_lat)
    }

    /// Width of the bounding box in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Height of the bounding box in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Centre point as `(lon, lat)`.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }

    /// Check if a point is contained within this bbox.
    pub fn contains_point(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    /// Smallest box enclosing every `(lon, lat)` pair; NaN samples are ignored.
    pub fn enclosing(lons: &[f64], lats: &[f64]) -> Option<Self> {
        let (min_lon, max_lon) = finite_extent(lons)?;
        let (min_lat, max_lat) = finite_extent(lats)?;
        Some(Self::new(min_lon, min_lat, max_lon, max_lat))
    }
}

impl FromStr for BoundingBox {
    type Err = CommonError;

    /// Parse "min_lon,min_lat,max_lon,max_lat".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(CommonError::InvalidBbox(format!(
                "{}. Expected 'min_lon,min_lat,max_lon,max_lat'",
                s
            )));
        }

        let mut values = [0.0; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| CommonError::InvalidBbox(format!("invalid number '{}'", part)))?;
        }

        let bbox = Self::new(values[0], values[1], values[2], values[3]);
        if bbox.min_lon > bbox.max_lon || bbox.min_lat > bbox.max_lat {
            return Err(CommonError::InvalidBbox(format!("min exceeds max in '{}'", s)));
        }
        Ok(bbox)
    }
}

fn to_web_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let x = EARTH_RADIUS_M * lon.to_radians();
    let y = EARTH_RADIUS_M * (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

fn from_web_mercator(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / EARTH_RADIUS_M).to_degrees();
    let lat = (2.0 * (y / EARTH_RADIUS_M).exp().atan() - FRAC_PI_2).to_degrees();
    (lon, lat)
}

fn finite_extent(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}
