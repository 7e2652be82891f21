//! Subset requests: which product, where, when and how deep.

use chrono::{Duration, NaiveDate};
use rtdata_common::{BoundingBox, CmemsConfig, CmemsDataset};

use crate::error::{CmemsError, CmemsResult};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Kind of product, read from the dataset id naming convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductKind {
    /// Forecast model output (`cmems_mod_...`), has a depth axis.
    Model,
    /// Satellite-derived surface product (`cmems_obs-...`).
    Observation,
}

impl ProductKind {
    pub fn from_dataset_id(id: &str) -> CmemsResult<Self> {
        if id.contains("_mod_") {
            Ok(ProductKind::Model)
        } else if id.contains("_obs-") {
            Ok(ProductKind::Observation)
        } else {
            Err(CmemsError::UnknownProduct(id.to_string()))
        }
    }

    fn file_suffix(&self) -> &'static str {
        match self {
            ProductKind::Model => "model_currents.nc",
            ProductKind::Observation => "obs_currents.nc",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubsetRequest {
    pub dataset_id: String,
    pub kind: ProductKind,
    pub variables: Vec<String>,
    pub bbox: BoundingBox,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Depth range in metres; only sent for model products.
    pub min_depth: f64,
    pub max_depth: f64,
}

impl SubsetRequest {
    pub fn new(
        dataset: &CmemsDataset,
        bbox: BoundingBox,
        start: NaiveDate,
        end: NaiveDate,
        depth_range: (f64, f64),
    ) -> CmemsResult<Self> {
        Ok(Self {
            kind: ProductKind::from_dataset_id(&dataset.id)?,
            dataset_id: dataset.id.clone(),
            variables: dataset.variables.clone(),
            bbox,
            start,
            end,
            min_depth: depth_range.0,
            max_depth: depth_range.1,
        })
    }

    /// One request per configured dataset: a square box around the platform
    /// and a window from `lookback_days` before `today` to `forecast_days`
    /// after it.
    pub fn around_position(
        config: &CmemsConfig,
        lat: f64,
        lon: f64,
        today: NaiveDate,
    ) -> CmemsResult<Vec<Self>> {
        let bbox = BoundingBox::square_around(lat, lon, config.half_width_m);
        let start = today - Duration::days(config.lookback_days);
        let end = today + Duration::days(config.forecast_days);
        config
            .datasets
            .iter()
            .map(|d| Self::new(d, bbox, start, end, (config.min_depth, config.max_depth)))
            .collect()
    }

    /// `{start}_{end}_model_currents.nc` or `{start}_{end}_obs_currents.nc`.
    pub fn output_filename(&self) -> String {
        format!(
            "{}_{}_{}",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT),
            self.kind.file_suffix()
        )
    }

    /// Query parameters for the subset endpoint.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![("dataset_id", self.dataset_id.clone())];
        query.extend(self.variables.iter().map(|v| ("variable", v.clone())));
        query.extend([
            ("minimum_longitude", self.bbox.min_lon.to_string()),
            ("maximum_longitude", self.bbox.max_lon.to_string()),
            ("minimum_latitude", self.bbox.min_lat.to_string()),
            ("maximum_latitude", self.bbox.max_lat.to_string()),
            ("start_datetime", format!("{}T00:00:00", self.start.format(DATE_FORMAT))),
            ("end_datetime", format!("{}T00:00:00", self.end.format(DATE_FORMAT))),
        ]);
        if self.kind == ProductKind::Model {
            query.push(("minimum_depth", self.min_depth.to_string()));
            query.push(("maximum_depth", self.max_depth.to_string()));
        }
        query.push(("output_format", "netcdf".to_string()));
        query
    }
}
