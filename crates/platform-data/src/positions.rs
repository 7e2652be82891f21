//! Glider position responses from the C2 positions endpoint.
//!
//! The endpoint returns a JSON array with one element per platform; each
//! element carries `positions.internal`, newest first when requested with
//! `time_order=descending`.

use serde::Deserialize;

use crate::error::{PlatformError, PlatformResult};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PositionRecord {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PositionSets {
    /// Fixes computed on board, newest first.
    #[serde(default)]
    pub internal: Vec<PositionRecord>,
}

/// Positions of one platform.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlatformPositions {
    #[serde(default)]
    pub platform_serial: Option<String>,
    pub positions: PositionSets,
}

impl PlatformPositions {
    /// Most recent `(latitude, longitude)`.
    pub fn last_coordinates(&self) -> PlatformResult<(f64, f64)> {
        self.positions
            .internal
            .first()
            .map(|p| (p.latitude, p.longitude))
            .ok_or_else(|| PlatformError::Parse("no internal positions".to_string()))
    }

    /// All fixes as `(lon, lat)` pairs in response order.
    pub fn track(&self) -> Vec<(f64, f64)> {
        self.positions
            .internal
            .iter()
            .map(|p| (p.longitude, p.latitude))
            .collect()
    }
}

/// First platform of a positions response body.
pub fn parse_positions(body: &str) -> PlatformResult<PlatformPositions> {
    let mut platforms: Vec<PlatformPositions> = serde_json::from_str(body)?;
    if platforms.is_empty() {
        return Err(PlatformError::Parse("empty positions response".to_string()));
    }
    Ok(platforms.swap_remove(0))
}
