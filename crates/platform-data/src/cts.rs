//! Position fixes from CTS5 float alert e-mails.
//!
//! Alerts are quoted-printable, so `=` shows up as `=3D`. The message
//! carries a `UTC=3Dyy-mm-dd HH:MM:SS` stamp and a degrees-minutes fix such
//! as `Lat=3D4907.512N Long=3D01623.070W`.

use std::io::Write;
use std::path::Path;
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::error::{PlatformError, PlatformResult};

pub const FLOAT_PLATFORM_TYPE: &str = "Float";

static DATETIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"UTC=3D(\d{2}-\d{2}-\d{2}) (\d{2}:\d{2}:\d{2})").expect("Invalid datetime regex")
});

static POSITION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"Lat=3D(?P<lat>\d{2})(?P<lat_min>\d{2}\.\d+)(?P<lat_dir>[NS]) Long=3D(?P<lon>\d{3})(?P<lon_min>\d{2}\.\d+)(?P<lon_dir>[EW])",
    )
    .expect("Invalid position regex")
});

/// One row of the float position CSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FloatPosition {
    #[serde(serialize_with = "serialize_date")]
    pub date: NaiveDateTime,
    pub lon: f64,
    pub lat: f64,
    pub platform_type: String,
    pub platform_id: String,
}

fn serialize_date<S: serde::Serializer>(date: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&date.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// First UTC stamp in the alert text.
pub fn parse_datetime(text: &str) -> PlatformResult<NaiveDateTime> {
    let caps = DATETIME_RE
        .captures(text)
        .ok_or_else(|| PlatformError::Parse("no UTC timestamp in alert".to_string()))?;
    let stamp = format!("{} {}", &caps[1], &caps[2]);
    NaiveDateTime::parse_from_str(&stamp, "%y-%m-%d %H:%M:%S")
        .map_err(|e| PlatformError::Parse(format!("bad alert timestamp '{}': {}", stamp, e)))
}

/// First position fix in the alert text as decimal `(lat, lon)`.
pub fn parse_position(text: &str) -> PlatformResult<(f64, f64)> {
    let caps = POSITION_RE
        .captures(text)
        .ok_or_else(|| PlatformError::Parse("no CTS5 position in alert".to_string()))?;
    let number = |name: &str| {
        caps[name]
            .parse::<f64>()
            .map_err(|e| PlatformError::Parse(format!("bad {} '{}': {}", name, &caps[name], e)))
    };

    let mut lat = number("lat")? + number("lat_min")? / 60.0;
    let mut lon = number("lon")? + number("lon_min")? / 60.0;
    if &caps["lat_dir"] == "S" {
        lat = -lat;
    }
    if &caps["lon_dir"] == "W" {
        lon = -lon;
    }
    Ok((lat, lon))
}

/// Platform id embedded in alert file names: the ten characters that end
/// seven characters before the end of the path.
pub fn platform_id_from_path(path: &Path) -> PlatformResult<String> {
    let chars: Vec<char> = path.to_string_lossy().chars().collect();
    if chars.len() < 17 {
        return Err(PlatformError::Parse(format!(
            "alert path too short for a platform id: {}",
            path.display()
        )));
    }
    Ok(chars[chars.len() - 17..chars.len() - 7].iter().collect())
}

pub fn parse_alert(text: &str, platform_id: impl Into<String>) -> PlatformResult<FloatPosition> {
    let date = parse_datetime(text)?;
    let (lat, lon) = parse_position(text)?;
    Ok(FloatPosition {
        date,
        lon,
        lat,
        platform_type: FLOAT_PLATFORM_TYPE.to_string(),
        platform_id: platform_id.into(),
    })
}

/// Read one alert file.
pub fn read_alert(path: &Path) -> PlatformResult<FloatPosition> {
    let text = std::fs::read_to_string(path)?;
    let position = parse_alert(&text, platform_id_from_path(path)?)?;
    debug!(
        path = %path.display(),
        platform_id = %position.platform_id,
        lat = position.lat,
        lon = position.lon,
        "Parsed float alert"
    );
    Ok(position)
}

pub fn write_positions<W: Write>(writer: W, positions: &[FloatPosition]) -> PlatformResult<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for position in positions {
        csv.serialize(position)?;
    }
    csv.flush()?;
    Ok(())
}

/// Write positions as CSV, creating parent directories.
pub fn write_positions_csv(path: &Path, positions: &[FloatPosition]) -> PlatformResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    write_positions(std::fs::File::create(path)?, positions)
}
