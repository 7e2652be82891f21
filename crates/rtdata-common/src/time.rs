//! Time handling: CF-convention time coordinates and day grouping.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::{CommonError, CommonResult};

/// Decoded CF `units` attribute of a time coordinate, e.g.
/// `"hours since 1950-01-01 00:00:00"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CfTimeUnits {
    /// Length of one unit in seconds.
    pub seconds_per_unit: f64,
    pub epoch: DateTime<Utc>,
}

impl CfTimeUnits {
    pub fn parse(units: &str) -> CommonResult<Self> {
        let (unit, reference) = units
            .split_once(" since ")
            .ok_or_else(|| CommonError::InvalidTime(format!("not a CF time unit: '{}'", units)))?;

        let seconds_per_unit = match unit.trim().to_lowercase().as_str() {
            "seconds" | "second" | "secs" | "sec" | "s" => 1.0,
            "minutes" | "minute" | "mins" | "min" => 60.0,
            "hours" | "hour" | "hrs" | "hr" | "h" => 3600.0,
            "days" | "day" | "d" => 86400.0,
            other => {
                return Err(CommonError::InvalidTime(format!(
                    "unsupported time unit '{}'",
                    other
                )))
            }
        };

        Ok(Self {
            seconds_per_unit,
            epoch: parse_reference_time(reference)?,
        })
    }

    /// Convert a raw coordinate value to a timestamp.
    pub fn decode(&self, value: f64) -> Option<DateTime<Utc>> {
        if !value.is_finite() {
            return None;
        }
        let millis = (value * self.seconds_per_unit * 1000.0).round();
        if millis.abs() > i64::MAX as f64 {
            return None;
        }
        self.epoch
            .checked_add_signed(Duration::milliseconds(millis as i64))
    }

    /// Decode a whole coordinate, failing on the first undecodable value.
    pub fn decode_all(&self, values: &[f64]) -> CommonResult<Vec<DateTime<Utc>>> {
        values
            .iter()
            .map(|&v| {
                self.decode(v)
                    .ok_or_else(|| CommonError::InvalidTime(format!("cannot decode time value {}", v)))
            })
            .collect()
    }
}

fn parse_reference_time(reference: &str) -> CommonResult<DateTime<Utc>> {
    let trimmed = reference
        .trim()
        .trim_end_matches(" UTC")
        .trim_end_matches('Z')
        .trim();

    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    for format in FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| CommonError::InvalidTime(format!("bad reference time '{}'", reference)))
}

/// Group time indices by calendar day (UTC), days in ascending order.
pub fn group_by_day(times: &[DateTime<Utc>]) -> Vec<(NaiveDate, Vec<usize>)> {
    let mut days: Vec<(NaiveDate, Vec<usize>)> = Vec::new();
    for (idx, t) in times.iter().enumerate() {
        let day = t.date_naive();
        match days.iter_mut().find(|(d, _)| *d == day) {
            Some((_, indices)) => indices.push(idx),
            None => days.push((day, vec![idx])),
        }
    }
    days.sort_by_key(|(day, _)| *day);
    days
}

/// Milliseconds since the Unix epoch as a timestamp.
pub fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

/// Format used by the C2 API `from` query parameter.
pub fn format_api_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M").to_string()
}
