//! Glider observation tables.
//!
//! The C2 observations endpoint returns long-format CSV, one row per
//! `(timestamp, variable, value)`. [`ObservationTable`] pivots it to one
//! column per variable; [`ObservationTable::into_profiles`] then fills gaps
//! forward, drops incomplete rows and derives depth and elapsed time.

use std::collections::HashMap;
use std::io::Read;

use chrono::{DateTime, Utc};
use rtdata_common::time::from_epoch_millis;
use tracing::debug;

use crate::error::{PlatformError, PlatformResult};

pub const TIMESTAMP_COLUMN: &str = "timestamp";
pub const VARIABLE_COLUMN: &str = "variable";
pub const VALUE_COLUMN: &str = "value";

pub const DEFAULT_PRESSURE_COLUMN: &str = "sci_water_pressure";
pub const DEFAULT_LATITUDE_COLUMN: &str = "m_lat";

const MS_PER_DAY: f64 = 86_400_000.0;
/// Glider pressure is reported in bar.
const DBAR_PER_BAR: f64 = 10.0;

/// Wide table: one row per timestamp, one column per variable.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationTable {
    timestamps: Vec<i64>,
    columns: Vec<String>,
    /// `values[column][row]`
    values: Vec<Vec<Option<f64>>>,
}

impl ObservationTable {
    /// Pivot long-format CSV text.
    pub fn from_long_csv(text: &str) -> PlatformResult<Self> {
        Self::from_reader(text.as_bytes())
    }

    /// Pivot long-format CSV. Rows and columns keep first-appearance order;
    /// when a `(timestamp, variable)` pair repeats, the last value wins.
    pub fn from_reader<R: Read>(reader: R) -> PlatformResult<Self> {
        let mut csv = csv::Reader::from_reader(reader);
        let headers = csv.headers()?.clone();
        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| PlatformError::MissingColumn(name.to_string()))
        };
        let (t_idx, var_idx, val_idx) = (
            position(TIMESTAMP_COLUMN)?,
            position(VARIABLE_COLUMN)?,
            position(VALUE_COLUMN)?,
        );

        let mut table = ObservationTable {
            timestamps: Vec::new(),
            columns: Vec::new(),
            values: Vec::new(),
        };
        let mut row_of: HashMap<i64, usize> = HashMap::new();
        let mut column_of: HashMap<String, usize> = HashMap::new();

        for (line, record) in csv.records().enumerate() {
            let record = record?;
            let field = |i: usize| record.get(i).unwrap_or("").trim();
            let timestamp = parse_timestamp(field(t_idx))
                .ok_or_else(|| PlatformError::Parse(format!("bad timestamp on row {}", line + 1)))?;
            let variable = field(var_idx);
            if variable.is_empty() {
                continue;
            }
            let value = parse_value(field(val_idx));

            let row = *row_of.entry(timestamp).or_insert_with(|| {
                table.timestamps.push(timestamp);
                for column in &mut table.values {
                    column.push(None);
                }
                table.timestamps.len() - 1
            });
            let col = match column_of.get(variable) {
                Some(&c) => c,
                None => {
                    table.columns.push(variable.to_string());
                    table.values.push(vec![None; table.timestamps.len()]);
                    column_of.insert(variable.to_string(), table.columns.len() - 1);
                    table.columns.len() - 1
                }
            };
            table.values[col][row] = value;
        }

        debug!(
            rows = table.timestamps.len(),
            columns = table.columns.len(),
            "Pivoted observations"
        );
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|i| self.values[i].as_slice())
    }

    /// Replace each missing value with the last present one above it.
    pub fn forward_fill(&mut self) {
        for column in &mut self.values {
            let mut last = None;
            for value in column.iter_mut() {
                match value {
                    Some(v) => last = Some(*v),
                    None => *value = last,
                }
            }
        }
    }

    /// Drop rows that still have a missing value in any column.
    pub fn drop_incomplete(&mut self) {
        let keep: Vec<bool> = (0..self.len())
            .map(|r| self.values.iter().all(|c| c[r].is_some()))
            .collect();
        let mut flags = keep.iter();
        self.timestamps.retain(|_| *flags.next().unwrap_or(&false));
        for column in &mut self.values {
            let mut flags = keep.iter();
            column.retain(|_| *flags.next().unwrap_or(&false));
        }
    }

    /// Forward fill, drop incomplete rows, then add depth (from pressure in
    /// bar and latitude) and days elapsed since the first sample.
    pub fn into_profiles(
        mut self,
        pressure_column: &str,
        latitude_column: &str,
    ) -> PlatformResult<ProfileTimeseries> {
        for required in [pressure_column, latitude_column] {
            if self.column(required).is_none() {
                return Err(PlatformError::MissingColumn(required.to_string()));
            }
        }

        self.forward_fill();
        self.drop_incomplete();

        let values: Vec<Vec<f64>> = self
            .values
            .into_iter()
            .map(|c| c.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
            .collect();
        let col = |name: &str| {
            self.columns
                .iter()
                .position(|c| c == name)
                .map(|i| &values[i])
                .ok_or_else(|| PlatformError::MissingColumn(name.to_string()))
        };
        let depth: Vec<f64> = col(pressure_column)?
            .iter()
            .zip(col(latitude_column)?)
            .map(|(&p, &lat)| depth_from_pressure(p * DBAR_PER_BAR, lat))
            .collect();

        let first = self.timestamps.first().copied().unwrap_or_default();
        let elapsed_days = self
            .timestamps
            .iter()
            .map(|&t| (t - first) as f64 / MS_PER_DAY)
            .collect();

        Ok(ProfileTimeseries {
            timestamps: self.timestamps,
            columns: self.columns,
            values,
            depth,
            elapsed_days,
        })
    }
}

fn parse_timestamp(s: &str) -> Option<i64> {
    s.parse::<i64>()
        .ok()
        .or_else(|| s.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v.round() as i64))
}

fn parse_value(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Complete observation rows with derived depth and elapsed time.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileTimeseries {
    /// Milliseconds since the Unix epoch.
    pub timestamps: Vec<i64>,
    pub columns: Vec<String>,
    /// `values[column][row]`
    pub values: Vec<Vec<f64>>,
    /// Metres, negative below the surface.
    pub depth: Vec<f64>,
    pub elapsed_days: Vec<f64>,
}

impl ProfileTimeseries {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|i| self.values[i].as_slice())
    }

    pub fn datetimes(&self) -> Vec<Option<DateTime<Utc>>> {
        self.timestamps.iter().map(|&t| from_epoch_millis(t)).collect()
    }

    pub fn timestamps_f64(&self) -> Vec<f64> {
        self.timestamps.iter().map(|&t| t as f64).collect()
    }
}

/// Depth in metres (negative down) from pressure in decibar, using the
/// UNESCO 1983 (Fofonoff and Millard) formula.
pub fn depth_from_pressure(pressure_dbar: f64, latitude: f64) -> f64 {
    let p = pressure_dbar;
    let x = (latitude / 57.29578).sin().powi(2);
    let gravity = 9.780318 * (1.0 + (5.2788e-3 + 2.36e-5 * x) * x) + 1.092e-6 * p;
    let depth = ((((-1.82e-15 * p + 2.279e-10) * p - 2.2512e-5) * p + 9.72659) * p) / gravity;
    -depth
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unesco_check_value() {
        // Published check value: 10000 dbar at 30 degrees is 9712.653 m
        let depth = depth_from_pressure(10_000.0, 30.0);
        assert!((depth + 9712.653).abs() < 1e-3);
        assert_eq!(depth_from_pressure(0.0, 45.0), 0.0);
    }

    #[test]
    fn test_pivot_last_value_wins() {
        let csv = "timestamp,variable,value\n\
                   1000,a,1.0\n\
                   1000,b,2.0\n\
                   2000,a,3.0\n\
                   1000,a,4.0\n";
        let table = ObservationTable::from_long_csv(csv).unwrap();
        assert_eq!(table.timestamps(), &[1000, 2000]);
        assert_eq!(table.columns(), &["a".to_string(), "b".to_string()]);
        assert_eq!(table.column("a").unwrap(), &[Some(4.0), Some(3.0)]);
        assert_eq!(table.column("b").unwrap(), &[Some(2.0), None]);
    }

    #[test]
    fn test_forward_fill_then_drop() {
        let csv = "timestamp,variable,value\n\
                   1,a,\n\
                   1,b,5\n\
                   2,a,1\n\
                   3,b,6\n";
        let mut table = ObservationTable::from_long_csv(csv).unwrap();
        table.forward_fill();
        assert_eq!(table.column("b").unwrap(), &[Some(5.0), Some(5.0), Some(6.0)]);
        table.drop_incomplete();
        // Row 1 has no earlier value of `a` to fill from
        assert_eq!(table.timestamps(), &[2, 3]);
        assert_eq!(table.column("a").unwrap(), &[Some(1.0), Some(1.0)]);
    }

    #[test]
    fn test_missing_long_format_column() {
        assert!(matches!(
            ObservationTable::from_long_csv("timestamp,value\n1,2\n"),
            Err(PlatformError::MissingColumn(c)) if c == "variable"
        ));
    }
}
