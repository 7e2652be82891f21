//! Glider products: position points, track lines, observation time series
//! and their plots.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use kml::{save_kml, KmlColor, KmlDocument, LineStyle, Placemark};
use platform_data::{
    C2Client, ObservationTable, PlatformPositions, ProfileTimeseries, DEFAULT_LATITUDE_COLUMN,
    DEFAULT_PRESSURE_COLUMN, SLOCUM,
};
use renderer::{render_transect, render_vars_against_depth, ProfileTable, ScatterStyle, Series};
use rtdata_common::GliderConfig;
use tracing::{info, warn};

pub const TRACK_WIDTH: f64 = 3.0;

/// Depth-averaged current components reported by the glider.
const DAC_VARIABLES: [&str; 2] = ["m_water_vx", "m_water_vy"];

/// Variables fetched for the science time series.
pub const SCIENCE_VARIABLES: [&str; 9] = [
    "sci_water_pressure",
    "sci_water_temp",
    "sci_water_cond",
    "m_lon",
    "m_lat",
    "sci_flbbcd_chlor_units",
    "sci_flbbcd_bb_units",
    "m_time",
    "sci_oxy4_oxygen",
];

/// Latest fix of each glider as a point, described by its most recent
/// depth-averaged current when one is available.
pub async fn write_positions(
    client: &C2Client,
    gliders: &[GliderConfig],
    since: &DateTime<Utc>,
    output: &Path,
) -> Result<()> {
    let mut doc = KmlDocument::new().with_name("Glider positions");
    for glider in gliders {
        let positions = client
            .get_positions(SLOCUM, &glider.unit, since)
            .await
            .with_context(|| format!("Failed to fetch positions of {}", glider.unit))?;
        let (lat, lon) = positions.last_coordinates()?;

        let mut point = Placemark::point(glider.name.clone(), lon, lat);
        match latest_dac(client, &glider.unit, since).await {
            Ok((u, v)) => point = point.with_description(dac_description(u, v)),
            Err(e) => warn!(unit = %glider.unit, error = %e, "No depth-averaged current"),
        }
        doc.add_placemark(point);
    }
    save_kml(&doc, output)?;
    info!(path = %output.display(), gliders = gliders.len(), "Wrote glider positions");
    Ok(())
}

pub fn dac_description(u: f64, v: f64) -> String {
    format!("m_water_x : {} \n m_water_y : {}", u, v)
}

async fn latest_dac(client: &C2Client, unit: &str, since: &DateTime<Utc>) -> Result<(f64, f64)> {
    let variables: Vec<String> = DAC_VARIABLES.iter().map(|v| v.to_string()).collect();
    let body = client.get_observations(SLOCUM, unit, since, &variables).await?;
    let mut table = ObservationTable::from_long_csv(&body)?;
    table.forward_fill();
    let last = |name: &str| {
        table
            .column(name)
            .and_then(|c| c.last().copied().flatten())
            .with_context(|| format!("no {} samples", name))
    };
    Ok((last(DAC_VARIABLES[0])?, last(DAC_VARIABLES[1])?))
}

/// The glider's track as a single styled line.
pub fn track_document(glider: &GliderConfig, positions: &PlatformPositions) -> Result<KmlDocument> {
    let color: KmlColor = glider
        .color
        .parse()
        .with_context(|| format!("Bad track colour for {}", glider.unit))?;
    let mut doc = KmlDocument::new().with_name(glider.name.clone());
    doc.add_placemark(Placemark::line(
        glider.name.clone(),
        positions.track(),
        LineStyle {
            color,
            width: TRACK_WIDTH,
        },
    ));
    Ok(doc)
}

pub async fn write_tracks(
    client: &C2Client,
    gliders: &[GliderConfig],
    since: &DateTime<Utc>,
    dir: &Path,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(gliders.len());
    for glider in gliders {
        let positions = client
            .get_positions(SLOCUM, &glider.unit, since)
            .await
            .with_context(|| format!("Failed to fetch positions of {}", glider.unit))?;
        let path = dir.join(format!("{}.kml", glider.unit));
        save_kml(&track_document(glider, &positions)?, &path)?;
        written.push(path);
    }
    Ok(written)
}

/// Raw long-format observations saved as `{dir}/{unit}_ts.csv`.
pub async fn fetch_timeseries(
    client: &C2Client,
    unit: &str,
    since: &DateTime<Utc>,
    dir: &Path,
) -> Result<PathBuf> {
    let variables: Vec<String> = SCIENCE_VARIABLES.iter().map(|v| v.to_string()).collect();
    let body = client.get_observations(SLOCUM, unit, since, &variables).await?;
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("{}_ts.csv", unit));
    tokio::fs::write(&path, body).await?;
    info!(path = %path.display(), "Saved observations");
    Ok(path)
}

pub fn load_profiles(csv_path: &Path) -> Result<ProfileTimeseries> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("Failed to open {}", csv_path.display()))?;
    let profiles = ObservationTable::from_reader(file)?
        .into_profiles(DEFAULT_PRESSURE_COLUMN, DEFAULT_LATITUDE_COLUMN)
        .with_context(|| format!("Failed to process {}", csv_path.display()))?;
    Ok(profiles)
}

/// Transect and variables-against-depth figures for one time series.
/// Returns the two PNG paths written under `dir`.
pub fn plot_profiles(profiles: &ProfileTimeseries, name: &str, dir: &Path) -> Result<[PathBuf; 2]> {
    let time_ms = profiles.timestamps_f64();
    let series: Vec<Series<'_>> = profiles
        .columns
        .iter()
        .zip(&profiles.values)
        .map(|(column, values)| Series {
            name: column.as_str(),
            values: values.as_slice(),
        })
        .collect();
    let table = ProfileTable {
        time_ms: &time_ms,
        depth: &profiles.depth,
        series: &series,
    };
    let style = ScatterStyle::default();
    std::fs::create_dir_all(dir)?;

    let transect = dir.join(format!("{}_transect.png", name));
    render_transect(&table, &style)?.save_png(&transect)?;
    let vars = dir.join(format!("{}_vars_depth.png", name));
    render_vars_against_depth(&table, &style)?.save_png(&vars)?;
    Ok([transect, vars])
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform_data::parse_positions;

    fn glider(color: &str) -> GliderConfig {
        GliderConfig {
            unit: "unit_306".to_string(),
            name: "Zephyr".to_string(),
            id: Some(127),
            color: color.to_string(),
        }
    }

    #[test]
    fn test_track_document() {
        let positions = parse_positions(
            r#"[{"positions":{"internal":[{"latitude":49.1,"longitude":-16.4},
                                          {"latitude":49.0,"longitude":-16.5}]}}]"#,
        )
        .unwrap();
        let xml = track_document(&glider("ff00ff00"), &positions)
            .unwrap()
            .to_xml();
        assert!(xml.contains("<width>3</width>"));
        assert!(xml.contains("<color>ff00ff00</color>"));
        assert!(xml.contains("-16.4,49.1,0 -16.5,49,0"));
    }

    #[test]
    fn test_bad_track_colour() {
        let positions = parse_positions(r#"[{"positions":{}}]"#).unwrap();
        assert!(track_document(&glider("red"), &positions).is_err());
    }

    #[test]
    fn test_dac_description() {
        assert_eq!(dac_description(0.1, -0.2), "m_water_x : 0.1 \n m_water_y : -0.2");
    }

    #[test]
    fn test_plot_profiles_writes_both_figures() {
        let dir = tempfile::tempdir().unwrap();
        let csv = "timestamp,variable,value\n\
                   1742083200000,m_lat,49.1\n\
                   1742083200000,sci_water_pressure,1.0\n\
                   1742083200000,sci_water_temp,12.0\n\
                   1742090400000,sci_water_pressure,20.0\n\
                   1742090400000,sci_water_temp,11.0\n\
                   1742097600000,sci_water_pressure,50.0\n\
                   1742097600000,sci_water_temp,10.5\n";
        let path = dir.path().join("unit_306_ts.csv");
        std::fs::write(&path, csv).unwrap();

        let profiles = load_profiles(&path).unwrap();
        assert_eq!(profiles.len(), 3);
        let [transect, vars] = plot_profiles(&profiles, "unit_306", dir.path()).unwrap();
        assert!(transect.exists());
        assert!(vars.exists());
    }
}
