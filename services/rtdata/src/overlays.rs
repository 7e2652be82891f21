//! Daily current overlays packaged as KMZ for Google Earth.
//!
//! Each source file yields one KMZ per UTC day holding a quiver image of the
//! daily mean current, a speed colour bar and a camera above the field.
//! Images are built in memory and go straight into the archive.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use current_processor::{daily_means, DailyCurrents, DailyMean};
use kml::{Camera, GroundOverlay, KmlDocument, KmzArchive, LatLonBox, ScreenOverlay};
use netcdf_io::{Dataset, GridStore};
use renderer::{render_colorbar, render_quiver, ColorbarStyle, Normalize, QuiverStyle, VectorGrid};
use rtdata_common::{BoundingBox, OverlayConfig};
use storage::{Manifest, CMEMS_FILES, PROCESSED_DATA};
use tracing::{info, instrument};

/// Files to draw: the first downloaded product, then every processed one.
pub fn overlay_sources(manifest: &Manifest, data_dir: &Path) -> Vec<PathBuf> {
    manifest
        .first_in(CMEMS_FILES)
        .into_iter()
        .chain(manifest.category(PROCESSED_DATA))
        .map(|entry| data_dir.join(entry))
        .collect()
}

/// Render every source listed in the manifest.
pub fn produce_overlays<G: GridStore>(
    store: &G,
    manifest_path: &Path,
    data_dir: &Path,
    overlay: &OverlayConfig,
    kmz_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let manifest = Manifest::load(manifest_path)
        .with_context(|| format!("Failed to load manifest {}", manifest_path.display()))?;

    let mut written = Vec::new();
    for source in overlay_sources(&manifest, data_dir) {
        let dataset = store
            .open(&source)
            .with_context(|| format!("Failed to open {}", source.display()))?;
        let tag = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .with_context(|| format!("No file name in {}", source.display()))?;
        written.extend(write_daily_overlays(&dataset, &tag, overlay, kmz_dir)?);
    }
    Ok(written)
}

/// One KMZ per day at `{kmz_dir}/{tag}_{YYYY-MM-DD}.kmz`.
#[instrument(skip(dataset, overlay), fields(tag = %tag))]
pub fn write_daily_overlays(
    dataset: &Dataset,
    tag: &str,
    overlay: &OverlayConfig,
    kmz_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let currents = daily_means(dataset).with_context(|| format!("No daily means for {}", tag))?;
    let lon = currents.longitude.to_vec();
    let lat = currents.latitude.to_vec();
    let extent = BoundingBox::enclosing(&lon, &lat).context("Grid has no finite coordinates")?;
    let bounds = LatLonBox::new(extent.min_lon, extent.min_lat, extent.max_lon, extent.max_lat)?;

    let style = QuiverStyle {
        pixels: overlay.image_pixels,
        scale: overlay.quiver_scale,
        norm: Normalize::new(0.0, overlay.speed_max),
        ..QuiverStyle::default()
    };
    let legend = render_colorbar(&ColorbarStyle::new(style.colormap, style.norm))?.encode_png()?;

    let mut written = Vec::with_capacity(currents.days.len());
    for day in &currents.days {
        let path = write_day(&currents, day, tag, &style, bounds, &legend, kmz_dir)?;
        written.push(path);
    }
    info!(days = written.len(), "Wrote current overlays");
    Ok(written)
}

fn write_day(
    currents: &DailyCurrents,
    day: &DailyMean,
    tag: &str,
    style: &QuiverStyle,
    bounds: LatLonBox,
    legend: &[u8],
    kmz_dir: &Path,
) -> Result<PathBuf> {
    let lon = currents.longitude.to_vec();
    let lat = currents.latitude.to_vec();
    let u: Vec<f64> = day.u.iter().copied().collect();
    let v: Vec<f64> = day.v.iter().copied().collect();
    let image = render_quiver(&VectorGrid { lon: &lon, lat: &lat, u: &u, v: &v }, style)
        .with_context(|| format!("Failed to draw {} on {}", tag, day.date))?
        .encode_png()?;

    let stem = format!("{}_{}", tag, day.date.format("%Y-%m-%d"));
    let image_name = format!("{}.png", stem);
    let legend_name = format!("{}_colorbar.png", stem);

    let mut doc = KmlDocument::new().with_name(stem.clone());
    doc.set_camera(Camera::above(&bounds));
    doc.add_ground_overlay(GroundOverlay::new(image_name.clone(), bounds));
    doc.add_screen_overlay(ScreenOverlay::legend(legend_name.clone()));

    let mut kmz = KmzArchive::new(&doc);
    kmz.add_file(image_name, image)?;
    kmz.add_file(legend_name, legend.to_vec())?;

    let path = kmz_dir.join(format!("{}.kmz", stem));
    kmz.write(&path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{velocity_dataset, MemoryStore};

    fn small_overlay() -> OverlayConfig {
        OverlayConfig {
            image_pixels: 64,
            ..OverlayConfig::default()
        }
    }

    #[test]
    fn test_sources_first_download_then_processed() {
        let manifest = Manifest::from_json(
            r#"{"cmems_files": ["obs.nc", "model.nc"],
                "processed data": ["/abs/model_1000m.nc", "/abs/model_averaged.nc"]}"#,
        )
        .unwrap();
        let sources = overlay_sources(&manifest, Path::new("/data"));
        assert_eq!(
            sources,
            vec![
                PathBuf::from("/data/obs.nc"),
                PathBuf::from("/abs/model_1000m.nc"),
                PathBuf::from("/abs/model_averaged.nc"),
            ]
        );
    }

    #[test]
    fn test_one_kmz_per_day() {
        let dir = tempfile::tempdir().unwrap();
        // Eight 6-hourly steps span two days
        let dataset = velocity_dataset(&[0.0], 8, 4, 5);

        let written =
            write_daily_overlays(&dataset, "model_currents", &small_overlay(), dir.path()).unwrap();

        assert_eq!(
            written,
            vec![
                dir.path().join("model_currents_2025-03-01.kmz"),
                dir.path().join("model_currents_2025-03-02.kmz"),
            ]
        );
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().all(|n| n.ends_with(".kmz")), "{:?}", names);
        let bytes = std::fs::read(&written[0]).unwrap();
        assert_eq!(&bytes[..4], b"PK\x03\x04");
    }

    #[test]
    fn test_produce_from_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();
        store.insert(dir.path().join("obs_currents.nc"), velocity_dataset(&[0.0], 4, 3, 3));
        let manifest = test_utils::write_manifest(
            dir.path(),
            r#"{"cmems_files": ["obs_currents.nc"]}"#,
        );

        let written = produce_overlays(
            &store,
            &manifest,
            dir.path(),
            &small_overlay(),
            &dir.path().join("kmz"),
        )
        .unwrap();

        assert_eq!(written, vec![dir.path().join("kmz/obs_currents_2025-03-01.kmz")]);
    }

    #[test]
    fn test_missing_source_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let manifest =
            test_utils::write_manifest(dir.path(), r#"{"cmems_files": ["absent.nc"]}"#);
        let err = produce_overlays(
            &MemoryStore::new(),
            &manifest,
            dir.path(),
            &small_overlay(),
            dir.path(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("absent.nc"));
    }
}
