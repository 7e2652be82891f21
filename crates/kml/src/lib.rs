//! KML documents and KMZ archives for Google Earth products.
//!
//! - [`KmlDocument`]: glider positions, tracks, and draped current overlays
//! - [`KmzArchive`]: zipped document plus its images
//!
//! # Example
//!
//! ```ignore
//! use kml::{Camera, GroundOverlay, KmlDocument, KmzArchive, LatLonBox, ScreenOverlay};
//!
//! let bounds = LatLonBox::new(-20.0, 45.0, -10.0, 52.0)?;
//! let mut doc = KmlDocument::new();
//! doc.set_camera(Camera::above(&bounds));
//! doc.add_ground_overlay(GroundOverlay::new("field.png", bounds));
//! doc.add_screen_overlay(ScreenOverlay::legend("legend.png"));
//!
//! let mut kmz = KmzArchive::new(&doc);
//! kmz.add_file("field.png", field_png)?;
//! kmz.add_file("legend.png", legend_png)?;
//! kmz.write(Path::new("kmz/overlay.kmz"))?;
//! ```

pub mod document;
pub mod error;
pub mod kmz;

pub use document::{
    Camera, Feature, Geometry, GroundOverlay, KmlColor, KmlDocument, LatLonBox, LineStyle,
    Placemark, ScreenOverlay,
};
pub use error::{KmlError, KmlResult};
pub use kmz::{save_kml, KmzArchive, DOC_ENTRY};
