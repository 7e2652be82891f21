//! KML document model and serializer.
//!
//! Covers the subset used for glider and current products: named points with
//! a description, styled line strings, ground overlays draped over a lat/lon
//! box, a screen overlay legend, and a document camera.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use quick_xml::escape::escape;

use crate::error::{KmlError, KmlResult};

/// KML colour in `aabbggrr` hex order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KmlColor(pub u32);

impl KmlColor {
    /// Opaque red.
    pub const RED: KmlColor = KmlColor(0xff0000ff);
    /// White at 62% opacity, the usual tint for draped images.
    pub const OVERLAY_TINT: KmlColor = KmlColor(0x9effffff);
}

impl FromStr for KmlColor {
    type Err = KmlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 8 {
            return Err(KmlError::InvalidColor(s.to_string()));
        }
        u32::from_str_radix(hex, 16)
            .map(KmlColor)
            .map_err(|_| KmlError::InvalidColor(s.to_string()))
    }
}

impl fmt::Display for KmlColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// `(lon, lat)`
    Point(f64, f64),
    /// `(lon, lat)` vertices in order.
    LineString(Vec<(f64, f64)>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineStyle {
    pub color: KmlColor,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placemark {
    pub name: String,
    pub description: Option<String>,
    pub geometry: Geometry,
    pub line_style: Option<LineStyle>,
}

impl Placemark {
    pub fn point(name: impl Into<String>, lon: f64, lat: f64) -> Self {
        Self {
            name: name.into(),
            description: None,
            geometry: Geometry::Point(lon, lat),
            line_style: None,
        }
    }

    pub fn line(name: impl Into<String>, coords: Vec<(f64, f64)>, style: LineStyle) -> Self {
        Self {
            name: name.into(),
            description: None,
            geometry: Geometry::LineString(coords),
            line_style: Some(style),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Geographic box in degrees; `west`/`east` are the minimum/maximum longitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLonBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl LatLonBox {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> KmlResult<Self> {
        let all_finite = [west, south, east, north].iter().all(|v| v.is_finite());
        if !all_finite || west > east || south > north {
            return Err(KmlError::InvalidGeometry(format!(
                "box west={} south={} east={} north={}",
                west, south, east, north
            )));
        }
        Ok(Self {
            north,
            south,
            east,
            west,
        })
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.west + self.east) / 2.0, (self.south + self.north) / 2.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroundOverlay {
    pub name: String,
    pub description: String,
    pub href: String,
    pub bounds: LatLonBox,
    pub color: KmlColor,
    pub draw_order: u32,
}

impl GroundOverlay {
    pub fn new(href: impl Into<String>, bounds: LatLonBox) -> Self {
        Self {
            name: "overlay".to_string(),
            description: "Current field".to_string(),
            href: href.into(),
            bounds,
            color: KmlColor::OVERLAY_TINT,
            draw_order: 1,
        }
    }
}

/// Legend pinned near the lower-left corner of the screen at native size.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenOverlay {
    pub name: String,
    pub href: String,
    pub overlay_xy: (f64, f64),
    pub screen_xy: (f64, f64),
    pub rotation_xy: (f64, f64),
    pub size: (f64, f64),
}

impl ScreenOverlay {
    pub fn legend(href: impl Into<String>) -> Self {
        Self {
            name: "ScreenOverlay".to_string(),
            href: href.into(),
            overlay_xy: (0.0, 0.0),
            screen_xy: (0.015, 0.075),
            rotation_xy: (0.5, 0.5),
            size: (0.0, 0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub longitude: f64,
    pub latitude: f64,
    pub altitude: f64,
    pub roll: f64,
    pub tilt: f64,
}

impl Camera {
    /// Looking straight down on `bounds` from 20 000 km.
    pub fn above(bounds: &LatLonBox) -> Self {
        let (longitude, latitude) = bounds.center();
        Self {
            longitude,
            latitude,
            altitude: 2e7,
            roll: 0.0,
            tilt: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Feature {
    Placemark(Placemark),
    GroundOverlay(GroundOverlay),
    ScreenOverlay(ScreenOverlay),
}

/// A KML `<Document>`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KmlDocument {
    pub name: Option<String>,
    pub camera: Option<Camera>,
    pub features: Vec<Feature>,
}

impl KmlDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = Some(camera);
    }

    pub fn add_placemark(&mut self, placemark: Placemark) {
        self.features.push(Feature::Placemark(placemark));
    }

    pub fn add_ground_overlay(&mut self, overlay: GroundOverlay) {
        self.features.push(Feature::GroundOverlay(overlay));
    }

    pub fn add_screen_overlay(&mut self, overlay: ScreenOverlay) {
        self.features.push(Feature::ScreenOverlay(overlay));
    }

    /// Image paths referenced by overlays, in document order.
    pub fn referenced_images(&self) -> Vec<&str> {
        self.features
            .iter()
            .filter_map(|f| match f {
                Feature::GroundOverlay(g) => Some(g.href.as_str()),
                Feature::ScreenOverlay(s) => Some(s.href.as_str()),
                Feature::Placemark(_) => None,
            })
            .collect()
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::new();

        xml.push_str(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2" xmlns:gx="http://www.google.com/kml/ext/2.2">
  <Document>
"#,
        );

        if let Some(name) = &self.name {
            xml.push_str(&format!("    <name>{}</name>\n", text(name)));
        }

        if let Some(camera) = &self.camera {
            xml.push_str(&format!(
                r#"    <Camera>
      <longitude>{}</longitude>
      <latitude>{}</latitude>
      <altitude>{}</altitude>
      <roll>{}</roll>
      <tilt>{}</tilt>
      <altitudeMode>relativeToGround</altitudeMode>
    </Camera>
"#,
                camera.longitude, camera.latitude, camera.altitude, camera.roll, camera.tilt
            ));
        }

        for feature in &self.features {
            match feature {
                Feature::Placemark(p) => write_placemark(&mut xml, p),
                Feature::GroundOverlay(g) => write_ground_overlay(&mut xml, g),
                Feature::ScreenOverlay(s) => write_screen_overlay(&mut xml, s),
            }
        }

        xml.push_str("  </Document>\n</kml>\n");
        xml
    }
}

fn text(s: &str) -> Cow<'_, str> {
    escape(s)
}

fn write_placemark(xml: &mut String, p: &Placemark) {
    xml.push_str("    <Placemark>\n");
    xml.push_str(&format!("      <name>{}</name>\n", text(&p.name)));
    if let Some(description) = &p.description {
        xml.push_str(&format!(
            "      <description>{}</description>\n",
            text(description)
        ));
    }
    if let Some(style) = &p.line_style {
        xml.push_str(&format!(
            r#"      <Style>
        <LineStyle>
          <color>{}</color>
          <width>{}</width>
        </LineStyle>
      </Style>
"#,
            style.color, style.width
        ));
    }
    match &p.geometry {
        Geometry::Point(lon, lat) => {
            xml.push_str(&format!(
                "      <Point>\n        <coordinates>{},{},0</coordinates>\n      </Point>\n",
                lon, lat
            ));
        }
        Geometry::LineString(coords) => {
            let joined = coords
                .iter()
                .map(|(lon, lat)| format!("{},{},0", lon, lat))
                .collect::<Vec<_>>()
                .join(" ");
            xml.push_str(&format!(
                "      <LineString>\n        <coordinates>{}</coordinates>\n      </LineString>\n",
                joined
            ));
        }
    }
    xml.push_str("    </Placemark>\n");
}

fn write_ground_overlay(xml: &mut String, g: &GroundOverlay) {
    xml.push_str(&format!(
        r#"    <GroundOverlay>
      <name>{}</name>
      <description>{}</description>
      <visibility>1</visibility>
      <color>{}</color>
      <drawOrder>{}</drawOrder>
      <Icon>
        <href>{}</href>
      </Icon>
      <gx:altitudeMode>clampToSeaFloor</gx:altitudeMode>
      <LatLonBox>
        <north>{}</north>
        <south>{}</south>
        <east>{}</east>
        <west>{}</west>
        <rotation>0</rotation>
      </LatLonBox>
    </GroundOverlay>
"#,
        text(&g.name),
        text(&g.description),
        g.color,
        g.draw_order,
        text(&g.href),
        g.bounds.north,
        g.bounds.south,
        g.bounds.east,
        g.bounds.west
    ));
}

fn write_screen_overlay(xml: &mut String, s: &ScreenOverlay) {
    let xy = |tag: &str, (x, y): (f64, f64)| {
        format!(
            "      <{} x=\"{}\" y=\"{}\" xunits=\"fraction\" yunits=\"fraction\"/>\n",
            tag, x, y
        )
    };
    xml.push_str("    <ScreenOverlay>\n");
    xml.push_str(&format!("      <name>{}</name>\n", text(&s.name)));
    xml.push_str("      <visibility>1</visibility>\n");
    xml.push_str(&format!(
        "      <Icon>\n        <href>{}</href>\n      </Icon>\n",
        text(&s.href)
    ));
    xml.push_str(&xy("overlayXY", s.overlay_xy));
    xml.push_str(&xy("screenXY", s.screen_xy));
    xml.push_str(&xy("rotationXY", s.rotation_xy));
    xml.push_str(&xy("size", s.size));
    xml.push_str("    </ScreenOverlay>\n");
}
