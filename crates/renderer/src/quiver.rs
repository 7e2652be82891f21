//! Speed-coloured arrow plots of a horizontal current field.
//!
//! Arrows are laid out in data units: an arrow for `(u, v)` starts at its
//! grid point and ends `(u / scale, v / scale)` degrees away, so arrows keep
//! their geographic direction whatever the image aspect. The image fills the
//! whole frame with no margins so it can be draped as a ground overlay.

use tiny_skia::Transform;
use tracing::{debug, instrument};

use crate::canvas::{Axes, Canvas};
use crate::colormap::{Color, Colormap, Normalize};
use crate::error::{RenderError, RenderResult};

/// Head length as a multiple of the shaft width.
const HEAD_LENGTH: f32 = 5.0;
/// Distance from tip to the head's inner corners, in shaft widths.
const HEAD_AXIS_LENGTH: f32 = 4.5;
/// Full head width, in shaft widths.
const HEAD_WIDTH: f32 = 3.0;

/// Key arrow anchor, as fractions of the frame.
const KEY_POSITION: (f64, f64) = (0.86, 0.45);

/// Geographic extent of a plot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotExtent {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl PlotExtent {
    /// Smallest extent covering the grid axes.
    pub fn from_axes(lon: &[f64], lat: &[f64]) -> Option<Self> {
        let (west, east) = finite_range(lon)?;
        let (south, north) = finite_range(lat)?;
        Some(Self {
            west,
            south,
            east,
            north,
        })
    }
}

fn finite_range(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Image size whose aspect matches the extent on the ground.
///
/// East-west degrees are shortened by the cosine of the mid latitude. The
/// longer side gets `pixels`.
pub fn figure_size(extent: &PlotExtent, pixels: u32) -> RenderResult<(u32, u32)> {
    let mid_lat = ((extent.south + extent.north) / 2.0).to_radians();
    let x_size = (extent.east - extent.west).abs() * mid_lat.cos();
    let y_size = (extent.north - extent.south).abs();
    if x_size <= 0.0 || y_size <= 0.0 || !(x_size.is_finite() && y_size.is_finite()) {
        return Err(RenderError::InvalidDimensions(format!(
            "extent {:?} has no area",
            extent
        )));
    }

    let aspect = y_size / x_size;
    let long = pixels as f64;
    let (w, h) = if aspect > 1.0 {
        (long / aspect, long)
    } else {
        (long, long * aspect)
    };
    Ok(((w.round() as u32).max(1), (h.round() as u32).max(1)))
}

/// Appearance of a quiver plot.
#[derive(Debug, Clone, PartialEq)]
pub struct QuiverStyle {
    /// Pixels along the longer image side.
    pub pixels: u32,
    /// Speed (m/s) drawn as one degree of arrow length.
    pub scale: f64,
    /// Shaft width as a fraction of the image width.
    pub width: f64,
    pub norm: Normalize,
    pub colormap: Colormap,
    /// Speed of the black reference arrow, if drawn.
    pub key_speed: Option<f64>,
    pub background: Color,
}

impl Default for QuiverStyle {
    fn default() -> Self {
        Self {
            pixels: 2048,
            scale: 2.0,
            width: 0.002,
            norm: Normalize::new(0.0, 0.5),
            colormap: Colormap::Spring,
            key_speed: Some(0.2),
            background: Color::WHITE,
        }
    }
}

/// A `u`/`v` field on a regular grid, row-major `[lat][lon]`.
#[derive(Debug, Clone, Copy)]
pub struct VectorGrid<'a> {
    pub lon: &'a [f64],
    pub lat: &'a [f64],
    pub u: &'a [f64],
    pub v: &'a [f64],
}

impl VectorGrid<'_> {
    fn validate(&self) -> RenderResult<()> {
        let cells = self.lon.len() * self.lat.len();
        if cells == 0 {
            return Err(RenderError::EmptyData("grid has no cells".to_string()));
        }
        if self.u.len() != cells || self.v.len() != cells {
            return Err(RenderError::ShapeMismatch(format!(
                "u has {} and v has {} values for a {}x{} grid",
                self.u.len(),
                self.v.len(),
                self.lat.len(),
                self.lon.len()
            )));
        }
        Ok(())
    }
}

/// Draw one arrow per finite grid cell, coloured by speed.
#[instrument(skip(grid, style), fields(nlat = grid.lat.len(), nlon = grid.lon.len()))]
pub fn render_quiver(grid: &VectorGrid<'_>, style: &QuiverStyle) -> RenderResult<Canvas> {
    grid.validate()?;
    let extent = PlotExtent::from_axes(grid.lon, grid.lat)
        .ok_or_else(|| RenderError::EmptyData("no finite coordinates".to_string()))?;
    let (width, height) = figure_size(&extent, style.pixels)?;

    let mut canvas = Canvas::new(width, height, style.background)?;
    let axes = Axes::new(
        (extent.west, extent.east),
        (extent.south, extent.north),
        (0.0, 0.0, width as f32, height as f32),
    );
    let shaft = (style.width * width as f64) as f32;

    let mut drawn = 0usize;
    for (j, &lat) in grid.lat.iter().enumerate() {
        for (i, &lon) in grid.lon.iter().enumerate() {
            let idx = j * grid.lon.len() + i;
            let (u, v) = (grid.u[idx], grid.v[idx]);
            if !(u.is_finite() && v.is_finite()) {
                continue;
            }
            let color = style.colormap.at(style.norm.apply(u.hypot(v)));
            draw_arrow(&mut canvas, &axes, (lon, lat), (u, v), style.scale, shaft, color);
            drawn += 1;
        }
    }

    if let Some(speed) = style.key_speed {
        let (fx, fy) = KEY_POSITION;
        let (px, py) = axes.fraction_to_pixel(fx, fy);
        let length = (speed / style.scale * axes.scale().0) as f32;
        fill_arrow(&mut canvas, px, py, length, 0.0, shaft, Color::BLACK);
    }

    debug!(width, height, arrows = drawn, "Rendered quiver");
    Ok(canvas)
}

fn draw_arrow(
    canvas: &mut Canvas,
    axes: &Axes,
    (x, y): (f64, f64),
    (u, v): (f64, f64),
    scale: f64,
    shaft: f32,
    color: Color,
) {
    let (x0, y0) = axes.to_pixel(x, y);
    let (x1, y1) = axes.to_pixel(x + u / scale, y + v / scale);
    let (dx, dy) = (x1 - x0, y1 - y0);
    let length = dx.hypot(dy);
    fill_arrow(canvas, x0, y0, length, dy.atan2(dx).to_degrees(), shaft, color);
}

/// Fill an arrow with its tail at `(x, y)` pointing `angle` degrees
/// clockwise from the +x pixel axis. Arrows shorter than the shaft width
/// become dots; short arrows get a proportionally smaller head.
fn fill_arrow(canvas: &mut Canvas, x: f32, y: f32, length: f32, angle: f32, shaft: f32, color: Color) {
    if length < shaft {
        canvas.fill_circle(x, y, shaft / 2.0, color);
        return;
    }
    let points = arrow_outline(length, shaft);
    let transform = Transform::from_rotate(angle).post_translate(x, y);
    canvas.fill_polygon(&points, color, transform);
}

/// Arrow outline along +x with the tail at the origin.
fn arrow_outline(length: f32, shaft: f32) -> Vec<(f32, f32)> {
    let shrink = (length / (HEAD_LENGTH * shaft)).min(1.0);
    let head_length = HEAD_LENGTH * shaft * shrink;
    let head_axis = HEAD_AXIS_LENGTH * shaft * shrink;
    let head_half = HEAD_WIDTH * shaft * shrink / 2.0;
    let half = shaft / 2.0;

    vec![
        (0.0, -half),
        (length - head_axis, -half),
        (length - head_length, -head_half),
        (length, 0.0),
        (length - head_length, head_half),
        (length - head_axis, half),
        (0.0, half),
    ]
}
