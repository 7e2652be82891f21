//! Drawing surface and data-to-pixel mapping.

use std::path::Path;

use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Rect, Stroke, Transform};
use tracing::debug;

use crate::colormap::Color;
use crate::error::{RenderError, RenderResult};
use crate::png::encode_pixmap;

/// Maps data coordinates into a pixel rectangle. The y axis points up in
/// data space and down in pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Axes {
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    /// `(left, top, width, height)` in pixels.
    pub frame: (f32, f32, f32, f32),
}

impl Axes {
    pub fn new(x_range: (f64, f64), y_range: (f64, f64), frame: (f32, f32, f32, f32)) -> Self {
        Self {
            x_range,
            y_range,
            frame,
        }
    }

    /// Pixels per data unit along x and y.
    pub fn scale(&self) -> (f64, f64) {
        let (_, _, w, h) = self.frame;
        (
            w as f64 / span(self.x_range),
            h as f64 / span(self.y_range),
        )
    }

    pub fn to_pixel(&self, x: f64, y: f64) -> (f32, f32) {
        let (left, top, _, h) = self.frame;
        let (sx, sy) = self.scale();
        let px = left as f64 + (x - self.x_range.0) * sx;
        let py = top as f64 + h as f64 - (y - self.y_range.0) * sy;
        (px as f32, py as f32)
    }

    /// Pixel position of a point given as fractions of the frame.
    pub fn fraction_to_pixel(&self, fx: f64, fy: f64) -> (f32, f32) {
        let (left, top, w, h) = self.frame;
        (
            left + (fx as f32) * w,
            top + h - (fy as f32) * h,
        )
    }
}

/// Width of a range, never zero so degenerate axes still map.
fn span((lo, hi): (f64, f64)) -> f64 {
    let s = hi - lo;
    if s.abs() < f64::EPSILON {
        1.0
    } else {
        s
    }
}

/// An RGBA raster with a few filled and stroked primitives.
pub struct Canvas {
    pixmap: Pixmap,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: Color) -> RenderResult<Self> {
        let mut pixmap = Pixmap::new(width, height)
            .ok_or_else(|| RenderError::InvalidDimensions(format!("{}x{}", width, height)))?;
        pixmap.fill(background.to_skia());
        Ok(Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Color of one pixel, un-premultiplied.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        self.pixmap.pixel(x, y).map(|p| {
            let c = p.demultiply();
            Color::new(c.red(), c.green(), c.blue(), c.alpha())
        })
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        if let Some(rect) = Rect::from_xywh(x, y, w, h) {
            self.pixmap
                .fill_rect(rect, &paint(color), Transform::identity(), None);
        }
    }

    pub fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, color: Color) {
        if let Some(path) = PathBuilder::from_circle(cx, cy, radius) {
            self.pixmap.fill_path(
                &path,
                &paint(color),
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }
    }

    /// Fill a closed polygon given in a local frame, placed by `transform`.
    pub fn fill_polygon(&mut self, points: &[(f32, f32)], color: Color, transform: Transform) {
        let Some(path) = polygon(points, true) else {
            return;
        };
        self.pixmap
            .fill_path(&path, &paint(color), FillRule::Winding, transform, None);
    }

    pub fn stroke_polyline(&mut self, points: &[(f32, f32)], width: f32, color: Color) {
        let Some(path) = polygon(points, false) else {
            return;
        };
        let stroke = Stroke {
            width,
            ..Stroke::default()
        };
        self.pixmap
            .stroke_path(&path, &paint(color), &stroke, Transform::identity(), None);
    }

    pub fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, width: f32, color: Color) {
        self.stroke_polyline(
            &[(x, y), (x + w, y), (x + w, y + h), (x, y + h), (x, y)],
            width,
            color,
        );
    }

    pub fn encode_png(&self) -> RenderResult<Vec<u8>> {
        encode_pixmap(&self.pixmap)
    }

    pub fn save_png(&self, path: &Path) -> RenderResult<()> {
        let bytes = self.encode_png()?;
        std::fs::write(path, &bytes)?;
        debug!(
            path = %path.display(),
            width = self.width(),
            height = self.height(),
            bytes = bytes.len(),
            "Wrote PNG"
        );
        Ok(())
    }
}

fn paint(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color.to_skia());
    paint.anti_alias = true;
    paint
}

fn polygon(points: &[(f32, f32)], close: bool) -> Option<tiny_skia::Path> {
    let (first, rest) = points.split_first()?;
    let mut pb = PathBuilder::new();
    pb.move_to(first.0, first.1);
    for &(x, y) in rest {
        pb.line_to(x, y);
    }
    if close {
        pb.close();
    }
    pb.finish()
}
