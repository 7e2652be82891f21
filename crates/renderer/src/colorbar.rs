//! Vertical colorbar legend for the screen overlay.

use tracing::instrument;

use crate::canvas::Canvas;
use crate::colormap::{Color, Colormap, Normalize};
use crate::error::{RenderError, RenderResult};

/// Bar placement as `(left, bottom, width, height)` fractions of the image.
const BAR_FRAME: (f32, f32, f32, f32) = (0.0, 0.05, 0.2, 0.9);
const TICK_LENGTH: f32 = 0.35;

#[derive(Debug, Clone, PartialEq)]
pub struct ColorbarStyle {
    pub width: u32,
    pub height: u32,
    pub colormap: Colormap,
    pub norm: Normalize,
    /// Values marked with a tick on the bar's right edge.
    pub ticks: Vec<f64>,
    pub background: Color,
}

impl ColorbarStyle {
    /// A 100x400 legend with six evenly spaced ticks.
    pub fn new(colormap: Colormap, norm: Normalize) -> Self {
        Self {
            width: 100,
            height: 400,
            colormap,
            norm,
            ticks: linear_ticks(norm.vmin, norm.vmax, 6),
            background: Color::WHITE,
        }
    }
}

/// `count` evenly spaced values from `lo` to `hi` inclusive.
pub fn linear_ticks(lo: f64, hi: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![lo],
        n => (0..n)
            .map(|i| lo + (hi - lo) * i as f64 / (n - 1) as f64)
            .collect(),
    }
}

/// Draw the gradient bar, its outline and tick marks.
#[instrument(skip(style), fields(width = style.width, height = style.height))]
pub fn render_colorbar(style: &ColorbarStyle) -> RenderResult<Canvas> {
    let mut canvas = Canvas::new(style.width, style.height, style.background)?;
    let (w, h) = (style.width as f32, style.height as f32);
    let (fl, fb, fw, fh) = BAR_FRAME;
    let left = fl * w;
    let bar_w = (fw * w).max(1.0);
    let bar_h = (fh * h).round();
    let top = h - fb * h - bar_h;
    if bar_h < 1.0 {
        return Err(RenderError::InvalidDimensions(format!(
            "{}x{} leaves no room for the bar",
            style.width, style.height
        )));
    }

    draw_gradient(&mut canvas, (left, top, bar_w, bar_h), style.colormap, true);

    canvas.stroke_rect(left, top, bar_w, bar_h, 1.0, Color::BLACK);
    for &tick in &style.ticks {
        let t = style.norm.apply(tick);
        if !(0.0..=1.0).contains(&t) {
            continue;
        }
        let y = top + bar_h - (t as f32) * bar_h;
        let x = left + bar_w;
        canvas.stroke_polyline(&[(x, y), (x + TICK_LENGTH * bar_w, y)], 1.0, Color::BLACK);
    }

    Ok(canvas)
}

/// Fill `frame` with the colormap, low values at the bottom (vertical) or
/// the left (horizontal).
pub(crate) fn draw_gradient(
    canvas: &mut Canvas,
    (left, top, width, height): (f32, f32, f32, f32),
    colormap: Colormap,
    vertical: bool,
) {
    let steps = if vertical { height } else { width }.max(1.0) as u32;
    for step in 0..steps {
        let color = colormap.at((step as f64 + 0.5) / steps as f64);
        let s = step as f32;
        if vertical {
            canvas.fill_rect(left, top + height - s - 1.0, width, 1.0, color);
        } else {
            canvas.fill_rect(left + s, top, 1.0, height, color);
        }
    }
}
