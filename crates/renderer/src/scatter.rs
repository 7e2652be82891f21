//! Scatter panels for glider time series.
//!
//! Two figures are produced from the same table:
//! - a **transect**, one panel per variable, time on x and depth on y,
//!   points coloured by the variable (`summer`, 1st to 99th percentile);
//! - a **variables-against-depth** grid, three panels per row, points
//!   coloured by time (`blues`) with the last two hours drawn on top in red.
//!
//! Panels carry no text; colour scales are drawn as bars next to the data.

use tracing::{debug, instrument};

use crate::canvas::{Axes, Canvas};
use crate::colorbar::draw_gradient;
use crate::colormap::{percentile, Color, Colormap, Normalize};
use crate::error::{RenderError, RenderResult};

/// Axes background of the panel theme.
pub const PANEL_BACKGROUND: Color = Color::new(0xEA, 0xEA, 0xF2, 255);

/// Samples newer than this, relative to the last one, are highlighted.
pub const RECENT_WINDOW_HOURS: f64 = 2.0;

const GRID_COLUMNS: usize = 3;
const MS_PER_HOUR: f64 = 3_600_000.0;

/// One named column of values aligned with the time and depth columns.
#[derive(Debug, Clone, Copy)]
pub struct Series<'a> {
    pub name: &'a str,
    pub values: &'a [f64],
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterStyle {
    /// Pixels per figure inch.
    pub dpi: f64,
    pub point_radius: f32,
    pub background: Color,
}

impl Default for ScatterStyle {
    fn default() -> Self {
        Self {
            dpi: 60.0,
            point_radius: 2.0,
            background: Color::WHITE,
        }
    }
}

/// Time/depth/value columns shared by both figures.
#[derive(Debug, Clone, Copy)]
pub struct ProfileTable<'a> {
    /// Milliseconds since the Unix epoch.
    pub time_ms: &'a [f64],
    /// Depth in metres, negative below the surface.
    pub depth: &'a [f64],
    pub series: &'a [Series<'a>],
}

impl ProfileTable<'_> {
    fn validate(&self) -> RenderResult<()> {
        if self.series.is_empty() || self.time_ms.is_empty() {
            return Err(RenderError::EmptyData("no variables or rows to plot".to_string()));
        }
        let rows = self.time_ms.len();
        if self.depth.len() != rows {
            return Err(RenderError::ShapeMismatch(format!(
                "{} depths for {} rows",
                self.depth.len(),
                rows
            )));
        }
        if let Some(bad) = self.series.iter().find(|s| s.values.len() != rows) {
            return Err(RenderError::ShapeMismatch(format!(
                "'{}' has {} values for {} rows",
                bad.name,
                bad.values.len(),
                rows
            )));
        }
        Ok(())
    }
}

/// One panel per variable, stacked vertically (15 x 5 inches each).
#[instrument(skip(table, style), fields(variables = table.series.len(), rows = table.time_ms.len()))]
pub fn render_transect(table: &ProfileTable<'_>, style: &ScatterStyle) -> RenderResult<Canvas> {
    table.validate()?;
    let panel_w = (15.0 * style.dpi).round() as u32;
    let panel_h = (5.0 * style.dpi).round() as u32;
    let mut canvas = Canvas::new(panel_w, panel_h * table.series.len() as u32, style.background)?;

    let time_range = range_of(table.time_ms);
    let depth_range = range_of(table.depth);
    let (pw, ph) = (panel_w as f32, panel_h as f32);

    for (row, series) in table.series.iter().enumerate() {
        let top = row as f32 * ph;
        let frame = (0.06 * pw, top + 0.08 * ph, 0.80 * pw, 0.82 * ph);
        canvas.fill_rect(frame.0, frame.1, frame.2, frame.3, PANEL_BACKGROUND);
        let axes = Axes::new(time_range, depth_range, frame);

        // Percentiles over the finite values; a constant column gets a flat colour
        let norm = Normalize::from_percentiles(series.values, 1.0, 99.0)
            .unwrap_or(Normalize::new(0.0, 1.0));
        for i in 0..series.values.len() {
            let (t, z, value) = (table.time_ms[i], table.depth[i], series.values[i]);
            if !(t.is_finite() && z.is_finite() && value.is_finite()) {
                continue;
            }
            let (x, y) = axes.to_pixel(t, z);
            canvas.fill_circle(x, y, style.point_radius, Colormap::Summer.at(norm.apply(value)));
        }

        draw_gradient(
            &mut canvas,
            (0.87 * pw, frame.1, 0.015 * pw, frame.3),
            Colormap::Summer,
            true,
        );
    }

    debug!(
        width = canvas.width(),
        height = canvas.height(),
        "Rendered transect"
    );
    Ok(canvas)
}

/// Value-against-depth panels, three per row (5 x 5 inches each), with a
/// horizontal time colour bar and a red marker for recent samples beneath.
#[instrument(skip(table, style), fields(variables = table.series.len(), rows = table.time_ms.len()))]
pub fn render_vars_against_depth(
    table: &ProfileTable<'_>,
    style: &ScatterStyle,
) -> RenderResult<Canvas> {
    table.validate()?;
    let rows = table.series.len().div_ceil(GRID_COLUMNS);
    let fig_w = (15.0 * style.dpi).round() as u32;
    let fig_h = (5.0 * rows as f64 * style.dpi).round() as u32;
    let mut canvas = Canvas::new(fig_w, fig_h, style.background)?;
    let layout = GridLayout::new(rows, fig_w as f32, fig_h as f32);

    let time_norm = {
        let (lo, hi) = range_of(table.time_ms);
        Normalize::new(lo, hi)
    };
    let last = table
        .time_ms
        .iter()
        .copied()
        .filter(|t| t.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    let depth_range = range_of(table.depth);

    for (index, series) in table.series.iter().enumerate() {
        let frame = layout.panel(index / GRID_COLUMNS, index % GRID_COLUMNS);
        canvas.fill_rect(frame.0, frame.1, frame.2, frame.3, PANEL_BACKGROUND);
        let axes = Axes::new(padded_limits(series.values), depth_range, frame);

        let mut recent = Vec::new();
        for i in 0..series.values.len() {
            let (t, z, value) = (table.time_ms[i], table.depth[i], series.values[i]);
            if !(t.is_finite() && z.is_finite() && value.is_finite()) {
                continue;
            }
            let (x, y) = axes.to_pixel(value, z);
            if !inside(frame, x, y) {
                continue;
            }
            if (last - t) / MS_PER_HOUR < RECENT_WINDOW_HOURS {
                recent.push((x, y));
            }
            let color = Colormap::Blues.at(time_norm.apply(t)).with_alpha(0.5);
            canvas.fill_circle(x, y, style.point_radius, color);
        }
        for (x, y) in recent {
            canvas.fill_circle(x, y, style.point_radius * 1.4, Color::RECENT);
        }
    }

    let bar = layout.colorbar();
    draw_gradient(&mut canvas, bar, Colormap::Blues, false);
    canvas.stroke_rect(bar.0, bar.1, bar.2, bar.3, 1.0, Color::BLACK);
    let (mx, my) = (bar.0 + 0.03 * fig_w as f32, bar.1 + bar.3 + 0.03 * fig_h as f32);
    canvas.fill_circle(mx, my, 0.005 * fig_w as f32, Color::RECENT);

    debug!(
        width = canvas.width(),
        height = canvas.height(),
        panels = table.series.len(),
        "Rendered variables against depth"
    );
    Ok(canvas)
}

/// Axis limits from the 1st and 99th percentiles padded by 20% of their span.
pub fn padded_limits(values: &[f64]) -> (f64, f64) {
    match (percentile(values, 1.0), percentile(values, 99.0)) {
        (Some(lo), Some(hi)) => {
            let pad = 0.2 * (hi - lo);
            (lo - pad, hi + pad)
        }
        _ => (0.0, 1.0),
    }
}

fn range_of(values: &[f64]) -> (f64, f64) {
    let (lo, hi) = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if lo.is_finite() {
        (lo, hi)
    } else {
        (0.0, 1.0)
    }
}

fn inside((left, top, w, h): (f32, f32, f32, f32), x: f32, y: f32) -> bool {
    x >= left && x <= left + w && y >= top && y <= top + h
}

/// Panel frames for the variables-against-depth grid, in pixels.
///
/// Margins are fractions of the figure: 7.5% left, 2.5% right, 5% top and
/// `0.4 / rows` at the bottom. Gaps are 30% of a panel width between
/// columns and 20% of a panel height between rows.
struct GridLayout {
    width: f32,
    height: f32,
    left: f32,
    top: f32,
    bottom: f32,
    panel_w: f32,
    panel_h: f32,
}

impl GridLayout {
    fn new(rows: usize, width: f32, height: f32) -> Self {
        let (left, right, top) = (0.075, 0.975, 0.95);
        let bottom = 0.4 / rows as f32;
        let cols = GRID_COLUMNS as f32;
        let panel_w = (right - left) / (cols + 0.3 * (cols - 1.0));
        let panel_h = (top - bottom) / (rows as f32 + 0.2 * (rows as f32 - 1.0));
        Self {
            width,
            height,
            left,
            top,
            bottom,
            panel_w,
            panel_h,
        }
    }

    fn panel(&self, row: usize, col: usize) -> (f32, f32, f32, f32) {
        let x0 = self.left + col as f32 * self.panel_w * 1.3;
        let y_top = self.top - row as f32 * self.panel_h * 1.2;
        (
            x0 * self.width,
            (1.0 - y_top) * self.height,
            self.panel_w * self.width,
            self.panel_h * self.height,
        )
    }

    /// Horizontal bar under the last row, spanning all columns.
    fn colorbar(&self) -> (f32, f32, f32, f32) {
        let bar_h = self.panel_h * 0.1;
        let b = self.bottom - 3.0 * bar_h;
        let span = self.panel_w * (GRID_COLUMNS as f32 + 0.3 * (GRID_COLUMNS as f32 - 1.0));
        (
            self.left * self.width,
            (1.0 - b - bar_h) * self.height,
            span * self.width,
            bar_h * self.height,
        )
    }
}
