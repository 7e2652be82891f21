//! Plot rendering for current overlays and glider time series.
//!
//! Produces PNG images with no text:
//! - Quiver plots of daily mean currents, sized to drape over a map
//! - Colorbar legends for the quiver colour scale
//! - Scatter panels (transects and variables against depth)
//!
//! Drawing uses `tiny-skia`; encoding is a small PNG writer that emits
//! indexed images when the palette allows.

pub mod canvas;
pub mod colorbar;
pub mod colormap;
pub mod error;
pub mod png;
pub mod quiver;
pub mod scatter;

pub use canvas::{Axes, Canvas};
pub use colorbar::{linear_ticks, render_colorbar, ColorbarStyle};
pub use colormap::{percentile, Color, Colormap, Normalize};
pub use error::{RenderError, RenderResult};
pub use quiver::{figure_size, render_quiver, PlotExtent, QuiverStyle, VectorGrid};
pub use scatter::{
    padded_limits, render_transect, render_vars_against_depth, ProfileTable, ScatterStyle, Series,
};
