//! Colormaps and value normalisation.
//!
//! The three maps the plots use are reproduced from their usual definitions:
//! `spring` (magenta to yellow) and `summer` (green to yellow) are linear in
//! RGB, `blues` interpolates the nine ColorBrewer stops.

/// RGBA color (not premultiplied).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::new(255, 255, 255, 255);
    pub const BLACK: Color = Color::new(0, 0, 0, 255);
    /// Highlight used for the most recent samples.
    pub const RECENT: Color = Color::new(0xC4, 0x4E, 0x52, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Same color with alpha scaled by `alpha` in `[0, 1]`.
    pub fn with_alpha(self, alpha: f64) -> Self {
        Self {
            a: (alpha.clamp(0.0, 1.0) * 255.0).round() as u8,
            ..self
        }
    }

    pub(crate) fn to_skia(self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba8(self.r, self.g, self.b, self.a)
    }

    fn from_unit(r: f64, g: f64, b: f64) -> Self {
        let c = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::new(c(r), c(g), c(b), 255)
    }
}

/// ColorBrewer "Blues", light to dark.
const BLUES: [(u8, u8, u8); 9] = [
    (0xf7, 0xfb, 0xff),
    (0xde, 0xeb, 0xf7),
    (0xc6, 0xdb, 0xef),
    (0x9e, 0xca, 0xe1),
    (0x6b, 0xae, 0xd6),
    (0x42, 0x92, 0xc6),
    (0x21, 0x71, 0xb5),
    (0x08, 0x51, 0x9c),
    (0x08, 0x30, 0x6b),
];

/// Named continuous colormap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colormap {
    Spring,
    Summer,
    Blues,
}

impl Colormap {
    /// Color at position `t`, clamped to `[0, 1]`. NaN maps to transparent.
    pub fn at(&self, t: f64) -> Color {
        if t.is_nan() {
            return Color::transparent();
        }
        let t = t.clamp(0.0, 1.0);
        match self {
            Colormap::Spring => Color::from_unit(1.0, t, 1.0 - t),
            Colormap::Summer => Color::from_unit(t, 0.5 + 0.5 * t, 0.4),
            Colormap::Blues => interpolate_stops(&BLUES, t),
        }
    }
}

fn interpolate_stops(stops: &[(u8, u8, u8)], t: f64) -> Color {
    let scaled = t * (stops.len() - 1) as f64;
    let lower = (scaled.floor() as usize).min(stops.len() - 2);
    let frac = scaled - lower as f64;
    let (r0, g0, b0) = stops[lower];
    let (r1, g1, b1) = stops[lower + 1];
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
    Color::new(lerp(r0, r1), lerp(g0, g1), lerp(b0, b1), 255)
}

/// Linear mapping of `[vmin, vmax]` onto `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalize {
    pub vmin: f64,
    pub vmax: f64,
}

impl Normalize {
    pub fn new(vmin: f64, vmax: f64) -> Self {
        Self { vmin, vmax }
    }

    /// Normalisation spanning the `lo`..`hi` percentiles of the finite values.
    pub fn from_percentiles(values: &[f64], lo: f64, hi: f64) -> Option<Self> {
        Some(Self::new(percentile(values, lo)?, percentile(values, hi)?))
    }

    /// Position of `value`; values outside the range are not clamped here.
    /// A collapsed range maps everything to 0.
    pub fn apply(&self, value: f64) -> f64 {
        let span = self.vmax - self.vmin;
        if span == 0.0 || !span.is_finite() {
            return 0.0;
        }
        (value - self.vmin) / span
    }
}

/// Percentile `q` (0-100) of the finite values with linear interpolation
/// between order statistics. `None` when no value is finite.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}
