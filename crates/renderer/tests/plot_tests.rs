//! Rendering tests for quiver, colorbar and scatter figures.

use renderer::{
    render_quiver, render_transect, render_vars_against_depth, Canvas, Color, ProfileTable,
    QuiverStyle, RenderError, ScatterStyle, Series, VectorGrid,
};

fn count_pixels(canvas: &Canvas, want: Color) -> usize {
    let mut n = 0;
    for y in 0..canvas.height() {
        for x in 0..canvas.width() {
            if canvas.pixel(x, y) == Some(want) {
                n += 1;
            }
        }
    }
    n
}

fn style(pixels: u32) -> QuiverStyle {
    QuiverStyle {
        pixels,
        width: 0.02,
        key_speed: None,
        ..QuiverStyle::default()
    }
}

// ============================================================================
// Quiver
// ============================================================================

#[test]
fn test_quiver_draws_eastward_arrow() {
    let lon = [0.0, 1.0, 2.0];
    let lat = [0.0, 1.0, 2.0];
    let u = [0.5; 9];
    let v = [0.0; 9];
    let grid = VectorGrid {
        lon: &lon,
        lat: &lat,
        u: &u,
        v: &v,
    };

    let canvas = render_quiver(&grid, &style(300)).unwrap();

    assert_eq!((canvas.width(), canvas.height()), (300, 300));
    // Centre arrow: tail at (150, 150), 0.25 degrees = 37.5 px long.
    // Speed 0.5 saturates the scale: yellow.
    assert_eq!(canvas.pixel(165, 150), Some(Color::new(255, 255, 0, 255)));
    assert_eq!(canvas.pixel(140, 150), Some(Color::WHITE));
    assert_eq!(canvas.pixel(150, 130), Some(Color::WHITE));
}

#[test]
fn test_quiver_colour_tracks_speed() {
    let lon = [0.0, 2.0];
    let lat = [0.0, 2.0];
    // Only the south-west cell has a slow current
    let u = [0.0, f64::NAN, f64::NAN, f64::NAN];
    let v = [0.25, f64::NAN, f64::NAN, f64::NAN];
    let grid = VectorGrid {
        lon: &lon,
        lat: &lat,
        u: &u,
        v: &v,
    };

    let canvas = render_quiver(&grid, &style(200)).unwrap();
    // Points north from the bottom-left corner, 12.5 px long with a
    // shrunken head; half of full scale is (255, 128, 128) in spring
    assert_eq!(canvas.pixel(0, 195), Some(Color::new(255, 128, 128, 255)));
    assert_eq!(canvas.pixel(10, 195), Some(Color::WHITE));
}

#[test]
fn test_quiver_all_missing_is_blank() {
    let lon = [10.0, 11.0];
    let lat = [50.0, 51.0];
    let nan = [f64::NAN; 4];
    let grid = VectorGrid {
        lon: &lon,
        lat: &lat,
        u: &nan,
        v: &nan,
    };
    let canvas = render_quiver(&grid, &style(100)).unwrap();
    assert_eq!(
        count_pixels(&canvas, Color::WHITE) as u32,
        canvas.width() * canvas.height()
    );
}

#[test]
fn test_quiver_key_is_black() {
    let lon = [10.0, 11.0];
    let lat = [50.0, 51.0];
    let nan = [f64::NAN; 4];
    let grid = VectorGrid {
        lon: &lon,
        lat: &lat,
        u: &nan,
        v: &nan,
    };
    let with_key = QuiverStyle {
        key_speed: Some(0.2),
        ..style(200)
    };
    let canvas = render_quiver(&grid, &with_key).unwrap();
    assert!(count_pixels(&canvas, Color::BLACK) > 0);
}

#[test]
fn test_quiver_shape_mismatch() {
    let grid = VectorGrid {
        lon: &[0.0, 1.0],
        lat: &[0.0, 1.0],
        u: &[0.1; 3],
        v: &[0.1; 4],
    };
    assert!(matches!(
        render_quiver(&grid, &QuiverStyle::default()),
        Err(RenderError::ShapeMismatch(_))
    ));
}

#[test]
fn test_quiver_single_point_has_no_extent() {
    let grid = VectorGrid {
        lon: &[0.0],
        lat: &[0.0],
        u: &[0.1],
        v: &[0.1],
    };
    assert!(matches!(
        render_quiver(&grid, &QuiverStyle::default()),
        Err(RenderError::InvalidDimensions(_))
    ));
}

// ============================================================================
// Scatter panels
// ============================================================================

fn hourly(n: usize) -> Vec<f64> {
    (0..n).map(|i| 1.7e12 + i as f64 * 3_600_000.0).collect()
}

fn small() -> ScatterStyle {
    ScatterStyle {
        dpi: 20.0,
        ..ScatterStyle::default()
    }
}

#[test]
fn test_transect_stacks_panels() {
    let time = hourly(50);
    let depth: Vec<f64> = (0..50).map(|i| -(i as f64) * 10.0).collect();
    let temp: Vec<f64> = (0..50).map(|i| 12.0 - i as f64 * 0.1).collect();
    let salt = vec![35.2; 50];
    let series = [
        Series {
            name: "sci_water_temp",
            values: &temp,
        },
        Series {
            name: "sci_water_sal",
            values: &salt,
        },
    ];
    let table = ProfileTable {
        time_ms: &time,
        depth: &depth,
        series: &series,
    };

    let canvas = render_transect(&table, &small()).unwrap();
    assert_eq!((canvas.width(), canvas.height()), (300, 200));
}

#[test]
fn test_vars_against_depth_grid_and_recent_marker() {
    let time = hourly(40);
    let depth: Vec<f64> = (0..40).map(|i| -(i as f64)).collect();
    let columns: Vec<Vec<f64>> = (1..=4)
        .map(|k| (0..40).map(|i| (i * k) as f64).collect())
        .collect();
    let series: Vec<Series> = columns
        .iter()
        .map(|values| Series {
            name: "var",
            values,
        })
        .collect();
    let table = ProfileTable {
        time_ms: &time,
        depth: &depth,
        series: &series,
    };

    let canvas = render_vars_against_depth(&table, &small()).unwrap();
    // Four panels need two rows of three
    assert_eq!((canvas.width(), canvas.height()), (300, 200));
    assert!(count_pixels(&canvas, Color::RECENT) > 0);
}

#[test]
fn test_scatter_rejects_ragged_columns() {
    let time = hourly(3);
    let series = [Series {
        name: "x",
        values: &[1.0, 2.0],
    }];
    let table = ProfileTable {
        time_ms: &time,
        depth: &[0.0, -1.0, -2.0],
        series: &series,
    };
    assert!(matches!(
        render_transect(&table, &small()),
        Err(RenderError::ShapeMismatch(_))
    ));
}

#[test]
fn test_scatter_requires_variables() {
    let time = hourly(3);
    let table = ProfileTable {
        time_ms: &time,
        depth: &[0.0, -1.0, -2.0],
        series: &[],
    };
    assert!(matches!(
        render_vars_against_depth(&table, &small()),
        Err(RenderError::EmptyData(_))
    ));
}
