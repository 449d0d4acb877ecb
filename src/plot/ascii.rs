//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output
//!
//! Plot elements:
//! - samples along axis 0 through the fitted center: `o`
//! - fitted profile: `-` line

use ndarray::ArrayViewD;

use crate::domain::{CoordinateGrid, GaussianParams};
use crate::models::evaluate_point;

/// Render the 1D profile through `params.center` along axis 0.
///
/// Higher dimensions are cut at the samples nearest to the center along every
/// other axis. `samples` must match `grid`; mismatched input renders only the curve.
pub fn render_profile_plot(
    samples: ArrayViewD<'_, f64>,
    grid: &CoordinateGrid,
    params: &GaussianParams,
    width: usize,
    height: usize,
) -> String {
    let points = if grid.check_samples(samples.shape()).is_ok() && !samples.is_empty() {
        profile_points(&samples, grid, params)
    } else {
        Vec::new()
    };

    let (x_min, x_max) = x_range(&points).unwrap_or_else(|| {
        let c = params.center.first().copied().unwrap_or(0.0);
        let w = params.widths.first().copied().unwrap_or(1.0).abs();
        (c - 4.0 * w, c + 4.0 * w)
    });
    let anchor = cut_coordinates(&samples, grid, params);
    let curve = sample_curve(params, &anchor, x_min, x_max, width.max(2));
    render_plot(&points, Some(&curve), x_min, x_max, width, height)
}

fn render_plot(
    points: &[(f64, f64)],
    curve_points: Option<&[(f64, f64)]>,
    x_min: f64,
    x_max: f64,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (y_min, y_max) = y_range(points, curve_points).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Draw curve first (so points can overlay).
    if let Some(curve) = curve_points {
        draw_curve(&mut grid, curve, x_min, x_max, y_min, y_max);
    }

    for &(x, y) in points {
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        grid[row][col] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: x=[{x_min:.3}, {x_max:.3}] | y=[{y_min:.4}, {y_max:.4}]\n"
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

/// Sample index nearest to the center along every axis but 0 (which is left at 0).
fn cut_index(samples: &ArrayViewD<'_, f64>, grid: &CoordinateGrid, params: &GaussianParams) -> Vec<usize> {
    let shape = samples.shape();
    let mut idx = vec![0; shape.len()];
    for axis in 1..shape.len() {
        let target = params.center.get(axis).copied().unwrap_or(0.0);
        let mut index = vec![0; shape.len()];
        let mut best = (0, f64::INFINITY);
        for j in 0..shape[axis] {
            index[axis] = j;
            let d = (grid.coordinate(axis, &index) - target).abs();
            if d < best.1 {
                best = (j, d);
            }
        }
        idx[axis] = best.0;
    }
    idx
}

fn profile_points(
    samples: &ArrayViewD<'_, f64>,
    grid: &CoordinateGrid,
    params: &GaussianParams,
) -> Vec<(f64, f64)> {
    let mut idx = cut_index(samples, grid, params);
    let n = samples.shape()[0];
    let mut out = Vec::with_capacity(n);
    for j in 0..n {
        idx[0] = j;
        out.push((grid.coordinate(0, &idx), samples[idx.as_slice()]));
    }
    out
}

/// Coordinates of the cut along every axis (axis 0 is overwritten per curve point).
fn cut_coordinates(
    samples: &ArrayViewD<'_, f64>,
    grid: &CoordinateGrid,
    params: &GaussianParams,
) -> Vec<f64> {
    if grid.check_samples(samples.shape()).is_err() || samples.is_empty() {
        return params.center.clone();
    }
    let idx = cut_index(samples, grid, params);
    (0..idx.len()).map(|axis| grid.coordinate(axis, &idx)).collect()
}

fn sample_curve(params: &GaussianParams, anchor: &[f64], x_min: f64, x_max: f64, n: usize) -> Vec<(f64, f64)> {
    let n = n.max(2);
    let mut x = anchor.to_vec();
    if x.is_empty() {
        x.push(0.0);
    }
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let u = i as f64 / (n as f64 - 1.0);
        x[0] = x_min + u * (x_max - x_min);
        out.push((x[0], evaluate_point(&x, params)));
    }
    out
}

fn x_range(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    for &(x, _) in points {
        min_x = min_x.min(x);
        max_x = max_x.max(x);
    }
    if min_x.is_finite() && max_x.is_finite() && max_x > min_x {
        Some((min_x, max_x))
    } else {
        None
    }
}

fn y_range(points: &[(f64, f64)], curve: Option<&[(f64, f64)]>) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for &(_, y) in points.iter().chain(curve.unwrap_or(&[])) {
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }

    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], x_min: f64, x_max: f64, y_min: f64, y_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in curve {
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        if let Some((c0, r0)) = prev {
            draw_line(grid, c0, r0, col, row, '-');
        } else {
            grid[row][col] = '-';
        }
        prev = Some((col, row));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
