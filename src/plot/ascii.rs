//! ASCII/Unicode diagnostic plots.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks of a fit in a terminal or text artifact
//! - deterministic output (helpful for golden tests)
//!
//! Four standard regression diagnostics are rendered per fitted model:
//! - residuals vs fitted values
//! - normal QQ of standardized residuals
//! - Cook's distance (spike plot by observation index)
//! - standardized residuals vs leverage

use crate::math::normal_quantile;
use crate::model::fit::FittedModel;

/// Render all four diagnostic panels for one fitted model.
pub fn render_diagnostics(fit: &FittedModel, width: usize, height: usize) -> String {
    let std_resid = standardized_residuals(fit);

    let mut out = String::new();
    out.push_str(&format!("Diagnostics: {}\n\n", fit.formula));

    let rvf: Vec<(f64, f64)> = fit
        .fitted
        .iter()
        .zip(fit.residuals.iter())
        .map(|(&x, &y)| (x, y))
        .collect();
    out.push_str(&render_scatter("Residuals vs fitted", &rvf, width, height));
    out.push('\n');

    out.push_str(&render_scatter(
        "Normal QQ (standardized residuals)",
        &qq_points(&std_resid),
        width,
        height,
    ));
    out.push('\n');

    out.push_str(&render_spikes("Cook's distance", &fit.cooks, width, height));
    out.push('\n');

    let rvl: Vec<(f64, f64)> = fit
        .leverage
        .iter()
        .zip(std_resid.iter())
        .map(|(&x, &y)| (x, y))
        .collect();
    out.push_str(&render_scatter(
        "Standardized residuals vs leverage",
        &rvl,
        width,
        height,
    ));

    out
}

/// Internally studentized residuals: `e_i / (sigma * sqrt(1 - h_i))`.
fn standardized_residuals(fit: &FittedModel) -> Vec<f64> {
    fit.residuals
        .iter()
        .zip(fit.leverage.iter())
        .map(|(&e, &h)| {
            let denom = fit.sigma * (1.0 - h).max(1e-12).sqrt();
            e / denom
        })
        .collect()
}

/// Theoretical-vs-sample quantile pairs for a QQ plot.
fn qq_points(std_resid: &[f64]) -> Vec<(f64, f64)> {
    let n = std_resid.len();
    let mut sorted = std_resid.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted
        .iter()
        .enumerate()
        .map(|(i, &q)| {
            let p = (i as f64 + 0.5) / n as f64;
            (normal_quantile(p), q)
        })
        .collect()
}

/// Scatter of `(x, y)` points on a fixed character grid.
pub fn render_scatter(title: &str, points: &[(f64, f64)], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (x_min, x_max) = pad_range(axis_range(points.iter().map(|p| p.0)), 0.05);
    let (y_min, y_max) = pad_range(axis_range(points.iter().map(|p| p.1)), 0.05);

    let mut grid = vec![vec![' '; width]; height];
    for &(x, y) in points {
        if !(x.is_finite() && y.is_finite()) {
            continue;
        }
        let col = map_to(x, x_min, x_max, width);
        let row = map_to(y, y_min, y_max, height);
        // Row 0 is the top of the grid.
        grid[height - 1 - row][col] = 'o';
    }

    render_grid(title, &grid, x_min, x_max, y_min, y_max)
}

/// Spike plot of non-negative values by index (Cook's distance).
pub fn render_spikes(title: &str, values: &[f64], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let max = values.iter().copied().fold(0.0_f64, f64::max).max(1e-12);
    let mut grid = vec![vec![' '; width]; height];

    for (i, &v) in values.iter().enumerate() {
        if !v.is_finite() {
            continue;
        }
        let col = if values.len() <= 1 {
            0
        } else {
            i * (width - 1) / (values.len() - 1)
        };
        let top = map_to(v, 0.0, max, height);
        for row in 0..=top {
            grid[height - 1 - row][col] = '|';
        }
    }

    render_grid(title, &grid, 1.0, values.len() as f64, 0.0, max)
}

fn render_grid(
    title: &str,
    grid: &[Vec<char>],
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{title} | x=[{x_min:.3}, {x_max:.3}] y=[{y_min:.3}, {y_max:.3}]\n"
    ));
    for row in grid {
        out.push('|');
        out.extend(row.iter());
        out.push('\n');
    }
    out.push('+');
    out.push_str(&"-".repeat(grid.first().map_or(0, Vec::len)));
    out.push('\n');
    out
}

fn axis_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values.filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }
    if min > max {
        (0.0, 1.0)
    } else {
        (min, max)
    }
}

fn pad_range((min, max): (f64, f64), frac: f64) -> (f64, f64) {
    let span = (max - min).max(1e-9);
    (min - span * frac, max + span * frac)
}

fn map_to(v: f64, min: f64, max: f64, cells: usize) -> usize {
    let t = ((v - min) / (max - min)).clamp(0.0, 1.0);
    ((t * (cells - 1) as f64).round() as usize).min(cells - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scatter_is_deterministic_and_sized() {
        let pts = vec![(0.0, 0.0), (1.0, 1.0), (2.0, -1.0)];
        let a = render_scatter("t", &pts, 40, 10);
        let b = render_scatter("t", &pts, 40, 10);
        assert_eq!(a, b);
        // Header + 10 grid rows + axis line.
        assert_eq!(a.lines().count(), 12);
        assert!(a.contains('o'));
    }

    #[test]
    fn spikes_reach_the_baseline() {
        let s = render_spikes("cooks", &[0.1, 0.5, 0.2], 30, 8);
        let last_grid_row = s.lines().nth(8).unwrap();
        assert!(last_grid_row.contains('|'));
    }

    #[test]
    fn empty_points_do_not_panic() {
        let s = render_scatter("empty", &[], 20, 6);
        assert!(s.contains("empty"));
    }

    #[test]
    fn qq_points_are_monotone() {
        let resid = vec![0.3, -1.2, 0.8, -0.1, 1.5, -0.7];
        let pts = qq_points(&resid);
        for pair in pts.windows(2) {
            assert!(pair[0].0 <= pair[1].0);
            assert!(pair[0].1 <= pair[1].1);
        }
    }
}
