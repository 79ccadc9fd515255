//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks of a fit in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - sample histogram, scaled to a density: `#`
//! - fitted density of the best distribution: `*` line

use crate::domain::DistributionParams;

/// Render a density histogram of `values`, optionally overlaid with a fitted density.
pub fn render_fit_plot(
    values: &[f64],
    fitted: Option<(&str, &DistributionParams)>,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let Some((x_min, x_max)) = x_range(values) else {
        return "Plot: no data\n".to_string();
    };
    let (x_min, x_max) = pad_range(x_min, x_max, 0.05);

    let histogram = histogram_density(values, x_min, x_max, width);
    let curve: Vec<(f64, f64)> = match fitted {
        Some((_, params)) => sample_density(params, x_min, x_max, width),
        None => Vec::new(),
    };

    let y_max = histogram
        .iter()
        .copied()
        .chain(curve.iter().map(|&(_, y)| y))
        .filter(|y| y.is_finite())
        .fold(0.0, f64::max);
    let y_max = if y_max > 0.0 { y_max * 1.05 } else { 1.0 };

    let mut grid = vec![vec![' '; width]; height];

    for (x, &d) in histogram.iter().enumerate() {
        if d <= 0.0 {
            continue;
        }
        let top = map_y(d, 0.0, y_max, height);
        for row in grid.iter_mut().skip(top) {
            row[x] = '#';
        }
    }

    // Curve last so it stays visible over the bars.
    draw_curve(&mut grid, &curve, x_min, x_max, 0.0, y_max);

    let mut out = String::new();
    out.push_str(&format!("Plot: x=[{x_min:.4}, {x_max:.4}] | density=[0, {y_max:.4}]"));
    match fitted {
        Some((label, _)) => out.push_str(&format!(" | #: sample, *: {label}\n")),
        None => out.push_str(" | #: sample\n"),
    }

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

fn x_range(values: &[f64]) -> Option<(f64, f64)> {
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    for &v in values {
        min_x = min_x.min(v);
        max_x = max_x.max(v);
    }
    if !(min_x.is_finite() && max_x.is_finite()) {
        return None;
    }
    if max_x > min_x {
        Some((min_x, max_x))
    } else {
        // Constant sample: centre a unit window on it.
        Some((min_x - 0.5, max_x + 0.5))
    }
}

fn histogram_density(values: &[f64], x_min: f64, x_max: f64, bins: usize) -> Vec<f64> {
    let mut counts = vec![0usize; bins];
    for &v in values {
        counts[map_x(v, x_min, x_max, bins)] += 1;
    }
    let bin_width = (x_max - x_min) / bins as f64;
    let n = values.len() as f64;
    counts.into_iter().map(|c| c as f64 / (n * bin_width)).collect()
}

fn sample_density(params: &DistributionParams, x_min: f64, x_max: f64, n: usize) -> Vec<(f64, f64)> {
    let n = n.max(2);
    (0..n)
        .map(|i| {
            let u = i as f64 / (n as f64 - 1.0);
            let x = x_min + u * (x_max - x_min);
            (x, params.density(x))
        })
        .filter(|&(_, y)| y.is_finite())
        .collect()
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
            draw_line(grid, c0, r0, col, row, '*');
        } else {
            grid[row][col] = '*';
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
        if y0 >= 0 && (y0 as usize) < grid.len() && x0 >= 0 && (x0 as usize) < grid[0].len() {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plot_has_fixed_grid() {
        let values: Vec<f64> = (0..100).map(|i| (i % 10) as f64).collect();
        let params = DistributionParams::Normal { mu: 4.5, sigma: 2.9 };
        let txt = render_fit_plot(&values, Some(("Normal", &params)), 30, 8);

        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines.len(), 9);
        assert!(lines[0].starts_with("Plot: x=["));
        assert!(lines[0].ends_with("*: Normal"));
        assert!(lines[1..].iter().all(|l| l.chars().count() == 30));
        assert!(txt.contains('#'));
        assert!(txt.contains('*'));
    }

    #[test]
    fn histogram_integrates_to_one() {
        let values = [1.0, 2.0, 2.5, 3.0, 7.0];
        let bins = 20;
        let d = histogram_density(&values, 0.0, 10.0, bins);
        let area: f64 = d.iter().map(|v| v * 10.0 / bins as f64).sum();
        assert!((area - 1.0).abs() < 1e-12);
    }

    #[test]
    fn constant_and_empty_samples() {
        let txt = render_fit_plot(&[3.0; 12], None, 10, 5);
        assert_eq!(txt.lines().count(), 6);
        assert!(txt.lines().next().unwrap().ends_with("#: sample"));
        assert_eq!(render_fit_plot(&[], None, 10, 5), "Plot: no data\n");
    }

    #[test]
    fn bottom_row_is_filled_under_the_mode() {
        let values = [5.0; 50];
        let txt = render_fit_plot(&values, None, 11, 5);
        let last = txt.lines().last().unwrap();
        assert_eq!(last.chars().filter(|&c| c == '#').count(), 1);
    }
}
