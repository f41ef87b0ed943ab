//! Text rendering of per-iteration objective values.

use std::fmt::Write as _;

use bl_types::ObjectiveDirection;

/// Best value seen after each evaluation.
pub fn convergence_trace(values: &[f64], direction: ObjectiveDirection) -> Vec<f64> {
    let mut trace = Vec::with_capacity(values.len());
    let mut best: Option<f64> = None;
    for &v in values {
        let current = match best {
            Some(b) if !direction.improves(v, b) => b,
            _ => v,
        };
        best = Some(current);
        trace.push(current);
    }
    trace
}

/// Chart of objective value against iteration index.
///
/// Each evaluation is drawn as `*` and the running best as `-`. The y axis is
/// labelled with the value range, the x axis with the first and last
/// iteration numbers.
pub fn render_convergence(
    values: &[f64],
    direction: ObjectiveDirection,
    width: usize,
    height: usize,
) -> String {
    if values.is_empty() {
        return "no evaluations\n".to_string();
    }
    let width = width.max(2);
    let height = height.max(2);

    let trace = convergence_trace(values, direction);
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = if hi > lo { hi - lo } else { 1.0 };

    let column = |i: usize| {
        if values.len() == 1 {
            0
        } else {
            i * (width - 1) / (values.len() - 1)
        }
    };
    let row = |v: f64| {
        let t = (hi - v) / span;
        ((t * (height - 1) as f64).round() as usize).min(height - 1)
    };

    let mut grid = vec![vec![' '; width]; height];
    for (i, best) in trace.iter().enumerate() {
        grid[row(*best)][column(i)] = '-';
    }
    for (i, v) in values.iter().enumerate() {
        grid[row(*v)][column(i)] = '*';
    }

    let mut out = String::new();
    for (r, cells) in grid.iter().enumerate() {
        let label = if r == 0 {
            format!("{hi:>10.3}")
        } else if r == height - 1 {
            format!("{lo:>10.3}")
        } else {
            " ".repeat(10)
        };
        let line: String = cells.iter().collect();
        let _ = writeln!(out, "{label} |{}", line.trim_end());
    }
    let _ = writeln!(out, "{} +{}", " ".repeat(10), "-".repeat(width));
    let last = values.len().to_string();
    let gap = width.saturating_sub(1 + last.len());
    let _ = writeln!(out, "{}  1{}{last}", " ".repeat(10), " ".repeat(gap));
    out
}
