//! # bl-notebook
//!
//! Runs both optimizers on the paraboloid `x² + y²` and prints what they find:
//! the minimizer's best point with a convergence chart, the maximizer's
//! progress table on `-(x² + y²)`, and the error raised for a space given as
//! bare tuples.

mod config;

pub use config::{
    NotebookConfig, CONFIG_ENV, INIT_POINTS_ENV, N_CALLS_ENV, N_ITER_ENV, SEED_ENV,
};

use serde_json::json;
use std::io::Write;
use tracing::info;

use bl_optimizer::{gp_minimize, render_convergence, BayesianOptimization, MinimizeResult};
use bl_types::{BlResult, Bounds, ObjectiveDirection, Params, Space};

const CHART_WIDTH: usize = 48;
const CHART_HEIGHT: usize = 12;

/// Sum of squares over every coordinate.
pub fn paraboloid(point: &[f64]) -> f64 {
    point.iter().map(|v| v * v).sum()
}

/// Minimizer run on [`paraboloid`].
pub fn run_minimize<W: Write>(config: &NotebookConfig, out: &mut W) -> BlResult<MinimizeResult> {
    let space = config.space()?;
    info!("minimizing over {} dimensions", space.len());
    let result = gp_minimize(paraboloid, &space, &config.minimize)?;

    writeln!(out, "Space:")?;
    for dim in space.dimensions() {
        writeln!(out, "  {dim}")?;
    }
    writeln!(out, "x = {:?}", result.x)?;
    writeln!(out, "fun = {}", result.fun)?;
    writeln!(out)?;
    writeln!(out, "Convergence plot")?;
    write!(
        out,
        "{}",
        render_convergence(
            &result.func_vals,
            ObjectiveDirection::Minimize,
            CHART_WIDTH,
            CHART_HEIGHT
        )
    )?;
    Ok(result)
}

/// Maximizer run on the negated [`paraboloid`] over the same space.
pub fn run_maximize<W: Write>(config: &NotebookConfig, out: &mut W) -> BlResult<()> {
    let space = config.space()?;
    let bounds = bounds_for(&space)?;
    let mut optimizer = BayesianOptimization::new(
        |p: &Params| -p.iter().map(|(_, v)| v * v).sum::<f64>(),
        bounds,
    )?;
    optimizer.maximize_with(out, &config.maximize)?;
    if let Some(best) = optimizer.max() {
        writeln!(out, "max: target={:.4} params={}", best.target, best.params)?;
    }
    Ok(())
}

/// Attempts to build a space from `(name, low, high)` tuples and reports the failure.
pub fn show_tuple_rejection<W: Write>(out: &mut W) -> BlResult<()> {
    let tuples = json!([["x", -10.0, 10.0], ["y", -10.0, 10.0]]);
    match Space::from_json(&tuples) {
        Ok(space) => writeln!(out, "unexpectedly accepted {} dimensions", space.len())?,
        Err(e) => writeln!(out, "tuple space rejected: {e}")?,
    }
    Ok(())
}

fn bounds_for(space: &Space) -> BlResult<Bounds> {
    Bounds::new(
        space
            .names()
            .into_iter()
            .zip(space.dimensions().iter().map(|d| (d.low(), d.high()))),
    )
}
