//! GP-based minimization over a list of typed dimensions.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use bl_types::{
    config_error, BlResult, EvaluationRecord, ObjectiveDirection, ObjectiveError, RunStatus,
    Space,
};

use crate::acquisition::Acquisition;
use crate::gp::{GaussianProcess, GpConfig};
use crate::plot::convergence_trace;
use crate::suggest::{rng_from_state, AcquisitionOptimizer, Proposer};

/// Configuration for [`gp_minimize`].
///
/// # Examples
///
/// ```
/// use bl_optimizer::{Acquisition, MinimizeConfig};
///
/// let config = MinimizeConfig::default()
///     .with_n_calls(12)
///     .with_n_initial_points(4)
///     .with_acquisition(Acquisition::ei())
///     .with_random_state(1);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinimizeConfig {
    /// Total number of objective calls.
    pub n_calls: usize,
    /// Calls made at random before the surrogate takes over.
    pub n_initial_points: usize,
    pub acquisition: Acquisition,
    /// Seed for reproducible runs.
    pub random_state: Option<u64>,
    pub gp: GpConfig,
    pub optimizer: AcquisitionOptimizer,
}

impl Default for MinimizeConfig {
    fn default() -> Self {
        Self {
            n_calls: 100,
            n_initial_points: 10,
            acquisition: Acquisition::gp_hedge(),
            random_state: None,
            gp: GpConfig::default(),
            optimizer: AcquisitionOptimizer::default(),
        }
    }
}

impl MinimizeConfig {
    pub fn with_n_calls(mut self, n: usize) -> Self {
        self.n_calls = n;
        self
    }

    pub fn with_n_initial_points(mut self, n: usize) -> Self {
        self.n_initial_points = n;
        self
    }

    pub fn with_acquisition(mut self, acquisition: Acquisition) -> Self {
        self.acquisition = acquisition;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn with_gp(mut self, gp: GpConfig) -> Self {
        self.gp = gp;
        self
    }

    pub fn with_optimizer(mut self, optimizer: AcquisitionOptimizer) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> BlResult<()> {
        if self.n_calls == 0 {
            return Err(config_error!("n_calls must be at least 1"));
        }
        if self.n_initial_points == 0 {
            return Err(config_error!("n_initial_points must be at least 1"));
        }
        if self.n_initial_points > self.n_calls {
            return Err(config_error!(
                "n_initial_points ({}) exceeds n_calls ({})",
                self.n_initial_points,
                self.n_calls
            ));
        }
        self.acquisition.validate()?;
        self.gp.validate().map_err(|e| config_error!("gp: {e}"))?;
        self.optimizer
            .validate()
            .map_err(|e| config_error!("optimizer: {e}"))?;
        Ok(())
    }
}

/// Outcome of [`gp_minimize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinimizeResult {
    /// Location of the minimum.
    pub x: Vec<f64>,
    /// Function value at the minimum.
    pub fun: f64,
    /// Every evaluated point, in evaluation order.
    pub x_iters: Vec<Vec<f64>>,
    /// Every observed value, aligned with `x_iters`.
    pub func_vals: Vec<f64>,
    pub space: Space,
    pub run: RunStatus,
}

impl MinimizeResult {
    pub fn records(&self) -> Vec<EvaluationRecord> {
        self.x_iters
            .iter()
            .zip(&self.func_vals)
            .map(|(x, y)| EvaluationRecord::new(x.clone(), *y))
            .collect()
    }

    /// Running minimum after each call.
    pub fn convergence(&self) -> Vec<f64> {
        convergence_trace(&self.func_vals, ObjectiveDirection::Minimize)
    }
}

/// Minimize `func` over `space` with a Gaussian-process surrogate.
///
/// The first `n_initial_points` calls are uniform random samples; every later
/// point maximizes the acquisition function over a surrogate refitted on all
/// observations so far.
pub fn gp_minimize<F>(mut func: F, space: &Space, config: &MinimizeConfig) -> BlResult<MinimizeResult>
where
    F: FnMut(&[f64]) -> f64,
{
    config.validate()?;
    if space.is_empty() {
        return Err(config_error!("space must have at least one dimension"));
    }

    let mut rng = rng_from_state(config.random_state);
    let mut proposer = Proposer::new(config.acquisition, config.optimizer.clone());
    let mut run = RunStatus::new(ObjectiveDirection::Minimize);
    run.mark_running();

    info!(
        "gp_minimize: {} calls over {} dimensions ({} random, acquisition {})",
        config.n_calls,
        space.len(),
        config.n_initial_points,
        config.acquisition
    );

    let mut x_iters: Vec<Vec<f64>> = Vec::with_capacity(config.n_calls);
    let mut unit_iters: Vec<Vec<f64>> = Vec::with_capacity(config.n_calls);
    let mut func_vals: Vec<f64> = Vec::with_capacity(config.n_calls);

    for call in 0..config.n_calls {
        let point = if call < config.n_initial_points {
            space.sample(&mut rng)
        } else {
            let gp = match GaussianProcess::fit(&config.gp, &unit_iters, &func_vals) {
                Ok(gp) => gp,
                Err(e) => {
                    run.mark_failed(e.to_string());
                    return Err(e);
                }
            };
            let best = run.best.as_ref().map_or(f64::INFINITY, EvaluationRecord::value);
            proposer.propose(space, &gp, &x_iters, best, &mut rng)
        };

        let value = func(&point);
        if !value.is_finite() {
            let err = ObjectiveError::NonFinite { point, value };
            run.mark_failed(err.to_string());
            return Err(err.into());
        }

        let improved = run.record(&EvaluationRecord::new(point.clone(), value));
        debug!(
            "call {}/{}: f({point:?}) = {value}{}",
            call + 1,
            config.n_calls,
            if improved { " (new best)" } else { "" }
        );

        unit_iters.push(space.to_unit(&point));
        x_iters.push(point);
        func_vals.push(value);
    }

    run.mark_completed();
    let best = run
        .best
        .clone()
        .ok_or_else(|| bl_types::internal_error!("run finished without evaluations"))?;

    info!("gp_minimize finished: fun={} at {:?}", best.value(), best.point());

    Ok(MinimizeResult {
        x: best.point().to_vec(),
        fun: best.value(),
        x_iters,
        func_vals,
        space: space.clone(),
        run,
    })
}
