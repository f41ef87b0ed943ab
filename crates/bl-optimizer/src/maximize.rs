//! Sequential maximization over named parameter bounds.

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::io::{self, Write};
use tracing::{debug, info};

use bl_types::{
    config_error, BlResult, Bounds, EvaluationRecord, ObjectiveDirection, ObjectiveError, Params,
    RunStatus, Space,
};

use crate::acquisition::Acquisition;
use crate::gp::{GaussianProcess, GpConfig};
use crate::progress::{ProgressTable, Verbosity};
use crate::suggest::{rng_from_state, AcquisitionOptimizer, Proposer};

/// One evaluated parameter set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub target: f64,
    pub params: Params,
}

/// Settings for a [`BayesianOptimization::maximize`] call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaximizeConfig {
    /// Random points evaluated before the surrogate is used.
    pub init_points: usize,
    /// Surrogate-guided iterations after the random phase.
    pub n_iter: usize,
    pub acquisition: Acquisition,
    pub random_state: Option<u64>,
    /// 0 = silent, 1 = new maxima only, 2 = every row.
    pub verbose: u8,
}

impl Default for MaximizeConfig {
    fn default() -> Self {
        Self {
            init_points: 5,
            n_iter: 25,
            acquisition: Acquisition::ucb(),
            random_state: None,
            verbose: 2,
        }
    }
}

impl MaximizeConfig {
    pub fn with_init_points(mut self, n: usize) -> Self {
        self.init_points = n;
        self
    }

    pub fn with_n_iter(mut self, n: usize) -> Self {
        self.n_iter = n;
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

    /// Validates the configuration.
    pub fn validate(&self) -> BlResult<()> {
        if self.init_points + self.n_iter == 0 {
            return Err(config_error!("init_points + n_iter must be at least 1"));
        }
        self.acquisition.validate()
    }
}

/// Maximizer over named bounds.
///
/// # Examples
///
/// ```
/// use bl_optimizer::{Acquisition, BayesianOptimization};
/// use bl_types::{Bounds, Params};
///
/// let bounds = Bounds::new([("x", (-10.0, 10.0)), ("y", (-10.0, 10.0))]).unwrap();
/// let mut optimizer = BayesianOptimization::new(
///     |p: &Params| -(p["x"].powi(2) + p["y"].powi(2)),
///     bounds,
/// )
/// .unwrap()
/// .with_random_state(1)
/// .with_verbose(0);
///
/// optimizer.maximize(2, 3, Acquisition::ei()).unwrap();
/// assert_eq!(optimizer.res().len(), 5);
/// assert!(optimizer.max().unwrap().target <= 0.0);
/// ```
pub struct BayesianOptimization<F> {
    f: F,
    bounds: Bounds,
    space: Space,
    rng: StdRng,
    verbosity: Verbosity,
    gp: GpConfig,
    optimizer: AcquisitionOptimizer,
    queue: VecDeque<Params>,
    res: Vec<Evaluation>,
    run: RunStatus,
}

impl<F> BayesianOptimization<F>
where
    F: FnMut(&Params) -> f64,
{
    pub fn new(f: F, bounds: Bounds) -> BlResult<Self> {
        let space = bounds.to_space()?;
        Ok(Self {
            f,
            bounds,
            space,
            rng: rng_from_state(None),
            verbosity: Verbosity::All,
            gp: GpConfig::default(),
            optimizer: AcquisitionOptimizer::default(),
            queue: VecDeque::new(),
            res: Vec::new(),
            run: RunStatus::new(ObjectiveDirection::Maximize),
        })
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.rng = rng_from_state(Some(seed));
        self
    }

    pub fn with_verbose(mut self, level: u8) -> Self {
        self.verbosity = Verbosity::from(level);
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

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// All evaluations in the order they were made.
    pub fn res(&self) -> &[Evaluation] {
        &self.res
    }

    /// The evaluation with the highest target.
    pub fn max(&self) -> Option<&Evaluation> {
        let targets: Vec<f64> = self.res.iter().map(|e| e.target).collect();
        ObjectiveDirection::Maximize
            .best_index(&targets)
            .map(|idx| &self.res[idx])
    }

    pub fn run(&self) -> &RunStatus {
        &self.run
    }

    /// Queue an explicit point; it is evaluated first in the next `maximize` call.
    pub fn probe(&mut self, params: Params) -> BlResult<()> {
        let point = self.bounds.point_from_params(&params)?;
        self.space.check_point(&point)?;
        self.queue.push_back(params);
        Ok(())
    }

    /// Record an observation made outside the optimizer.
    pub fn register(&mut self, params: Params, target: f64) -> BlResult<()> {
        let point = self.bounds.point_from_params(&params)?;
        self.space.check_point(&point)?;
        if !target.is_finite() {
            return Err(ObjectiveError::NonFinite { point, value: target }.into());
        }
        self.run.record(&EvaluationRecord::new(point, target));
        self.res.push(Evaluation { target, params });
        Ok(())
    }

    /// Most promising parameters under `acquisition` given the evaluations so far.
    ///
    /// With no evaluations yet this is a uniform random sample.
    pub fn suggest(&mut self, acquisition: Acquisition) -> BlResult<Params> {
        let mut proposer = Proposer::new(acquisition, self.optimizer.clone());
        self.suggest_with(&mut proposer)
    }

    fn suggest_with(&mut self, proposer: &mut Proposer) -> BlResult<Params> {
        if self.res.is_empty() {
            let point = self.space.sample(&mut self.rng);
            return Ok(self.bounds.params_from_point(&point));
        }

        let mut observed = Vec::with_capacity(self.res.len());
        let mut unit = Vec::with_capacity(self.res.len());
        let mut costs = Vec::with_capacity(self.res.len());
        for e in &self.res {
            let point = self.bounds.point_from_params(&e.params)?;
            unit.push(self.space.to_unit(&point));
            observed.push(point);
            // The surrogate machinery minimizes, so work on negated targets.
            costs.push(-e.target);
        }
        let gp = GaussianProcess::fit(&self.gp, &unit, &costs)?;
        let best = costs.iter().copied().fold(f64::INFINITY, f64::min);
        let point = proposer.propose(&self.space, &gp, &observed, best, &mut self.rng);
        Ok(self.bounds.params_from_point(&point))
    }

    /// Run `init_points` random probes then `n_iter` guided iterations,
    /// printing the progress table to stdout.
    pub fn maximize(
        &mut self,
        init_points: usize,
        n_iter: usize,
        acquisition: Acquisition,
    ) -> BlResult<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.maximize_to(&mut out, init_points, n_iter, acquisition)
    }

    /// Same as [`BayesianOptimization::maximize`], writing the table to `out`.
    ///
    /// Any error after the run starts, including a failing writer, leaves the
    /// run marked failed. Evaluations made before the error stay in `res`.
    pub fn maximize_to<W: Write>(
        &mut self,
        out: &mut W,
        init_points: usize,
        n_iter: usize,
        acquisition: Acquisition,
    ) -> BlResult<()> {
        acquisition.validate()?;
        self.run.mark_running();
        info!(
            "maximize: {init_points} random + {n_iter} guided iterations, acquisition {acquisition}"
        );

        match self.run_iterations(out, init_points, n_iter, acquisition) {
            Ok(()) => {
                self.run.mark_completed();
                if let Some(best) = self.max() {
                    info!("maximize finished: target={} at {}", best.target, best.params);
                }
                Ok(())
            }
            Err(e) => {
                self.run.mark_failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Run with the budget, acquisition, seed and verbosity of `config`.
    ///
    /// A seed in `config` reseeds the optimizer before the run.
    pub fn maximize_with<W: Write>(&mut self, out: &mut W, config: &MaximizeConfig) -> BlResult<()> {
        config.validate()?;
        if let Some(seed) = config.random_state {
            self.rng = rng_from_state(Some(seed));
        }
        self.verbosity = Verbosity::from(config.verbose);
        self.maximize_to(out, config.init_points, config.n_iter, config.acquisition)
    }

    fn run_iterations<W: Write>(
        &mut self,
        out: &mut W,
        init_points: usize,
        n_iter: usize,
        acquisition: Acquisition,
    ) -> BlResult<()> {
        let mut table = ProgressTable::new(self.bounds.keys().map(str::to_string).collect(), self.verbosity);
        table.write_header(out)?;

        let mut init_points = init_points;
        if self.queue.is_empty() && self.res.is_empty() && init_points == 0 {
            init_points = 1;
        }
        for _ in 0..init_points {
            let point = self.space.sample(&mut self.rng);
            self.queue.push_back(self.bounds.params_from_point(&point));
        }

        let mut proposer = Proposer::new(acquisition, self.optimizer.clone());
        let mut iteration = 0usize;
        while let Some(params) = self.queue.pop_front() {
            iteration += 1;
            self.evaluate(out, &mut table, iteration, params)?;
        }
        for _ in 0..n_iter {
            let params = self.suggest_with(&mut proposer)?;
            iteration += 1;
            self.evaluate(out, &mut table, iteration, params)?;
        }

        table.write_footer(out)?;
        Ok(())
    }

    fn evaluate<W: Write>(
        &mut self,
        out: &mut W,
        table: &mut ProgressTable,
        iteration: usize,
        params: Params,
    ) -> BlResult<()> {
        let target = (self.f)(&params);
        let point = self.bounds.point_from_params(&params)?;
        if !target.is_finite() {
            return Err(ObjectiveError::NonFinite { point, value: target }.into());
        }
        let is_new_max = self.run.record(&EvaluationRecord::new(point, target));
        debug!("iteration {iteration}: target={target} at {params}");
        self.res.push(Evaluation {
            target,
            params: params.clone(),
        });
        table.write_row(out, iteration, target, &params, is_new_max)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bl_types::{BlError, RunState};

    fn bounds() -> Bounds {
        Bounds::new([("x", (-10.0, 10.0)), ("y", (-10.0, 10.0))]).unwrap()
    }

    fn paraboloid(p: &Params) -> f64 {
        -(p["x"].powi(2) + p["y"].powi(2))
    }

    fn quick(seed: u64) -> BayesianOptimization<fn(&Params) -> f64> {
        BayesianOptimization::new(paraboloid as fn(&Params) -> f64, bounds())
            .unwrap()
            .with_random_state(seed)
            .with_optimizer(AcquisitionOptimizer::default().with_n_warmup(500))
    }

    #[test]
    fn evaluates_init_plus_iter_points() {
        let mut bo = quick(1);
        let mut out = Vec::new();
        bo.maximize_to(&mut out, 2, 4, Acquisition::ei()).unwrap();
        assert_eq!(bo.res().len(), 6);
        assert_eq!(bo.run().evaluations, 6);
        let text = String::from_utf8(out).unwrap();
        // header row + 6 data rows start with '|'
        assert_eq!(text.lines().filter(|l| l.starts_with('|')).count(), 7);
    }

    #[test]
    fn max_is_best_of_res() {
        let mut bo = quick(3);
        bo.maximize_to(&mut io::sink(), 3, 3, Acquisition::ucb()).unwrap();
        let best = bo.max().unwrap();
        let top = bo.res().iter().map(|e| e.target).fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(best.target, top);
        assert_eq!(bo.run().best.as_ref().unwrap().value(), top);
    }

    #[test]
    fn probes_run_first() {
        let mut bo = quick(4).with_verbose(0);
        bo.probe(Params::new().with("x", 1.0).with("y", 2.0)).unwrap();
        bo.maximize_to(&mut io::sink(), 1, 0, Acquisition::ei()).unwrap();
        assert_eq!(bo.res().len(), 2);
        assert_eq!(bo.res()[0].target, -5.0);
    }

    #[test]
    fn probe_validates_params() {
        let mut bo = quick(4);
        assert!(bo.probe(Params::new().with("x", 1.0)).is_err());
        assert!(bo.probe(Params::new().with("x", 11.0).with("y", 0.0)).is_err());
    }

    #[test]
    fn zero_init_points_still_starts() {
        let mut bo = quick(5);
        bo.maximize_to(&mut io::sink(), 0, 2, Acquisition::ei()).unwrap();
        assert_eq!(bo.res().len(), 3);
    }

    #[test]
    fn register_feeds_the_surrogate() {
        let mut bo = quick(6);
        bo.register(Params::new().with("x", 0.0).with("y", 0.0), 0.0).unwrap();
        assert_eq!(bo.max().unwrap().target, 0.0);
        let next = bo.suggest(Acquisition::ei()).unwrap();
        bo.bounds().point_from_params(&next).unwrap();
        assert!(bo
            .register(Params::new().with("x", 0.0).with("y", 1.0), f64::INFINITY)
            .is_err());
    }

    #[test]
    fn nan_target_is_an_error() {
        let mut bo = BayesianOptimization::new(|_: &Params| f64::NAN, bounds())
            .unwrap()
            .with_random_state(0);
        let err = bo.maximize_to(&mut io::sink(), 1, 0, Acquisition::ei()).unwrap_err();
        assert!(matches!(err, BlError::Objective(ObjectiveError::NonFinite { .. })));
        assert_eq!(bo.run().state, RunState::Failed);
        assert!(bo.res().is_empty());
    }

    /// Accepts the header and fails on the first data row.
    struct ClosedAfterHeader {
        lines: usize,
    }

    impl Write for ClosedAfterHeader {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.lines >= 3 {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
            }
            self.lines += buf.iter().filter(|b| **b == b'\n').count();
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writer_failure_keeps_bookkeeping_consistent() {
        let mut bo = quick(2);
        let mut out = ClosedAfterHeader { lines: 0 };
        let err = bo.maximize_to(&mut out, 3, 2, Acquisition::ei()).unwrap_err();
        assert!(matches!(err, BlError::Io(_)));

        assert_eq!(bo.run().state, RunState::Failed);
        assert!(bo.run().error.as_deref().unwrap().contains("closed"));
        assert_eq!(bo.run().evaluations, 1);
        assert_eq!(bo.res().len(), 1);
        assert_eq!(bo.run().best.as_ref().unwrap().value(), bo.max().unwrap().target);

        // The unevaluated random points stay queued for the next run.
        bo.maximize_to(&mut io::sink(), 0, 0, Acquisition::ei()).unwrap();
        assert_eq!(bo.res().len(), 3);
        assert_eq!(bo.run().state, RunState::Completed);
    }

    #[test]
    fn maximize_with_config() {
        let config = MaximizeConfig::default()
            .with_init_points(2)
            .with_n_iter(2)
            .with_acquisition(Acquisition::ei())
            .with_random_state(5);
        let mut a = quick(0);
        let mut b = quick(99);
        let mut table = Vec::new();
        a.maximize_with(&mut table, &config).unwrap();
        b.maximize_with(&mut io::sink(), &config).unwrap();
        assert_eq!(a.res().len(), 4);
        assert_eq!(a.res(), b.res());
        let text = String::from_utf8(table).unwrap();
        assert_eq!(text.lines().filter(|l| l.starts_with("| ")).count(), 5);

        let silent = MaximizeConfig { verbose: 0, ..config.clone() };
        let mut out = Vec::new();
        quick(0).maximize_with(&mut out, &silent).unwrap();
        assert!(out.is_empty());

        let empty = config.with_init_points(0).with_n_iter(0);
        assert!(matches!(
            quick(0).maximize_with(&mut io::sink(), &empty),
            Err(BlError::Config(_))
        ));
    }

    #[test]
    fn config_validation() {
        assert!(MaximizeConfig::default().validate().is_ok());
        assert!(MaximizeConfig::default()
            .with_init_points(0)
            .with_n_iter(0)
            .validate()
            .is_err());
        let parsed: MaximizeConfig =
            serde_json::from_str(r#"{"init_points": 2, "n_iter": 10, "random_state": 1}"#).unwrap();
        assert_eq!(parsed.init_points, 2);
        assert_eq!(parsed.random_state, Some(1));
        assert_eq!(parsed.acquisition, Acquisition::ucb());
    }
}
