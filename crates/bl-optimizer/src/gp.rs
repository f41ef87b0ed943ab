//! Gaussian-process surrogate.
//!
//! Inputs are expected in the unit cube (see [`bl_types::Space::to_unit`]).
//! Targets are standardized before fitting and predictions are mapped back to
//! the original scale. The length scale is picked from a log-spaced grid by
//! maximizing the log marginal likelihood.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use bl_types::{BlResult, SurrogateError};

use crate::kernel::Kernel;

const LN_2PI: f64 = 1.837_877_066_409_345_5;
const MAX_JITTER_RETRIES: usize = 5;

/// Surrogate settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpConfig {
    pub kernel: Kernel,
    /// Observation noise added to the diagonal (standardized units).
    pub noise: f64,
    /// Smallest candidate length scale (unit-cube units).
    pub min_length_scale: f64,
    /// Largest candidate length scale.
    pub max_length_scale: f64,
    /// Number of log-spaced candidates between the two.
    pub length_scale_steps: usize,
}

impl Default for GpConfig {
    fn default() -> Self {
        Self {
            kernel: Kernel::Matern52,
            noise: 1e-6,
            min_length_scale: 0.01,
            max_length_scale: 10.0,
            length_scale_steps: 25,
        }
    }
}

impl GpConfig {
    pub fn with_kernel(mut self, kernel: Kernel) -> Self {
        self.kernel = kernel;
        self
    }

    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.noise > 0.0) {
            return Err(format!("noise must be positive, got {}", self.noise));
        }
        if !(self.min_length_scale > 0.0) || self.min_length_scale > self.max_length_scale {
            return Err(format!(
                "length scale range [{}, {}] is invalid",
                self.min_length_scale, self.max_length_scale
            ));
        }
        if self.length_scale_steps == 0 {
            return Err("length_scale_steps must be at least 1".into());
        }
        Ok(())
    }

    fn length_scale_grid(&self) -> Vec<f64> {
        if self.length_scale_steps == 1 {
            return vec![self.min_length_scale];
        }
        let lo = self.min_length_scale.ln();
        let hi = self.max_length_scale.ln();
        (0..self.length_scale_steps)
            .map(|i| {
                let t = i as f64 / (self.length_scale_steps - 1) as f64;
                (lo + t * (hi - lo)).exp()
            })
            .collect()
    }
}

/// A fitted Gaussian process.
#[derive(Debug, Clone)]
pub struct GaussianProcess {
    kernel: Kernel,
    x_train: Vec<Vec<f64>>,
    y_mean: f64,
    y_std: f64,
    length_scale: f64,
    /// Lower Cholesky factor of K + noise·I.
    l_matrix: Vec<Vec<f64>>,
    /// K⁻¹ y on standardized targets.
    alpha: Vec<f64>,
    log_marginal_likelihood: f64,
}

struct Factorization {
    l_matrix: Vec<Vec<f64>>,
    alpha: Vec<f64>,
    log_marginal_likelihood: f64,
}

impl GaussianProcess {
    /// Fit to `xs` (unit-cube points) and `ys`.
    pub fn fit(config: &GpConfig, xs: &[Vec<f64>], ys: &[f64]) -> BlResult<Self> {
        if xs.is_empty() || xs.len() != ys.len() {
            return Err(SurrogateError::Empty.into());
        }
        if let Some(index) = ys.iter().position(|y| !y.is_finite()) {
            return Err(SurrogateError::NonFiniteTarget { index }.into());
        }

        let n = ys.len() as f64;
        let y_mean = ys.iter().sum::<f64>() / n;
        let variance = ys.iter().map(|y| (y - y_mean).powi(2)).sum::<f64>() / n;
        let y_std = if variance.sqrt() > 1e-12 {
            variance.sqrt()
        } else {
            1.0
        };
        let z: Vec<f64> = ys.iter().map(|y| (y - y_mean) / y_std).collect();

        let mut best: Option<(f64, Factorization)> = None;
        let mut last_jitter = config.noise;
        for length_scale in config.length_scale_grid() {
            match factorize(config, xs, &z, length_scale) {
                Ok(fac) => {
                    let better = best
                        .as_ref()
                        .map_or(true, |(_, b)| fac.log_marginal_likelihood > b.log_marginal_likelihood);
                    if better {
                        best = Some((length_scale, fac));
                    }
                }
                Err(jitter) => last_jitter = jitter,
            }
        }

        let Some((length_scale, fac)) = best else {
            warn!(
                "GP fit failed for every length scale (n = {}, jitter {last_jitter:e})",
                xs.len()
            );
            return Err(SurrogateError::NotPositiveDefinite {
                jitter: last_jitter,
            }
            .into());
        };

        debug!(
            "GP fitted on {} points: length_scale={length_scale:.4}, lml={:.4}",
            xs.len(),
            fac.log_marginal_likelihood
        );

        Ok(Self {
            kernel: config.kernel,
            x_train: xs.to_vec(),
            y_mean,
            y_std,
            length_scale,
            l_matrix: fac.l_matrix,
            alpha: fac.alpha,
            log_marginal_likelihood: fac.log_marginal_likelihood,
        })
    }

    /// Predictive mean and standard deviation in original target units.
    pub fn predict(&self, x: &[f64]) -> (f64, f64) {
        let k_star: Vec<f64> = self
            .x_train
            .iter()
            .map(|xi| self.kernel.eval(xi, x, self.length_scale))
            .collect();

        let mean_z: f64 = k_star.iter().zip(&self.alpha).map(|(k, a)| k * a).sum();
        let v = solve_lower(&self.l_matrix, &k_star);
        let var_z = (1.0 - v.iter().map(|vi| vi * vi).sum::<f64>()).max(1e-12);

        (
            mean_z * self.y_std + self.y_mean,
            var_z.sqrt() * self.y_std,
        )
    }

    pub fn length_scale(&self) -> f64 {
        self.length_scale
    }

    pub fn log_marginal_likelihood(&self) -> f64 {
        self.log_marginal_likelihood
    }

    pub fn n_observations(&self) -> usize {
        self.x_train.len()
    }
}

/// Factorize the covariance at one length scale, escalating jitter on failure.
/// On failure returns the last jitter tried.
fn factorize(
    config: &GpConfig,
    xs: &[Vec<f64>],
    z: &[f64],
    length_scale: f64,
) -> Result<Factorization, f64> {
    let n = xs.len();
    let mut k_matrix = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let k = config.kernel.eval(&xs[i], &xs[j], length_scale);
            k_matrix[i][j] = k;
            k_matrix[j][i] = k;
        }
    }

    let mut jitter = config.noise;
    for attempt in 0..=MAX_JITTER_RETRIES {
        if let Some(l) = cholesky(&k_matrix, jitter) {
            let alpha = solve_upper(&l, &solve_lower(&l, z));
            let data_fit: f64 = z.iter().zip(&alpha).map(|(a, b)| a * b).sum();
            let log_det: f64 = (0..n).map(|i| l[i][i].ln()).sum();
            return Ok(Factorization {
                l_matrix: l,
                alpha,
                log_marginal_likelihood: -0.5 * data_fit - log_det - 0.5 * n as f64 * LN_2PI,
            });
        }
        if attempt < MAX_JITTER_RETRIES {
            jitter *= 10.0;
            debug!("Cholesky failed at length_scale={length_scale:.4}, retrying with jitter {jitter:e}");
        }
    }
    Err(jitter)
}

/// Lower Cholesky factor of `matrix + jitter·I`, or `None` if not positive definite.
pub(crate) fn cholesky(matrix: &[Vec<f64>], jitter: f64) -> Option<Vec<Vec<f64>>> {
    let n = matrix.len();
    let mut l = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[i][k] * l[j][k]).sum();
            if i == j {
                let val = matrix[i][i] + jitter - sum;
                if val <= 0.0 || !val.is_finite() {
                    return None;
                }
                l[i][j] = val.sqrt();
            } else {
                l[i][j] = (matrix[i][j] - sum) / l[j][j];
            }
        }
    }

    Some(l)
}

/// Solve L x = b (forward substitution).
fn solve_lower(l: &[Vec<f64>], b: &[f64]) -> Vec<f64> {
    let n = b.len();
    let mut x = vec![0.0; n];
    for i in 0..n {
        let sum: f64 = (0..i).map(|j| l[i][j] * x[j]).sum();
        x[i] = (b[i] - sum) / l[i][i];
    }
    x
}

/// Solve Lᵀ x = b (backward substitution).
fn solve_upper(l: &[Vec<f64>], b: &[f64]) -> Vec<f64> {
    let n = b.len();
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let sum: f64 = ((i + 1)..n).map(|j| l[j][i] * x[j]).sum();
        x[i] = (b[i] - sum) / l[i][i];
    }
    x
}
