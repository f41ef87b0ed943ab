//! Acquisition functions.
//!
//! Scores are computed in the minimization frame: `best` is the lowest cost
//! observed so far and a larger score means a more attractive candidate.
//! Maximizers negate their targets before reaching this module.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use bl_types::{validation_error, BlError, BlResult};

/// Acquisition function selector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Acquisition {
    /// Expected improvement over the incumbent, shifted by `xi`.
    ExpectedImprovement { xi: f64 },
    /// Probability of improving on the incumbent by at least `xi`.
    ProbabilityOfImprovement { xi: f64 },
    /// Confidence bound `mean - kappa * std` (an upper bound for maximizers).
    LowerConfidenceBound { kappa: f64 },
    /// Portfolio of EI, PI and LCB chosen by softmax over accumulated gains.
    GpHedge { eta: f64 },
}

impl Default for Acquisition {
    fn default() -> Self {
        Self::ei()
    }
}

impl Acquisition {
    pub const DEFAULT_XI: f64 = 0.01;
    pub const DEFAULT_KAPPA: f64 = 2.576;

    pub fn ei() -> Self {
        Self::ExpectedImprovement {
            xi: Self::DEFAULT_XI,
        }
    }

    pub fn pi() -> Self {
        Self::ProbabilityOfImprovement {
            xi: Self::DEFAULT_XI,
        }
    }

    pub fn ucb() -> Self {
        Self::LowerConfidenceBound {
            kappa: Self::DEFAULT_KAPPA,
        }
    }

    pub fn gp_hedge() -> Self {
        Self::GpHedge { eta: 1.0 }
    }

    /// Score a candidate with predictive `mean`/`std` against incumbent `best`.
    ///
    /// [`Acquisition::GpHedge`] has no single score; it is resolved to one of
    /// its members by [`Hedge`] and scores as EI here.
    pub fn score(&self, mean: f64, std: f64, best: f64) -> f64 {
        match *self {
            Self::ExpectedImprovement { xi } => expected_improvement(mean, std, best, xi),
            Self::ProbabilityOfImprovement { xi } => probability_of_improvement(mean, std, best, xi),
            Self::LowerConfidenceBound { kappa } => kappa * std - mean,
            Self::GpHedge { .. } => expected_improvement(mean, std, best, Self::DEFAULT_XI),
        }
    }

    pub fn validate(&self) -> BlResult<()> {
        match *self {
            Self::ExpectedImprovement { xi } | Self::ProbabilityOfImprovement { xi } => {
                if !xi.is_finite() || xi < 0.0 {
                    return Err(validation_error!("xi must be a non-negative number, got {xi}"));
                }
            }
            Self::LowerConfidenceBound { kappa } => {
                if !kappa.is_finite() || kappa < 0.0 {
                    return Err(validation_error!("kappa must be a non-negative number, got {kappa}"));
                }
            }
            Self::GpHedge { eta } => {
                if !eta.is_finite() || eta <= 0.0 {
                    return Err(validation_error!("eta must be positive, got {eta}"));
                }
            }
        }
        Ok(())
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            Self::ExpectedImprovement { .. } => "ei",
            Self::ProbabilityOfImprovement { .. } => "pi",
            Self::LowerConfidenceBound { .. } => "lcb",
            Self::GpHedge { .. } => "gp_hedge",
        }
    }
}

impl FromStr for Acquisition {
    type Err = BlError;

    fn from_str(s: &str) -> BlResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ei" => Ok(Self::ei()),
            "pi" | "poi" => Ok(Self::pi()),
            "ucb" | "lcb" => Ok(Self::ucb()),
            "gp_hedge" => Ok(Self::gp_hedge()),
            other => Err(validation_error!("unknown acquisition function '{other}'")),
        }
    }
}

impl std::fmt::Display for Acquisition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.short_name())
    }
}

fn expected_improvement(mean: f64, std: f64, best: f64, xi: f64) -> f64 {
    let improvement = best - mean - xi;
    if std < 1e-12 {
        return improvement.max(0.0);
    }
    let z = improvement / std;
    (improvement * norm_cdf(z) + std * norm_pdf(z)).max(0.0)
}

fn probability_of_improvement(mean: f64, std: f64, best: f64, xi: f64) -> f64 {
    let improvement = best - mean - xi;
    if std < 1e-12 {
        return if improvement > 0.0 { 1.0 } else { 0.0 };
    }
    norm_cdf(improvement / std)
}

/// Standard normal cumulative distribution function, via the Abramowitz & Stegun 7.1.26 erf approximation.
pub fn norm_cdf(x: f64) -> f64 {
    if x >= 8.0 {
        return 1.0;
    }
    if x <= -8.0 {
        return 0.0;
    }

    const A1: f64 = 0.254_829_592;
    const A2: f64 = -0.284_496_736;
    const A3: f64 = 1.421_413_741;
    const A4: f64 = -1.453_152_027;
    const A5: f64 = 1.061_405_429;
    const P: f64 = 0.327_591_1;

    // The polynomial approximates erf, so scale to x / sqrt(2).
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let u = x.abs() / std::f64::consts::SQRT_2;
    let t = 1.0 / (1.0 + P * u);
    let erf = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-u * u).exp();

    0.5 * (1.0 + sign * erf)
}

/// Standard normal probability density function.
pub fn norm_pdf(x: f64) -> f64 {
    const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;
    INV_SQRT_2PI * (-0.5 * x * x).exp()
}

/// Gain bookkeeping for [`Acquisition::GpHedge`].
#[derive(Debug, Clone)]
pub struct Hedge {
    eta: f64,
    gains: [f64; 3],
}

impl Hedge {
    pub fn new(eta: f64) -> Self {
        Self {
            eta,
            gains: [0.0; 3],
        }
    }

    /// The portfolio members, in gain order.
    pub fn members() -> [Acquisition; 3] {
        [
            Acquisition::ei(),
            Acquisition::pi(),
            Acquisition::LowerConfidenceBound { kappa: 1.96 },
        ]
    }

    pub fn probabilities(&self) -> [f64; 3] {
        let max = self.gains.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let weights = self.gains.map(|g| (self.eta * (g - max)).exp());
        let total: f64 = weights.iter().sum();
        weights.map(|w| w / total)
    }

    /// Pick a member index with softmax probabilities.
    pub fn choose<R: Rng>(&self, rng: &mut R) -> usize {
        let probs = self.probabilities();
        let draw: f64 = rng.random_range(0.0..1.0);
        let mut cumulative = 0.0;
        for (idx, p) in probs.iter().enumerate() {
            cumulative += p;
            if draw < cumulative {
                return idx;
            }
        }
        probs.len() - 1
    }

    /// Reward each member by how low the refitted model predicts its last candidate.
    pub fn update(&mut self, predicted_means: [f64; 3]) {
        for (gain, mean) in self.gains.iter_mut().zip(predicted_means) {
            *gain -= mean;
        }
    }

    pub fn gains(&self) -> [f64; 3] {
        self.gains
    }
}
