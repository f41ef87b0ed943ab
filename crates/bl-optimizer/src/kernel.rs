//! Stationary covariance kernels.

use serde::{Deserialize, Serialize};

const SQRT_5: f64 = 2.236_067_977_499_79;

/// Isotropic kernel with unit signal variance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kernel {
    /// Matérn with ν = 5/2.
    #[default]
    Matern52,
    /// Squared exponential.
    Rbf,
}

impl Kernel {
    /// Covariance between two points at the given length scale.
    pub fn eval(self, a: &[f64], b: &[f64], length_scale: f64) -> f64 {
        let sq_dist: f64 = a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum();
        self.eval_sq_dist(sq_dist, length_scale)
    }

    pub fn eval_sq_dist(self, sq_dist: f64, length_scale: f64) -> f64 {
        match self {
            Self::Matern52 => {
                let r = sq_dist.sqrt() / length_scale;
                (1.0 + SQRT_5 * r + 5.0 / 3.0 * r * r) * (-SQRT_5 * r).exp()
            }
            Self::Rbf => (-sq_dist / (2.0 * length_scale * length_scale)).exp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_variance_at_zero_distance() {
        for kernel in [Kernel::Matern52, Kernel::Rbf] {
            assert!((kernel.eval(&[0.3, 0.4], &[0.3, 0.4], 0.5) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn decays_with_distance() {
        for kernel in [Kernel::Matern52, Kernel::Rbf] {
            let near = kernel.eval(&[0.0], &[0.1], 0.5);
            let far = kernel.eval(&[0.0], &[0.9], 0.5);
            assert!(near > far && far > 0.0, "{kernel:?}: {near} vs {far}");
        }
    }

    #[test]
    fn rbf_matches_closed_form() {
        let k = Kernel::Rbf.eval(&[0.0, 0.0], &[1.0, 0.0], 1.0);
        assert!((k - (-0.5f64).exp()).abs() < 1e-12);
    }
}
