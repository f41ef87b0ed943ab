//! # bl-optimizer
//!
//! Gaussian-process Bayesian optimization for BayesLab.
//!
//! Two front ends share one surrogate engine:
//!
//! - [`gp_minimize`] minimizes a function of a positional point over a
//!   [`Space`](bl_types::Space) of typed dimensions and returns the full
//!   evaluation history.
//! - [`BayesianOptimization`] maximizes a function of named parameters
//!   within [`Bounds`](bl_types::Bounds), printing a progress table as it goes.

mod acquisition;
mod gp;
mod kernel;
mod maximize;
mod minimize;
mod plot;
mod progress;
mod suggest;

pub use acquisition::{norm_cdf, norm_pdf, Acquisition, Hedge};
pub use gp::{GaussianProcess, GpConfig};
pub use kernel::Kernel;
pub use maximize::{BayesianOptimization, Evaluation, MaximizeConfig};
pub use minimize::{gp_minimize, MinimizeConfig, MinimizeResult};
pub use plot::{convergence_trace, render_convergence};
pub use progress::{ProgressTable, Verbosity};
pub use suggest::{rng_from_state, AcquisitionOptimizer, Proposer};
