use crate::error::{invalid, GeneratorError, Result};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Magnitude of latent loadings (and of the rescaled loading rows)
pub const LOADING_SCALE: f64 = 0.12;

/// Fraction of observed variables each latent variable touches
pub const LOADING_DENSITY: f64 = 0.8;

/// Weight of an edge switched on by the toggle update
pub const TOGGLE_WEIGHT: f64 = 0.12;

/// How consecutive snapshots are derived from one another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variant {
    /// Toggle a few edges of Θ, add normalized noise to the latent
    /// loadings
    #[serde(rename = "evolving-L")]
    EvolvingLatent,

    /// Gaussian drift on Θ with degree re-capping, noise on the
    /// latent loadings
    #[serde(rename = "evolving-both")]
    EvolvingBoth,

    /// Toggle a few edges of Θ and a single latent loading
    #[serde(rename = "l1")]
    ToggleLoading,

    /// Gaussian drift on Θ against one latent matrix computed once
    #[serde(rename = "fixed-L")]
    FixedLatent,
}

impl Variant {
    pub fn name(&self) -> &'static str {
        match self {
            Variant::EvolvingLatent => "evolving-L",
            Variant::EvolvingBoth => "evolving-both",
            Variant::ToggleLoading => "l1",
            Variant::FixedLatent => "fixed-L",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = GeneratorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "evolving-L" | "evolving-l" | "l1l2" => Ok(Variant::EvolvingLatent),
            "evolving-both" | "evolving" => Ok(Variant::EvolvingBoth),
            "l1" => Ok(Variant::ToggleLoading),
            "fixed-L" | "fixed-l" | "fixed" => Ok(Variant::FixedLatent),
            _ => invalid!("unknown variant '{}'", s),
        }
    }
}

/// Bounded retry for any randomized construction or perturbation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 200 }
    }
}

impl RetryPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            invalid!("max_attempts must be at least 1");
        }
        Ok(())
    }
}

/// Parameters for the evolving precision/latent sequence generators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceParams {
    /// Number of observed variables (n)
    pub n_observed: usize,
    /// Rank of the latent contribution (k)
    pub n_latent: usize,
    /// Number of snapshots (T)
    pub num_steps: usize,
    /// Maximum number of off-diagonal nonzeros per row of Θ
    pub degree: usize,
    /// Size of each perturbation
    pub epsilon: f64,
    /// Toggle `ceil(n / 20)` edges per step instead of one
    pub proportional: bool,
    /// Eigenvalues with `|λ| < eigen_tol` count as zero
    pub eigen_tol: f64,
    pub retry: RetryPolicy,
}

impl Default for SequenceParams {
    fn default() -> Self {
        Self {
            n_observed: 10,
            n_latent: 2,
            num_steps: 10,
            degree: 2,
            epsilon: 1e-3,
            proportional: false,
            eigen_tol: 1e-12,
            retry: RetryPolicy::default(),
        }
    }
}

impl SequenceParams {
    /// Reject parameter combinations that can never produce a valid
    /// sequence
    pub fn validate(&self) -> Result<()> {
        if self.n_observed < 2 {
            invalid!("n_observed must be at least 2, got {}", self.n_observed);
        }
        if self.n_latent >= self.n_observed {
            invalid!(
                "n_latent ({}) must be smaller than n_observed ({}) for rank(L) = n_latent",
                self.n_latent,
                self.n_observed
            );
        }
        if self.num_steps == 0 {
            invalid!("num_steps must be at least 1");
        }
        if self.degree == 0 || self.degree >= self.n_observed {
            invalid!(
                "degree ({}) must lie in 1..{} for n_observed = {}",
                self.degree,
                self.n_observed,
                self.n_observed
            );
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            invalid!("epsilon must be positive and finite, got {}", self.epsilon);
        }
        if !(self.eigen_tol.is_finite() && self.eigen_tol >= 0.0) {
            invalid!("eigen_tol must be non-negative, got {}", self.eigen_tol);
        }
        self.retry.validate()
    }

    /// Number of edges toggled per step
    pub fn edges_per_step(&self) -> usize {
        if self.proportional {
            self.n_observed.div_ceil(20)
        } else {
            1
        }
    }
}
