//! Sequences with a drifting spectrum on fixed random eigenbases:
//!
//! ```text
//! Θ_t = Q diag(σ_t) Q'      (entries below epsilon dropped)
//! L_t = R diag(λ_t) R'      (λ_t nonzero on n_latent coordinates)
//! σ_{t+1} = σ_t + 1 + U(0,1)
//! λ_{t+1} = max(λ_t + U(-1,1), 0)
//! ```

use crate::error::{invalid, GeneratorError, Result, Violation};
use crate::params::RetryPolicy;
use crate::retry::with_retry;
use crate::snapshot::{PrecisionSequence, Snapshot};
use crate::validate::{check_pos_def, check_pos_semidef};

use log::info;
use matrix_util::traits::{MatOps, SampleOps, SparsityOps};
use matrix_util::utils::sample_distinct;
use nalgebra::{DMatrix, DVector, SymmetricEigen};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectralParams {
    pub n_observed: usize,
    pub n_latent: usize,
    pub num_steps: usize,
    /// Entries of Θ below `epsilon` in magnitude are set to zero
    pub epsilon: f64,
    pub eigen_tol: f64,
    pub retry: RetryPolicy,
}

impl Default for SpectralParams {
    fn default() -> Self {
        Self {
            n_observed: 3,
            n_latent: 2,
            num_steps: 10,
            epsilon: 1e-3,
            eigen_tol: 1e-12,
            retry: RetryPolicy::default(),
        }
    }
}

impl SpectralParams {
    pub fn validate(&self) -> Result<()> {
        if self.n_observed == 0 {
            invalid!("n_observed must be positive");
        }
        if self.n_latent > self.n_observed {
            invalid!(
                "n_latent ({}) cannot exceed n_observed ({})",
                self.n_latent,
                self.n_observed
            );
        }
        if self.num_steps == 0 {
            invalid!("num_steps must be at least 1");
        }
        if !(self.epsilon.is_finite() && self.epsilon >= 0.0) {
            invalid!("epsilon must be non-negative and finite, got {}", self.epsilon);
        }
        self.retry.validate()
    }
}

/// Orthonormal basis from the eigenvectors of a random rank-one Gram
/// matrix `b'b`
pub fn random_eigenbasis<R>(rng: &mut R, nn: usize) -> DMatrix<f64>
where
    R: Rng + ?Sized,
{
    let bb = DMatrix::<f64>::runif(1, nn, rng);
    SymmetricEigen::new(bb.tr_mul(&bb)).eigenvectors
}

struct SpectralState {
    sigma: DVector<f64>,
    lambda: DVector<f64>,
}

impl SpectralState {
    fn next<R: Rng + ?Sized>(&self, rng: &mut R, latent_idx: &[usize]) -> Self {
        let nn = self.sigma.len();
        let sigma = &self.sigma + DVector::from_fn(nn, |_, _| 1.0 + rng.random::<f64>());
        let mut lambda = self.lambda.clone();
        for &i in latent_idx {
            lambda[i] = (lambda[i] + rng.random::<f64>() * 2.0 - 1.0).max(0.0);
        }
        SpectralState { sigma, lambda }
    }

    fn snapshot(
        &self,
        qq: &DMatrix<f64>,
        rr: &DMatrix<f64>,
        latent_idx: &[usize],
        epsilon: f64,
    ) -> Snapshot {
        let nn = qq.nrows();
        let mut theta = (qq * DMatrix::from_diagonal(&self.sigma) * qq.transpose()).symmetrize();
        theta.zero_below_inplace(epsilon);

        let loading = DMatrix::from_fn(latent_idx.len(), nn, |a, j| {
            self.lambda[latent_idx[a]].sqrt() * rr[(j, latent_idx[a])]
        });
        Snapshot::new(theta, loading)
    }
}

fn check_spectral(snap: &Snapshot, eigen_tol: f64) -> std::result::Result<(), Violation> {
    check_pos_def("theta", &snap.theta, eigen_tol)?;
    check_pos_semidef("latent", &snap.latent, eigen_tol)?;
    check_pos_def("theta - latent", &snap.observed, eigen_tol)
}

/// Sequence of snapshots whose observed and latent spectra drift on
/// fixed random eigenbases. Θ here is not degree-bounded.
pub fn generate_spectral_sequence<R>(params: &SpectralParams, rng: &mut R) -> Result<PrecisionSequence>
where
    R: Rng + ?Sized,
{
    params.validate()?;
    let nn = params.n_observed;

    info!(
        "spectral sequence: {} observed, {} latent, T = {}",
        nn, params.n_latent, params.num_steps
    );

    let qq = random_eigenbasis(rng, nn);
    let rr = random_eigenbasis(rng, nn);
    let coordinates: Vec<usize> = (0..nn).collect();

    let (mut state, latent_idx, first) = with_retry(&params.retry, "spectral init", |_| {
        let latent_idx = sample_distinct(rng, &coordinates, params.n_latent);
        let sigma = DVector::from_fn(nn, |_, _| 1.0 + rng.random::<f64>());
        let mut lambda = DVector::<f64>::zeros(nn);
        for &i in latent_idx.iter() {
            lambda[i] = rng.random::<f64>();
        }
        let state = SpectralState { sigma, lambda };
        let snap = state.snapshot(&qq, &rr, &latent_idx, params.epsilon);
        check_spectral(&snap, params.eigen_tol)?;
        Ok((state, latent_idx, snap))
    })
    .map_err(|(attempts, violation)| GeneratorError::ConstraintViolation {
        attempts,
        violation,
    })?;

    let mut snapshots = Vec::with_capacity(params.num_steps);
    snapshots.push(first);

    for step in 1..params.num_steps {
        let (next_state, snap) = with_retry(&params.retry, "spectral step", |_| {
            let next_state = state.next(rng, &latent_idx);
            let snap = next_state.snapshot(&qq, &rr, &latent_idx, params.epsilon);
            check_spectral(&snap, params.eigen_tol)?;
            Ok((next_state, snap))
        })
        .map_err(|(attempts, last)| GeneratorError::ExhaustedRetries {
            step,
            attempts,
            last,
        })?;
        state = next_state;
        snapshots.push(snap);
    }

    Ok(PrecisionSequence::new(None, snapshots))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;

    #[test]
    fn test_eigenbasis_is_orthonormal() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let qq = random_eigenbasis(&mut rng, 5);
        let eye = qq.transpose() * &qq;
        assert_abs_diff_eq!(eye, DMatrix::identity(5, 5), epsilon = 1e-10);
    }

    #[test]
    fn test_spectral_sequence_is_valid() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0);
        let params = SpectralParams {
            n_observed: 6,
            n_latent: 2,
            num_steps: 8,
            ..Default::default()
        };
        let seq = generate_spectral_sequence(&params, &mut rng).unwrap();
        assert_eq!(seq.len(), 8);
        assert_eq!(seq.variant(), None);
        for snap in &seq {
            assert_eq!(snap.loading.nrows(), 2);
            check_spectral(snap, params.eigen_tol).unwrap();
        }
    }
}
