use crate::error::{GeneratorError, Result};
use crate::params::{SequenceParams, Variant, LOADING_DENSITY, LOADING_SCALE};
use crate::retry::with_retry;
use crate::snapshot::Snapshot;
use crate::validate::{check_snapshot, Constraints};

use log::info;
use matrix_util::traits::SparsityOps;
use matrix_util::utils::sample_distinct;
use nalgebra::DMatrix;
use rand::Rng;

/// Latent loadings K (k × n). Each latent row touches a random
/// `LOADING_DENSITY` fraction of the observed columns with weights
/// `U(0,1) * scale`; the other columns stay zero.
pub fn random_loading<R>(rng: &mut R, n_latent: usize, n_observed: usize, scale: f64) -> DMatrix<f64>
where
    R: Rng + ?Sized,
{
    let ncols = (n_observed as f64 * LOADING_DENSITY) as usize;
    let columns: Vec<usize> = (0..n_observed).collect();

    let mut kk = DMatrix::<f64>::zeros(n_latent, n_observed);
    for i in 0..n_latent {
        for j in sample_distinct(rng, &columns, ncols) {
            kk[(i, j)] = rng.random::<f64>() * scale;
        }
    }
    kk
}

/// Loadings for a latent matrix that stays fixed over time: unscaled
/// uniform weights, then rescaled so that `max(K'K) = 0.12 / sqrt(n)`
pub fn fixed_latent_loading<R>(rng: &mut R, n_latent: usize, n_observed: usize) -> DMatrix<f64>
where
    R: Rng + ?Sized,
{
    let mut kk = random_loading(rng, n_latent, n_observed, 1.0);
    let lmax = kk.tr_mul(&kk).max();
    if lmax > 0.0 {
        let target = LOADING_SCALE / (n_observed as f64).sqrt();
        kk *= (target / lmax).sqrt();
    }
    kk
}

/// Sparse precision starting from the identity. Each row that is still
/// below `degree` is connected to randomly chosen rows that are also
/// below the bound, with weight `0.5 / degree`.
pub fn degree_bounded_precision<R>(rng: &mut R, n_observed: usize, degree: usize) -> DMatrix<f64>
where
    R: Rng + ?Sized,
{
    let weight = 0.5 / degree as f64;
    let mut theta = DMatrix::<f64>::identity(n_observed, n_observed);
    let mut degrees = vec![0usize; n_observed];

    for i in 0..n_observed {
        if degrees[i] >= degree {
            continue;
        }
        let candidates: Vec<usize> = (0..n_observed)
            .filter(|&j| j != i && theta[(i, j)] == 0.0 && degrees[j] < degree)
            .collect();
        if candidates.is_empty() {
            continue;
        }
        for j in sample_distinct(rng, &candidates, degree - degrees[i]) {
            theta[(i, j)] = weight;
            theta[(j, i)] = weight;
            degrees[i] += 1;
            degrees[j] += 1;
        }
    }
    theta
}

/// First snapshot `(Θ_0, K_0, L_0)` satisfying every invariant.
/// Construction is redrawn up to `params.retry.max_attempts` times.
pub fn initial_snapshot<R>(rng: &mut R, params: &SequenceParams, variant: Variant) -> Result<Snapshot>
where
    R: Rng + ?Sized,
{
    let constraints = Constraints {
        n_latent: params.n_latent,
        degree: Some(params.degree),
        eigen_tol: params.eigen_tol,
    };

    let snap = with_retry(&params.retry, "initial state", |_| {
        let loading = match variant {
            Variant::FixedLatent => {
                fixed_latent_loading(rng, params.n_latent, params.n_observed)
            }
            _ => random_loading(rng, params.n_latent, params.n_observed, LOADING_SCALE),
        };
        let theta = degree_bounded_precision(rng, params.n_observed, params.degree);
        let snap = Snapshot::new(theta, loading);
        check_snapshot(&snap, &constraints)?;
        Ok(snap)
    })
    .map_err(|(attempts, violation)| GeneratorError::ConstraintViolation {
        attempts,
        violation,
    })?;

    info!(
        "initial state: {} edges, max |L| = {:.4}",
        snap.theta.offdiag_degrees().iter().sum::<usize>() / 2,
        snap.latent.amax()
    );
    Ok(snap)
}
