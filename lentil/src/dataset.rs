use crate::error::{GeneratorError, Result, Violation};
use crate::snapshot::Snapshot;

use log::info;
use matrix_util::traits::{MatOps, SpectralOps};
use nalgebra::DMatrix;

/// Turns a covariance matrix into observations. Implementations live
/// outside this crate (e.g. a multivariate normal sampler).
pub trait ObservationSampler {
    /// `n_samples × n` draws with the given `n × n` covariance
    fn sample(&mut self, covariance: &DMatrix<f64>, n_samples: usize)
        -> anyhow::Result<DMatrix<f64>>;
}

/// Per-snapshot covariances and the observations drawn from them
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianDataset {
    pub covariances: Vec<DMatrix<f64>>,
    pub data: Vec<DMatrix<f64>>,
}

/// `Σ = (Θ - L)^{-1}`, symmetrised and rescaled to unit diagonal
pub fn covariance_from_precision(precision: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let degenerate = |what| GeneratorError::ConstraintViolation {
        attempts: 1,
        violation: Violation::Degenerate { what },
    };

    if !precision.is_square() {
        return Err(GeneratorError::InvalidParameter(format!(
            "precision must be square, got {:?}",
            precision.shape()
        )));
    }
    if !precision.is_pos_def(0.0) {
        return Err(GeneratorError::ConstraintViolation {
            attempts: 1,
            violation: Violation::NotPositiveDefinite {
                what: "precision",
                min_eigenvalue: precision.min_eigenvalue(),
            },
        });
    }

    let mut sigma = precision
        .clone()
        .cholesky()
        .ok_or_else(|| degenerate("precision"))?
        .inverse()
        .symmetrize();
    sigma
        .unit_diagonal_inplace()
        .map_err(|_| degenerate("covariance"))?;
    Ok(sigma)
}

/// Draw `n_samples` observations per snapshot from the normalized
/// covariance of its observed precision `Θ_t - L_t`
pub fn build_gaussian_dataset<S>(
    snapshots: &[Snapshot],
    n_samples: usize,
    sampler: &mut S,
) -> Result<GaussianDataset>
where
    S: ObservationSampler + ?Sized,
{
    if n_samples == 0 {
        return Err(GeneratorError::InvalidParameter(
            "n_samples must be positive".to_string(),
        ));
    }

    let covariances = snapshots
        .iter()
        .map(|s| covariance_from_precision(&s.observed))
        .collect::<Result<Vec<_>>>()?;

    let data = covariances
        .iter()
        .map(|sigma| sampler.sample(sigma, n_samples).map_err(GeneratorError::from))
        .collect::<Result<Vec<_>>>()?;

    info!(
        "gaussian dataset: {} time points x {} samples",
        data.len(),
        n_samples
    );

    Ok(GaussianDataset { covariances, data })
}
