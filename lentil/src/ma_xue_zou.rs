//! One-shot latent-variable precision in the style of Ma, Xue & Zou
//! (2012): a random sparse joint precision over observed and hidden
//! variables, marginalised onto the observed block by a Schur
//! complement.

use crate::error::{invalid, GeneratorError, Result, Violation};
use crate::params::RetryPolicy;
use crate::retry::with_retry;
use crate::validate::{check_pos_def, check_rank};

use log::info;
use matrix_util::traits::{MatOps, SampleOps, SpectralOps};
use nalgebra::DMatrix;
use rand::seq::index;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaXueZouParams {
    pub n_observed: usize,
    /// Defaults to `n_observed`
    pub n_hidden: Option<usize>,
    /// Floor of the diagonal shift that makes the joint matrix
    /// positive definite
    pub epsilon: f64,
    /// Fraction of nonzero entries in the random factor `W`
    pub sparsity: f64,
    pub eigen_tol: f64,
    pub retry: RetryPolicy,
}

impl Default for MaXueZouParams {
    fn default() -> Self {
        Self {
            n_observed: 12,
            n_hidden: None,
            epsilon: 1e-3,
            sparsity: 0.1,
            eigen_tol: 1e-12,
            retry: RetryPolicy::default(),
        }
    }
}

impl MaXueZouParams {
    pub fn n_hidden(&self) -> usize {
        self.n_hidden.unwrap_or(self.n_observed)
    }

    pub fn validate(&self) -> Result<()> {
        let ph = self.n_hidden();
        if self.n_observed == 0 || ph == 0 {
            invalid!(
                "need at least one observed and one hidden variable, got {} and {}",
                self.n_observed,
                ph
            );
        }
        if ph > self.n_observed {
            invalid!(
                "n_hidden ({}) cannot exceed n_observed ({}) for a rank-{} latent term",
                ph,
                self.n_observed,
                ph
            );
        }
        if !(self.sparsity > 0.0 && self.sparsity <= 1.0) {
            invalid!("sparsity must lie in (0, 1], got {}", self.sparsity);
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            invalid!("epsilon must be positive and finite, got {}", self.epsilon);
        }
        self.retry.validate()
    }
}

/// Joint precision `K` and its marginal onto the observed block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaXueZou {
    /// `K_O - K_OH K_H^{-1} K_HO`
    pub observed_precision: DMatrix<f64>,
    /// `K_OH K_H^{-1} K_HO`
    pub latent: DMatrix<f64>,
    /// Joint precision over observed and hidden variables
    pub joint: DMatrix<f64>,
    pub n_hidden: usize,
}

/// Draw a joint precision and marginalise it onto the observed block
pub fn generate_ma_xue_zou<R>(params: &MaXueZouParams, rng: &mut R) -> Result<MaXueZou>
where
    R: Rng + ?Sized,
{
    params.validate()?;
    let po = params.n_observed;
    let ph = params.n_hidden();

    info!(
        "Ma-Xue-Zou: {} observed, {} hidden, sparsity {}",
        po, ph, params.sparsity
    );

    with_retry(&params.retry, "ma-xue-zou", |_| {
        let joint = random_joint_precision(rng, po, ph, params.sparsity, params.epsilon);
        marginalize(joint, po, ph, params.eigen_tol)
    })
    .map_err(|(attempts, violation)| GeneratorError::ConstraintViolation {
        attempts,
        violation,
    })
}

/// `C = W'W` for a sparse Gaussian `W`, plus noise in the
/// observed-hidden block, symmetrised, clipped to `[-1, 1]` and
/// shifted by `max(-1.2 λ_min, epsilon)` on the diagonal
pub fn random_joint_precision<R>(
    rng: &mut R,
    n_observed: usize,
    n_hidden: usize,
    sparsity: f64,
    epsilon: f64,
) -> DMatrix<f64>
where
    R: Rng + ?Sized,
{
    let pp = n_observed + n_hidden;
    let nnz = ((pp * pp) as f64 * sparsity) as usize;

    let mut ww = DMatrix::<f64>::zeros(pp, pp);
    for idx in index::sample(rng, pp * pp, nnz) {
        ww[idx] = rng.sample(StandardNormal);
    }

    let mut cc = ww.tr_mul(&ww);
    let noise = DMatrix::<f64>::rnorm(n_observed, n_hidden, rng) * 0.5;
    let mut cross = cc.view_mut((0, n_observed), (n_observed, n_hidden));
    cross += noise;
    let mut cc = cc.symmetrize();
    cc.apply(|x| *x = x.clamp(-1.0, 1.0));

    let shift = (-1.2 * cc.min_eigenvalue()).max(epsilon);
    cc + DMatrix::<f64>::identity(pp, pp) * shift
}

/// Marginal precision of the first `n_observed` variables of `joint`.
///
/// Fails with `InvalidParameter` unless `joint` is square with
/// `n_observed + n_hidden` rows, and with `ConstraintViolation` if the
/// hidden block is not positive definite, the latent term does not
/// have rank `n_hidden`, or the result is not positive definite.
pub fn schur_complement(
    joint: &DMatrix<f64>,
    n_observed: usize,
    n_hidden: usize,
    eigen_tol: f64,
) -> Result<MaXueZou> {
    if !joint.is_square() {
        invalid!("joint precision must be square, got {:?}", joint.shape());
    }
    if n_observed + n_hidden != joint.nrows() {
        invalid!(
            "observed ({}) + hidden ({}) does not match the {} x {} joint precision",
            n_observed,
            n_hidden,
            joint.nrows(),
            joint.ncols()
        );
    }
    if n_observed == 0 || n_hidden == 0 {
        invalid!("both blocks must be non-empty");
    }
    marginalize(joint.clone(), n_observed, n_hidden, eigen_tol).map_err(|violation| {
        GeneratorError::ConstraintViolation {
            attempts: 1,
            violation,
        }
    })
}

fn marginalize(
    joint: DMatrix<f64>,
    po: usize,
    ph: usize,
    eigen_tol: f64,
) -> std::result::Result<MaXueZou, Violation> {
    let ko = joint.view((0, 0), (po, po)).clone_owned();
    let koh = joint.view((0, po), (po, ph)).clone_owned();
    let kho = joint.view((po, 0), (ph, po)).clone_owned();
    let kh = joint.view((po, po), (ph, ph)).clone_owned();

    check_pos_def("hidden block", &kh, eigen_tol)?;
    let chol = kh
        .cholesky()
        .ok_or(Violation::Degenerate { what: "hidden block" })?;

    let latent = (koh * chol.solve(&kho)).symmetrize();
    check_rank("latent", &latent, ph.min(po))?;

    let observed_precision = &ko - &latent;
    check_pos_def("marginal precision", &observed_precision, eigen_tol)?;

    Ok(MaXueZou {
        observed_precision,
        latent,
        joint,
        n_hidden: ph,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_joint_is_pos_def() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let kk = random_joint_precision(&mut rng, 6, 6, 0.1, 1e-3);
        assert_eq!(kk.shape(), (12, 12));
        assert!(kk.is_pos_def(1e-12));
    }

    #[test]
    fn test_marginal_is_pos_def() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let ret = generate_ma_xue_zou(&MaXueZouParams::default(), &mut rng).unwrap();
        assert_eq!(ret.observed_precision.shape(), (12, 12));
        assert_eq!(ret.joint.shape(), (24, 24));
        assert!(ret.observed_precision.is_pos_def(1e-12));
        assert!(ret.latent.is_pos_semidef(1e-10));
    }

    #[test]
    fn test_block_sizes_must_match() {
        let joint = DMatrix::<f64>::identity(10, 10) * 2.0;
        let err = schur_complement(&joint, 6, 6, 1e-12).unwrap_err();
        assert!(matches!(err, GeneratorError::InvalidParameter(_)));

        let err = schur_complement(&DMatrix::zeros(4, 5), 2, 2, 1e-12).unwrap_err();
        assert!(matches!(err, GeneratorError::InvalidParameter(_)));
    }

    #[test]
    fn test_too_many_hidden() {
        let params = MaXueZouParams {
            n_observed: 3,
            n_hidden: Some(4),
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(GeneratorError::InvalidParameter(_))
        ));
    }
}
