use crate::params::Variant;

use matrix_util::traits::MatOps;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// One time point of an evolving sequence.
///
/// Every field is an owned matrix; a snapshot never shares storage
/// with its predecessor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Sparse precision Θ (n × n)
    pub theta: DMatrix<f64>,
    /// Latent loadings K (k × n)
    pub loading: DMatrix<f64>,
    /// Low-rank latent contribution L = K'K (n × n)
    pub latent: DMatrix<f64>,
    /// Marginal precision of the observed variables Θ - L
    pub observed: DMatrix<f64>,
}

impl Snapshot {
    /// Derive `L = K'K` and `Θ - L` from `theta` and `loading`
    pub fn new(theta: DMatrix<f64>, loading: DMatrix<f64>) -> Self {
        let latent = loading.tr_mul(&loading).symmetrize();
        let observed = &theta - &latent;
        Snapshot {
            theta,
            loading,
            latent,
            observed,
        }
    }

    /// Keep `latent` (and its loadings) and swap in a new `theta`
    pub fn with_theta(&self, theta: DMatrix<f64>) -> Self {
        let observed = &theta - &self.latent;
        Snapshot {
            theta,
            loading: self.loading.clone(),
            latent: self.latent.clone(),
            observed,
        }
    }

    pub fn n_observed(&self) -> usize {
        self.theta.nrows()
    }

    pub fn n_latent(&self) -> usize {
        self.loading.nrows()
    }
}

/// A complete, validated sequence of snapshots `t = 0..T`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecisionSequence {
    /// `None` for sequences not driven by a perturbation variant
    variant: Option<Variant>,
    snapshots: Vec<Snapshot>,
}

impl PrecisionSequence {
    pub(crate) fn new(variant: Option<Variant>, snapshots: Vec<Snapshot>) -> Self {
        PrecisionSequence { variant, snapshots }
    }

    pub fn variant(&self) -> Option<Variant> {
        self.variant
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn get(&self, t: usize) -> Option<&Snapshot> {
        self.snapshots.get(t)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Snapshot> {
        self.snapshots.iter()
    }

    pub fn thetas(&self) -> Vec<&DMatrix<f64>> {
        self.snapshots.iter().map(|s| &s.theta).collect()
    }

    pub fn observed_precisions(&self) -> Vec<&DMatrix<f64>> {
        self.snapshots.iter().map(|s| &s.observed).collect()
    }

    pub fn latents(&self) -> Vec<&DMatrix<f64>> {
        self.snapshots.iter().map(|s| &s.latent).collect()
    }

    pub fn into_snapshots(self) -> Vec<Snapshot> {
        self.snapshots
    }
}

impl<'a> IntoIterator for &'a PrecisionSequence {
    type Item = &'a Snapshot;
    type IntoIter = std::slice::Iter<'a, Snapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.snapshots.iter()
    }
}

/// Sequence of `(Θ_t, Θ_t - L)` pairs sharing one latent matrix `L`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedLatentSequence {
    loading: DMatrix<f64>,
    latent: DMatrix<f64>,
    steps: Vec<(DMatrix<f64>, DMatrix<f64>)>,
}

impl FixedLatentSequence {
    pub(crate) fn from_sequence(seq: PrecisionSequence) -> Option<Self> {
        let mut snapshots = seq.into_snapshots().into_iter();
        let first = snapshots.next()?;
        let Snapshot {
            theta,
            loading,
            latent,
            observed,
        } = first;

        let mut steps = vec![(theta, observed)];
        steps.extend(snapshots.map(|s| (s.theta, s.observed)));

        Some(FixedLatentSequence {
            loading,
            latent,
            steps,
        })
    }

    pub fn latent(&self) -> &DMatrix<f64> {
        &self.latent
    }

    pub fn loading(&self) -> &DMatrix<f64> {
        &self.loading
    }

    /// `(Θ_t, Θ_t - L)` for `t = 0..T`
    pub fn steps(&self) -> &[(DMatrix<f64>, DMatrix<f64>)] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_latent_is_gram_matrix() {
        let kk = DMatrix::from_row_slice(1, 3, &[0.1, 0.0, 0.2]);
        let snap = Snapshot::new(DMatrix::identity(3, 3), kk);

        assert_eq!(snap.latent[(0, 2)], 0.1 * 0.2);
        assert_eq!(snap.latent[(1, 1)], 0.0);
        assert_eq!(snap.observed[(0, 0)], 1.0 - 0.1 * 0.1);
        assert_eq!(snap.n_latent(), 1);
        assert_eq!(snap.n_observed(), 3);
    }

    #[test]
    fn test_empty_loading_gives_zero_latent() {
        let snap = Snapshot::new(DMatrix::identity(4, 4), DMatrix::zeros(0, 4));
        assert_eq!(snap.latent, DMatrix::zeros(4, 4));
        assert_eq!(snap.observed, DMatrix::identity(4, 4));
    }
}
