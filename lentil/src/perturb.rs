//! One-step updates `next = perturb(previous)`.
//!
//! Every function here takes the previous matrices by reference and
//! returns freshly allocated ones.

use crate::error::Violation;
use crate::params::{SequenceParams, Variant, LOADING_SCALE, TOGGLE_WEIGHT};
use crate::snapshot::Snapshot;

use matrix_util::traits::{MatOps, SampleOps, SparsityOps};
use matrix_util::utils::{random_offdiag_pairs, sample_distinct};
use nalgebra::DMatrix;
use rand::Rng;

/// A single perturbation strategy
pub trait Perturbation {
    fn perturb<R: Rng + ?Sized>(
        &self,
        prev: &Snapshot,
        rng: &mut R,
        params: &SequenceParams,
    ) -> Result<Snapshot, Violation>;
}

/// Toggle edges of Θ, add normalized noise to K
pub struct ToggleEdges;

/// Gaussian drift of Θ, add normalized noise to K
pub struct Drift;

/// Toggle edges of Θ and one entry of K
pub struct ToggleBoth;

/// Gaussian drift of Θ only
pub struct DriftFixedLatent;

impl Perturbation for ToggleEdges {
    fn perturb<R: Rng + ?Sized>(
        &self,
        prev: &Snapshot,
        rng: &mut R,
        params: &SequenceParams,
    ) -> Result<Snapshot, Violation> {
        let theta = toggle_edges(rng, &prev.theta, params.edges_per_step(), params.degree)?;
        let loading = perturb_loading(rng, &prev.loading, params.epsilon)?;
        Ok(Snapshot::new(theta, loading))
    }
}

impl Perturbation for Drift {
    fn perturb<R: Rng + ?Sized>(
        &self,
        prev: &Snapshot,
        rng: &mut R,
        params: &SequenceParams,
    ) -> Result<Snapshot, Violation> {
        let theta = drift_precision(rng, &prev.theta, params.degree, params.epsilon);
        let loading = perturb_loading(rng, &prev.loading, params.epsilon)?;
        Ok(Snapshot::new(theta, loading))
    }
}

impl Perturbation for ToggleBoth {
    fn perturb<R: Rng + ?Sized>(
        &self,
        prev: &Snapshot,
        rng: &mut R,
        params: &SequenceParams,
    ) -> Result<Snapshot, Violation> {
        let theta = toggle_edges(rng, &prev.theta, params.edges_per_step(), params.degree)?;
        let loading = toggle_loading(rng, &prev.loading);
        Ok(Snapshot::new(theta, loading))
    }
}

impl Perturbation for DriftFixedLatent {
    fn perturb<R: Rng + ?Sized>(
        &self,
        prev: &Snapshot,
        rng: &mut R,
        params: &SequenceParams,
    ) -> Result<Snapshot, Violation> {
        let theta = drift_precision(rng, &prev.theta, params.degree, params.epsilon);
        Ok(prev.with_theta(theta))
    }
}

impl Variant {
    /// Dispatch to the strategy of this variant
    pub fn perturb<R: Rng + ?Sized>(
        &self,
        prev: &Snapshot,
        rng: &mut R,
        params: &SequenceParams,
    ) -> Result<Snapshot, Violation> {
        match self {
            Variant::EvolvingLatent => ToggleEdges.perturb(prev, rng, params),
            Variant::EvolvingBoth => Drift.perturb(prev, rng, params),
            Variant::ToggleLoading => ToggleBoth.perturb(prev, rng, params),
            Variant::FixedLatent => DriftFixedLatent.perturb(prev, rng, params),
        }
    }
}

/// Flip `how_many` distinct off-diagonal pairs of `theta`: a zero
/// becomes `TOGGLE_WEIGHT`, a nonzero becomes zero (symmetrically).
///
/// Each pair is drawn among the flips that keep every row within
/// `degree`: existing edges, or pairs whose endpoints are both below
/// the bound. Degrees are updated after every flip. Fails with
/// `Violation::NoCandidates` once no admissible pair is left.
pub fn toggle_edges<R>(
    rng: &mut R,
    theta: &DMatrix<f64>,
    how_many: usize,
    degree: usize,
) -> Result<DMatrix<f64>, Violation>
where
    R: Rng + ?Sized,
{
    let nn = theta.nrows();
    let mut next = theta.clone();
    let mut degrees = next.offdiag_degrees();
    let mut toggled: Vec<(usize, usize)> = Vec::with_capacity(how_many);

    for _ in 0..how_many {
        let candidates: Vec<(usize, usize)> = (0..nn)
            .flat_map(|i| ((i + 1)..nn).map(move |j| (i, j)))
            .filter(|pair| !toggled.contains(pair))
            .filter(|&(i, j)| next[(i, j)] != 0.0 || (degrees[i] < degree && degrees[j] < degree))
            .collect();
        if candidates.is_empty() {
            return Err(Violation::NoCandidates { what: "edge toggle" });
        }

        let (i, j) = candidates[rng.random_range(0..candidates.len())];
        if next[(i, j)] == 0.0 {
            next[(i, j)] = TOGGLE_WEIGHT;
            next[(j, i)] = TOGGLE_WEIGHT;
            degrees[i] += 1;
            degrees[j] += 1;
        } else {
            next[(i, j)] = 0.0;
            next[(j, i)] = 0.0;
            degrees[i] -= 1;
            degrees[j] -= 1;
        }
        toggled.push((i, j));
    }
    Ok(next)
}

/// Flip `how_many` distinct random off-diagonal pairs of `theta` with
/// no degree bound; a zero becomes `new_weight(rng)`, a nonzero becomes
/// zero
pub fn toggle_edges_with<R, F>(
    rng: &mut R,
    theta: &DMatrix<f64>,
    how_many: usize,
    mut new_weight: F,
) -> DMatrix<f64>
where
    R: Rng + ?Sized,
    F: FnMut(&mut R) -> f64,
{
    let mut next = theta.clone();
    for (r, c) in random_offdiag_pairs(rng, next.nrows(), how_many) {
        let x = if next[(r, c)] == 0.0 {
            new_weight(rng)
        } else {
            0.0
        };
        next[(r, c)] = x;
        next[(c, r)] = x;
    }
    next
}

/// Add a symmetric zero-diagonal Gaussian perturbation of Frobenius
/// norm `epsilon`, drop entries below `2 * epsilon / n`, then cut rows
/// back to at most `degree` off-diagonal nonzeros.
pub fn drift_precision<R>(
    rng: &mut R,
    theta: &DMatrix<f64>,
    degree: usize,
    epsilon: f64,
) -> DMatrix<f64>
where
    R: Rng + ?Sized,
{
    let nn = theta.nrows();
    let draws = DMatrix::<f64>::rnorm(nn, degree, rng);
    let mut addition = DMatrix::<f64>::zeros(nn, nn);
    for i in 0..nn {
        for a in 0..degree {
            let j = rng.random_range(0..nn);
            addition[(i, j)] = draws[(i, a)];
        }
    }
    addition.mirror_upper_inplace();
    addition.fill_diagonal(0.0);
    addition.scale_to_norm_inplace(epsilon);

    let mut next = theta + addition;
    next.zero_below_inplace(2.0 * epsilon / nn as f64);
    cap_degree(rng, &mut next, degree);
    next
}

/// Zero randomly chosen excess connections until every row has at
/// most `degree` off-diagonal nonzeros
pub fn cap_degree<R>(rng: &mut R, theta: &mut DMatrix<f64>, degree: usize)
where
    R: Rng + ?Sized,
{
    for j in 0..theta.nrows() {
        let support = theta.offdiag_support(j);
        if support.len() > degree {
            for c in sample_distinct(rng, &support, support.len() - degree) {
                theta[(j, c)] = 0.0;
                theta[(c, j)] = 0.0;
            }
        }
    }
}

/// `K + U` with `|U| = epsilon`, rows rescaled to sum to
/// `LOADING_SCALE`, entries below `epsilon / n` dropped
pub fn perturb_loading<R>(
    rng: &mut R,
    loading: &DMatrix<f64>,
    epsilon: f64,
) -> Result<DMatrix<f64>, Violation>
where
    R: Rng + ?Sized,
{
    let (kk, nn) = loading.shape();
    if kk == 0 {
        return Ok(loading.clone());
    }

    let mut addition = DMatrix::<f64>::runif(kk, nn, rng);
    addition.scale_to_norm_inplace(epsilon);

    let mut next = loading + addition;
    next.normalize_rows_by_sum_inplace()
        .map_err(|_| Violation::Degenerate { what: "loading" })?;
    next *= LOADING_SCALE;
    next.zero_below_inplace(epsilon / nn as f64);
    Ok(next)
}

/// Flip one random entry of K: zero becomes `LOADING_SCALE`, nonzero
/// becomes zero
pub fn toggle_loading<R>(rng: &mut R, loading: &DMatrix<f64>) -> DMatrix<f64>
where
    R: Rng + ?Sized,
{
    let mut next = loading.clone();
    let (kk, nn) = next.shape();
    if kk == 0 || nn == 0 {
        return next;
    }
    let r = rng.random_range(0..kk);
    let c = rng.random_range(0..nn);
    next[(r, c)] = if next[(r, c)] == 0.0 { LOADING_SCALE } else { 0.0 };
    next
}
