//! Count data on evolving sparse graphs.
//!
//! `generate_poisson_sequence` builds a sequence of weighted adjacency
//! ("theta") matrices from a random graph family; `sample_poisson`
//! draws counts consistent with one such matrix, either by the LPGM
//! construction (sums of independent Poisson components shared along
//! edges) or by a fixed-budget Gibbs sampler on the Poisson
//! conditionals.

use crate::error::{invalid, GeneratorError, Result};
use crate::graph::{random_graph, AdjacencyMatrix, GraphFamily, GraphParams};
use crate::perturb::toggle_edges_with;

use log::{info, warn};
use matrix_util::traits::SparsityOps;
use nalgebra::DMatrix;
use rand::Rng;
use rand_distr::{Distribution, Normal, Poisson};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type CountMatrix = DMatrix<u64>;

/// Mean and standard deviation of the weight of a newly toggled edge
const NEW_EDGE_WEIGHT: (f64, f64) = (0.1, 0.01);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdateMode {
    /// Toggle `n_to_change` random pairs per step
    #[serde(rename = "l1")]
    Toggle,
    /// Keep the initial graph at every step
    #[serde(rename = "fixed")]
    Fixed,
}

impl fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateMode::Toggle => f.write_str("l1"),
            UpdateMode::Fixed => f.write_str("fixed"),
        }
    }
}

impl FromStr for UpdateMode {
    type Err = GeneratorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "l1" | "toggle" => Ok(UpdateMode::Toggle),
            "fixed" => Ok(UpdateMode::Fixed),
            _ => invalid!("unsupported update mode '{}'", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoissonSequenceParams {
    pub n_observed: usize,
    pub num_steps: usize,
    pub family: GraphFamily,
    pub graph: GraphParams,
    pub update: UpdateMode,
    /// Pairs toggled per step
    pub n_to_change: usize,
}

impl Default for PoissonSequenceParams {
    fn default() -> Self {
        Self {
            n_observed: 10,
            num_steps: 1,
            family: GraphFamily::ErdosRenyi,
            graph: GraphParams::default(),
            update: UpdateMode::Toggle,
            n_to_change: 3,
        }
    }
}

/// Weighted adjacency matrices `G_0, ..., G_{T-1}`. `G_0` is a random
/// graph with unit weights; each later graph toggles `n_to_change`
/// random pairs of its predecessor, new edges getting weight
/// `N(0.1, 0.01²)`.
pub fn generate_poisson_sequence<R>(
    params: &PoissonSequenceParams,
    rng: &mut R,
) -> Result<Vec<AdjacencyMatrix>>
where
    R: Rng + ?Sized,
{
    if params.n_observed < 2 {
        invalid!("n_observed must be at least 2, got {}", params.n_observed);
    }
    if params.num_steps == 0 {
        invalid!("num_steps must be at least 1");
    }

    info!(
        "poisson theta sequence: {} graph on {} nodes, T = {}, update {}",
        params.family, params.n_observed, params.num_steps, params.update
    );

    let (mu, sd) = NEW_EDGE_WEIGHT;
    let weight = Normal::new(mu, sd)
        .map_err(|e| GeneratorError::InvalidParameter(e.to_string()))?;

    let mut graphs = Vec::with_capacity(params.num_steps);
    graphs.push(random_graph(
        rng,
        params.n_observed,
        params.family,
        &params.graph,
    )?);

    for t in 1..params.num_steps {
        let prev = &graphs[t - 1];
        let next = match params.update {
            UpdateMode::Toggle => {
                toggle_edges_with(rng, prev, params.n_to_change, |rng: &mut R| {
                    weight.sample(rng)
                })
            }
            UpdateMode::Fixed => prev.clone(),
        };
        graphs.push(next);
    }
    Ok(graphs)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SamplerMethod {
    #[serde(rename = "LPGM")]
    Lpgm,
    #[serde(rename = "gibbs")]
    Gibbs,
}

impl FromStr for SamplerMethod {
    type Err = GeneratorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "lpgm" => Ok(SamplerMethod::Lpgm),
            "gibbs" => Ok(SamplerMethod::Gibbs),
            _ => invalid!("unknown poisson sampler '{}'", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoissonSamplerParams {
    pub n_samples: usize,
    /// LPGM: rate of each node component, multiplier of edge weights
    pub lambda: f64,
    /// LPGM: rate of the independent background noise
    pub lambda_noise: f64,
    /// Gibbs: number of full sweeps
    pub max_iter: usize,
    /// Gibbs: per-node log baseline rate (zeros if absent)
    pub baseline: Option<Vec<f64>>,
    /// Gibbs: conditional rates are truncated at this value
    pub max_rate: f64,
}

impl Default for PoissonSamplerParams {
    fn default() -> Self {
        Self {
            n_samples: 100,
            lambda: 1.0,
            lambda_noise: 0.5,
            max_iter: 200,
            baseline: None,
            max_rate: 1e6,
        }
    }
}

fn rpois<R>(rng: &mut R, rate: f64) -> Result<u64>
where
    R: Rng + ?Sized,
{
    if rate <= 0.0 {
        return Ok(0);
    }
    let pois = Poisson::new(rate).map_err(|e| {
        GeneratorError::InvalidParameter(format!("poisson rate {}: {}", rate, e))
    })?;
    let x: f64 = pois.sample(rng);
    Ok(x as u64)
}

/// Design matrix `A = [I | e_i + e_j for each edge i < j]` and the
/// edge list giving the order of its edge columns
pub fn lpgm_design_matrix(theta: &DMatrix<f64>) -> (DMatrix<u64>, Vec<(usize, usize)>) {
    let nn = theta.nrows();
    let edges: Vec<(usize, usize)> = (0..nn)
        .flat_map(|i| ((i + 1)..nn).map(move |j| (i, j)))
        .filter(|&(i, j)| theta[(i, j)] != 0.0)
        .collect();

    let mut aa = DMatrix::<u64>::zeros(nn, nn + edges.len());
    for i in 0..nn {
        aa[(i, i)] = 1;
    }
    for (e, &(i, j)) in edges.iter().enumerate() {
        aa[(i, nn + e)] = 1;
        aa[(j, nn + e)] = 1;
    }
    (aa, edges)
}

/// Draw `n_samples × n` counts whose dependence follows `theta`
pub fn sample_poisson<R>(
    theta: &DMatrix<f64>,
    method: SamplerMethod,
    params: &PoissonSamplerParams,
    rng: &mut R,
) -> Result<CountMatrix>
where
    R: Rng + ?Sized,
{
    if !theta.is_square() || !theta.is_symmetric(0.0) {
        invalid!("theta must be a symmetric square matrix");
    }
    if params.n_samples == 0 {
        invalid!("n_samples must be positive");
    }

    match method {
        SamplerMethod::Lpgm => sample_lpgm(theta, params, rng),
        SamplerMethod::Gibbs => sample_gibbs(theta, params, rng),
    }
}

fn sample_lpgm<R>(theta: &DMatrix<f64>, params: &PoissonSamplerParams, rng: &mut R) -> Result<CountMatrix>
where
    R: Rng + ?Sized,
{
    if !(params.lambda.is_finite() && params.lambda > 0.0) {
        invalid!("lambda must be positive, got {}", params.lambda);
    }
    if !(params.lambda_noise.is_finite() && params.lambda_noise >= 0.0) {
        invalid!("lambda_noise must be non-negative, got {}", params.lambda_noise);
    }
    if theta.iter().any(|&x| x < 0.0) {
        invalid!("LPGM needs non-negative edge weights");
    }

    let nn = theta.nrows();
    let ns = params.n_samples;
    let (aa, edges) = lpgm_design_matrix(theta);

    let rates: Vec<f64> = std::iter::repeat_n(params.lambda, nn)
        .chain(edges.iter().map(|&(i, j)| params.lambda * theta[(i, j)]))
        .collect();

    let mut yy = DMatrix::<u64>::zeros(ns, rates.len());
    for (k, &rate) in rates.iter().enumerate() {
        for s in 0..ns {
            yy[(s, k)] = rpois(rng, rate)?;
        }
    }

    let mut xx: CountMatrix = yy * aa.transpose();
    for x in xx.iter_mut() {
        *x += rpois(rng, params.lambda_noise)?;
    }

    info!(
        "LPGM: {} samples, {} nodes, {} edges",
        ns,
        nn,
        edges.len()
    );
    Ok(xx)
}

fn sample_gibbs<R>(theta: &DMatrix<f64>, params: &PoissonSamplerParams, rng: &mut R) -> Result<CountMatrix>
where
    R: Rng + ?Sized,
{
    let nn = theta.nrows();
    let ns = params.n_samples;

    let baseline = match &params.baseline {
        Some(b) if b.len() == nn => b.clone(),
        Some(b) => invalid!("baseline has length {}, expected {}", b.len(), nn),
        None => vec![0.0; nn],
    };
    if !(params.max_rate.is_finite() && params.max_rate > 0.0) {
        invalid!("max_rate must be positive and finite, got {}", params.max_rate);
    }
    let log_max = params.max_rate.ln();

    let mut xx = CountMatrix::zeros(ns, nn);
    for x in xx.iter_mut() {
        *x = rpois(rng, 1.0)?;
    }

    let mut ntrunc = 0usize;
    for _iter in 0..params.max_iter {
        for i in 0..nn {
            for s in 0..ns {
                let mut eta = baseline[i];
                for j in (0..nn).filter(|&j| j != i) {
                    eta += xx[(s, j)] as f64 * theta[(j, i)];
                }
                if eta > log_max {
                    eta = log_max;
                    ntrunc += 1;
                }
                xx[(s, i)] = rpois(rng, eta.exp())?;
            }
        }
    }

    if ntrunc > 0 {
        warn!(
            "Gibbs: {} conditional rates truncated at {:e}",
            ntrunc, params.max_rate
        );
    }
    info!("Gibbs: {} samples, {} nodes, {} sweeps", ns, nn, params.max_iter);
    Ok(xx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_design_matrix() {
        let theta = DMatrix::from_row_slice(3, 3, &[0.0, 1.0, 0.0, 1.0, 0.0, 0.5, 0.0, 0.5, 0.0]);
        let (aa, edges) = lpgm_design_matrix(&theta);
        assert_eq!(edges, vec![(0, 1), (1, 2)]);
        assert_eq!(aa.shape(), (3, 5));
        assert_eq!(aa.column(3).as_slice(), &[1, 1, 0]);
        assert_eq!(aa.column(4).as_slice(), &[0, 1, 1]);
    }

    #[test]
    fn test_lpgm_without_edges_or_noise() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let theta = DMatrix::<f64>::zeros(4, 4);
        let params = PoissonSamplerParams {
            n_samples: 2000,
            lambda: 3.0,
            lambda_noise: 0.0,
            ..Default::default()
        };
        let xx = sample_poisson(&theta, SamplerMethod::Lpgm, &params, &mut rng).unwrap();
        assert_eq!(xx.shape(), (2000, 4));
        let mean = xx.iter().sum::<u64>() as f64 / xx.len() as f64;
        assert!((mean - 3.0).abs() < 0.2, "mean {}", mean);
    }

    #[test]
    fn test_lpgm_rejects_negative_weights() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0);
        let theta = DMatrix::from_row_slice(2, 2, &[0.0, -0.3, -0.3, 0.0]);
        let ret = sample_poisson(&theta, SamplerMethod::Lpgm, &Default::default(), &mut rng);
        assert!(matches!(ret, Err(GeneratorError::InvalidParameter(_))));
    }

    #[test]
    fn test_gibbs_baseline_length() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0);
        let theta = DMatrix::<f64>::zeros(3, 3);
        let params = PoissonSamplerParams {
            baseline: Some(vec![0.0; 2]),
            ..Default::default()
        };
        assert!(sample_poisson(&theta, SamplerMethod::Gibbs, &params, &mut rng).is_err());
    }

    #[test]
    fn test_gibbs_independent_nodes() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let theta = DMatrix::<f64>::zeros(3, 3);
        let params = PoissonSamplerParams {
            n_samples: 1000,
            max_iter: 3,
            baseline: Some(vec![0.0, 1.0, 2.0]),
            ..Default::default()
        };
        let xx = sample_poisson(&theta, SamplerMethod::Gibbs, &params, &mut rng).unwrap();
        for (i, b) in [0.0f64, 1.0, 2.0].iter().enumerate() {
            let mean = xx.column(i).iter().sum::<u64>() as f64 / 1000.0;
            assert!((mean - b.exp()).abs() < 0.1 * b.exp() + 0.1, "node {} mean {}", i, mean);
        }
    }

    #[test]
    fn test_toggle_sequence_is_symmetric() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(2);
        let params = PoissonSequenceParams {
            n_observed: 12,
            num_steps: 6,
            family: GraphFamily::SmallWorld,
            ..Default::default()
        };
        let graphs = generate_poisson_sequence(&params, &mut rng).unwrap();
        assert_eq!(graphs.len(), 6);
        for (prev, next) in graphs.iter().zip(graphs.iter().skip(1)) {
            assert!(next.is_symmetric(0.0));
            let changed = prev
                .iter()
                .zip(next.iter())
                .filter(|(a, b)| a != b)
                .count();
            assert_eq!(changed, 2 * params.n_to_change);
        }
    }
}
