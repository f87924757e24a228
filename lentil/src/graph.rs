//! Random graph families for the count-data generator. Graphs are
//! returned as dense symmetric 0/1 adjacency matrices.

use crate::error::{invalid, GeneratorError, Result};

use nalgebra::DMatrix;
use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type AdjacencyMatrix = DMatrix<f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GraphFamily {
    /// G(n, p): every pair independently with `probability`
    #[serde(rename = "erdos-renyi")]
    ErdosRenyi,
    /// Barabási–Albert preferential attachment with `degree` edges
    /// per new node
    #[serde(rename = "scale-free")]
    ScaleFree,
    /// Watts–Strogatz ring lattice with `degree` neighbours, rewired
    /// with `probability`
    #[serde(rename = "small-world")]
    SmallWorld,
    /// G(n, m): `degree` edges chosen uniformly
    #[serde(rename = "gnm")]
    Gnm,
}

impl GraphFamily {
    pub fn name(&self) -> &'static str {
        match self {
            GraphFamily::ErdosRenyi => "erdos-renyi",
            GraphFamily::ScaleFree => "scale-free",
            GraphFamily::SmallWorld => "small-world",
            GraphFamily::Gnm => "gnm",
        }
    }
}

impl fmt::Display for GraphFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GraphFamily {
    type Err = GeneratorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "erdos-renyi" => Ok(GraphFamily::ErdosRenyi),
            "scale-free" => Ok(GraphFamily::ScaleFree),
            "small-world" => Ok(GraphFamily::SmallWorld),
            "gnm" => Ok(GraphFamily::Gnm),
            _ => invalid!("unknown graph family '{}'", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphParams {
    /// Edge probability (Erdős–Rényi) or rewiring probability
    /// (Watts–Strogatz)
    pub probability: f64,
    /// Attachment count (Barabási–Albert), lattice neighbours
    /// (Watts–Strogatz) or number of edges (G(n, m))
    pub degree: usize,
}

impl Default for GraphParams {
    fn default() -> Self {
        Self {
            probability: 0.2,
            degree: 3,
        }
    }
}

/// Sample an adjacency matrix of the given family on `nn` nodes
pub fn random_graph<R>(
    rng: &mut R,
    nn: usize,
    family: GraphFamily,
    params: &GraphParams,
) -> Result<AdjacencyMatrix>
where
    R: Rng + ?Sized,
{
    match family {
        GraphFamily::ErdosRenyi => erdos_renyi(rng, nn, params.probability),
        GraphFamily::ScaleFree => barabasi_albert(rng, nn, params.degree),
        GraphFamily::SmallWorld => watts_strogatz(rng, nn, params.degree, params.probability),
        GraphFamily::Gnm => gnm(rng, nn, params.degree),
    }
}

fn check_probability(pp: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&pp) {
        invalid!("probability must lie in [0, 1], got {}", pp);
    }
    Ok(())
}

fn add_edge(adj: &mut AdjacencyMatrix, i: usize, j: usize) {
    adj[(i, j)] = 1.0;
    adj[(j, i)] = 1.0;
}

fn remove_edge(adj: &mut AdjacencyMatrix, i: usize, j: usize) {
    adj[(i, j)] = 0.0;
    adj[(j, i)] = 0.0;
}

fn complete_graph(nn: usize) -> AdjacencyMatrix {
    DMatrix::from_fn(nn, nn, |i, j| if i != j { 1.0 } else { 0.0 })
}

pub fn erdos_renyi<R>(rng: &mut R, nn: usize, pp: f64) -> Result<AdjacencyMatrix>
where
    R: Rng + ?Sized,
{
    check_probability(pp)?;
    let mut adj = DMatrix::<f64>::zeros(nn, nn);
    for i in 0..nn {
        for j in (i + 1)..nn {
            if rng.random_bool(pp) {
                add_edge(&mut adj, i, j);
            }
        }
    }
    Ok(adj)
}

/// Start from a star on `mm + 1` nodes; every later node attaches to
/// `mm` distinct existing nodes chosen proportionally to their degree
pub fn barabasi_albert<R>(rng: &mut R, nn: usize, mm: usize) -> Result<AdjacencyMatrix>
where
    R: Rng + ?Sized,
{
    if mm == 0 || mm >= nn {
        invalid!("scale-free graph needs 1 <= m < n, got m = {}, n = {}", mm, nn);
    }

    let mut adj = DMatrix::<f64>::zeros(nn, nn);
    // each node appears once per incident edge
    let mut repeated: Vec<usize> = Vec::with_capacity(2 * nn * mm);

    for j in 1..=mm {
        add_edge(&mut adj, 0, j);
        repeated.push(0);
        repeated.push(j);
    }

    for source in (mm + 1)..nn {
        let mut targets: Vec<usize> = Vec::with_capacity(mm);
        while targets.len() < mm {
            let x = repeated[rng.random_range(0..repeated.len())];
            if !targets.contains(&x) {
                targets.push(x);
            }
        }
        for &t in targets.iter() {
            add_edge(&mut adj, source, t);
        }
        repeated.extend(targets);
        repeated.extend(std::iter::repeat_n(source, mm));
    }
    Ok(adj)
}

/// Ring lattice where each node links to its `kk / 2` nearest
/// neighbours on either side; each lattice edge is then rewired to a
/// random non-neighbour with probability `pp`
pub fn watts_strogatz<R>(rng: &mut R, nn: usize, kk: usize, pp: f64) -> Result<AdjacencyMatrix>
where
    R: Rng + ?Sized,
{
    check_probability(pp)?;
    if kk > nn {
        invalid!("small-world graph needs k <= n, got k = {}, n = {}", kk, nn);
    }
    if kk == nn {
        return Ok(complete_graph(nn));
    }

    let mut adj = DMatrix::<f64>::zeros(nn, nn);
    for j in 1..=(kk / 2) {
        for u in 0..nn {
            add_edge(&mut adj, u, (u + j) % nn);
        }
    }

    let degree = |adj: &AdjacencyMatrix, u: usize| adj.row(u).iter().filter(|&&x| x != 0.0).count();

    for j in 1..=(kk / 2) {
        for u in 0..nn {
            let v = (u + j) % nn;
            if rng.random::<f64>() >= pp {
                continue;
            }
            let mut w = rng.random_range(0..nn);
            let mut rewire = true;
            while w == u || adj[(u, w)] != 0.0 {
                if degree(&adj, u) >= nn - 1 {
                    rewire = false;
                    break;
                }
                w = rng.random_range(0..nn);
            }
            if rewire {
                remove_edge(&mut adj, u, v);
                add_edge(&mut adj, u, w);
            }
        }
    }
    Ok(adj)
}

/// `mm` distinct edges drawn uniformly; complete graph if `mm` is at
/// least the number of pairs
pub fn gnm<R>(rng: &mut R, nn: usize, mm: usize) -> Result<AdjacencyMatrix>
where
    R: Rng + ?Sized,
{
    let pairs: Vec<(usize, usize)> = (0..nn)
        .flat_map(|i| ((i + 1)..nn).map(move |j| (i, j)))
        .collect();
    if mm >= pairs.len() {
        return Ok(complete_graph(nn));
    }

    let mut adj = DMatrix::<f64>::zeros(nn, nn);
    for k in index::sample(rng, pairs.len(), mm) {
        let (i, j) = pairs[k];
        add_edge(&mut adj, i, j);
    }
    Ok(adj)
}
