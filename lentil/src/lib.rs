//! Synthetic time-indexed sparse precision matrices, with and without
//! latent variables, for benchmarking graphical-model structure
//! learning.
//!
//! The main entry point is [`generate_sequence`]: an initial state
//! `(Θ_0, K_0, L_0 = K_0'K_0)` is perturbed step by step, and each
//! candidate is accepted only if
//!
//! 1. Θ is symmetric positive definite,
//! 2. L is symmetric positive semi-definite with rank `n_latent`,
//! 3. Θ - L is positive definite,
//! 4. no row of Θ has more than `degree` off-diagonal nonzeros.
//!
//! Rejected candidates are redrawn within a bounded retry budget.

pub mod dataset;
pub mod error;
pub mod generator;
pub mod graph;
pub mod init;
pub mod ma_xue_zou;
pub mod params;
pub mod perturb;
pub mod poisson;
mod retry;
pub mod snapshot;
pub mod spectral;
pub mod validate;

pub use dataset::{build_gaussian_dataset, covariance_from_precision, GaussianDataset, ObservationSampler};
pub use error::{GeneratorError, Result, Violation};
pub use generator::{generate_fixed_latent_sequence, generate_sequence};
pub use graph::{random_graph, AdjacencyMatrix, GraphFamily, GraphParams};
pub use ma_xue_zou::{generate_ma_xue_zou, schur_complement, MaXueZou, MaXueZouParams};
pub use params::{RetryPolicy, SequenceParams, Variant};
pub use poisson::{
    generate_poisson_sequence, sample_poisson, CountMatrix, PoissonSamplerParams,
    PoissonSequenceParams, SamplerMethod, UpdateMode,
};
pub use snapshot::{FixedLatentSequence, PrecisionSequence, Snapshot};
pub use spectral::{generate_spectral_sequence, SpectralParams};
