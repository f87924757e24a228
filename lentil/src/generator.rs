use crate::error::{GeneratorError, Result};
use crate::init::initial_snapshot;
use crate::params::{SequenceParams, Variant};
use crate::retry::with_retry;
use crate::snapshot::{FixedLatentSequence, PrecisionSequence, Snapshot};
use crate::validate::{check_snapshot, Constraints};

use log::{debug, info};
use rand::Rng;

/// Build a sequence of `T` snapshots `(Θ_t, L_t, Θ_t - L_t)`.
///
/// Each snapshot is derived from its predecessor by the perturbation
/// of `variant`, then re-validated against all invariants. A rejected
/// candidate is redrawn up to `params.retry.max_attempts` times;
/// exhausting the budget fails the whole call.
///
/// # Arguments
/// * `variant` - perturbation strategy
/// * `params` - dimensions, degree bound, step size, retry budget
/// * `rng` - random source (seed it for reproducible output)
pub fn generate_sequence<R>(
    variant: Variant,
    params: &SequenceParams,
    rng: &mut R,
) -> Result<PrecisionSequence>
where
    R: Rng + ?Sized,
{
    params.validate()?;

    info!(
        "{} sequence: {} observed, {} latent, T = {}, degree = {}, epsilon = {:e}",
        variant, params.n_observed, params.n_latent, params.num_steps, params.degree, params.epsilon
    );

    let constraints = Constraints {
        n_latent: params.n_latent,
        degree: Some(params.degree),
        eigen_tol: params.eigen_tol,
    };

    let mut snapshots: Vec<Snapshot> = Vec::with_capacity(params.num_steps);
    snapshots.push(initial_snapshot(rng, params, variant)?);

    for step in 1..params.num_steps {
        let next = {
            let prev = &snapshots[step - 1];
            with_retry(&params.retry, variant.name(), |attempt| {
                let candidate = variant.perturb(prev, rng, params)?;
                check_snapshot(&candidate, &constraints)?;
                if attempt > 1 {
                    debug!("step {}: accepted after {} attempts", step, attempt);
                }
                Ok(candidate)
            })
            .map_err(|(attempts, last)| GeneratorError::ExhaustedRetries {
                step,
                attempts,
                last,
            })?
        };
        snapshots.push(next);
    }

    info!("{} sequence: built {} snapshots", variant, snapshots.len());
    Ok(PrecisionSequence::new(Some(variant), snapshots))
}

/// Build `(Θ_t, Θ_t - L)` for `t = 0..T` against a single latent
/// matrix `L` drawn once at the start
pub fn generate_fixed_latent_sequence<R>(
    params: &SequenceParams,
    rng: &mut R,
) -> Result<FixedLatentSequence>
where
    R: Rng + ?Sized,
{
    let seq = generate_sequence(Variant::FixedLatent, params, rng)?;
    FixedLatentSequence::from_sequence(seq)
        .ok_or_else(|| GeneratorError::InvalidParameter("empty sequence".to_string()))
}
