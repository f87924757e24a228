use lentil::validate::{check_snapshot, Constraints};
use lentil::*;
use matrix_util::traits::{SparsityOps, SpectralOps};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn constraints(params: &SequenceParams) -> Constraints {
    Constraints {
        n_latent: params.n_latent,
        degree: Some(params.degree),
        eigen_tol: params.eigen_tol,
    }
}

#[test]
fn evolving_latent_end_to_end() -> anyhow::Result<()> {
    init_logger();

    let params = SequenceParams {
        n_observed: 10,
        n_latent: 2,
        num_steps: 5,
        degree: 2,
        epsilon: 1e-3,
        ..Default::default()
    };

    let seq = generate_sequence(Variant::EvolvingLatent, &params, &mut StdRng::seed_from_u64(0))?;
    assert_eq!(seq.len(), 5);

    for snap in seq.iter() {
        assert!(snap.theta.is_pos_def(params.eigen_tol));
        assert!(snap.latent.is_pos_semidef(params.eigen_tol));
        assert_eq!(snap.latent.numerical_rank(), 2);
        assert!(snap.observed.is_pos_def(params.eigen_tol));
        assert!(snap.theta.max_offdiag_degree() <= 2);
        assert_eq!(snap.observed, &snap.theta - &snap.latent);
    }

    let again = generate_sequence(Variant::EvolvingLatent, &params, &mut StdRng::seed_from_u64(0))?;
    assert_eq!(seq, again);

    Ok(())
}

#[test]
fn every_variant_satisfies_invariants() -> anyhow::Result<()> {
    init_logger();

    let params = SequenceParams {
        n_observed: 15,
        n_latent: 3,
        num_steps: 12,
        degree: 3,
        ..Default::default()
    };

    for variant in [
        Variant::EvolvingLatent,
        Variant::EvolvingBoth,
        Variant::ToggleLoading,
        Variant::FixedLatent,
    ] {
        let mut rng = StdRng::seed_from_u64(17);
        let seq = generate_sequence(variant, &params, &mut rng)?;
        assert_eq!(seq.len(), 12);
        for snap in &seq {
            check_snapshot(snap, &constraints(&params))
                .map_err(|v| anyhow::anyhow!("{}: {}", variant, v))?;
        }
    }
    Ok(())
}

#[test]
fn toggle_changes_exactly_the_toggled_pairs() -> anyhow::Result<()> {
    let params = SequenceParams {
        n_observed: 21,
        n_latent: 2,
        num_steps: 6,
        degree: 5,
        proportional: true,
        ..Default::default()
    };
    let seq = generate_sequence(Variant::EvolvingLatent, &params, &mut StdRng::seed_from_u64(3))?;

    for (prev, next) in seq.iter().zip(seq.iter().skip(1)) {
        let changed = prev
            .theta
            .iter()
            .zip(next.theta.iter())
            .filter(|(a, b)| a != b)
            .count();
        assert_eq!(changed, 2 * params.edges_per_step());
    }
    assert_eq!(params.edges_per_step(), 2);
    Ok(())
}

#[test]
fn proportional_toggles_under_tight_degree() -> anyhow::Result<()> {
    init_logger();

    for (nn, tt) in [(40, 10), (100, 10), (200, 5)] {
        let params = SequenceParams {
            n_observed: nn,
            n_latent: 2,
            num_steps: tt,
            degree: 2,
            proportional: true,
            ..Default::default()
        };
        for seed in 0..3 {
            let seq = generate_sequence(
                Variant::EvolvingLatent,
                &params,
                &mut StdRng::seed_from_u64(seed),
            )?;
            assert_eq!(seq.len(), tt);
            for snap in &seq {
                check_snapshot(snap, &constraints(&params))
                    .map_err(|v| anyhow::anyhow!("n = {}, seed = {}: {}", nn, seed, v))?;
            }
            for (prev, next) in seq.iter().zip(seq.iter().skip(1)) {
                let changed = prev
                    .theta
                    .iter()
                    .zip(next.theta.iter())
                    .filter(|(a, b)| a != b)
                    .count();
                assert_eq!(changed, 2 * params.edges_per_step());
            }
        }
    }
    Ok(())
}

#[test]
fn long_single_toggle_sequence() -> anyhow::Result<()> {
    let params = SequenceParams {
        n_observed: 100,
        num_steps: 50,
        ..Default::default()
    };
    for seed in 0..3 {
        let seq = generate_sequence(
            Variant::EvolvingLatent,
            &params,
            &mut StdRng::seed_from_u64(seed),
        )?;
        assert_eq!(seq.len(), 50);
        assert!(seq.iter().all(|s| s.theta.max_offdiag_degree() <= 2));
    }
    Ok(())
}

#[test]
fn fixed_latent_never_changes() -> anyhow::Result<()> {
    let params = SequenceParams {
        num_steps: 20,
        ..Default::default()
    };
    let fixed = generate_fixed_latent_sequence(&params, &mut StdRng::seed_from_u64(5))?;
    assert_eq!(fixed.len(), 20);

    let ll = fixed.latent();
    assert_eq!(ll.numerical_rank(), params.n_latent);
    approx::assert_relative_eq!(ll.max(), 0.12 / (params.n_observed as f64).sqrt(), epsilon = 1e-12);

    for (theta, observed) in fixed.steps() {
        assert_eq!(observed, &(theta - ll));
        assert!(observed.is_pos_def(params.eigen_tol));
    }

    let seq = generate_sequence(Variant::FixedLatent, &params, &mut StdRng::seed_from_u64(5))?;
    let l0 = &seq.snapshots()[0].latent;
    assert!(seq.iter().all(|s| &s.latent == l0));
    assert_eq!(l0, ll);
    Ok(())
}

#[test]
fn zero_latent_dimension_degrades_to_zero() -> anyhow::Result<()> {
    let params = SequenceParams {
        n_latent: 0,
        num_steps: 8,
        ..Default::default()
    };
    for variant in [Variant::EvolvingLatent, Variant::EvolvingBoth, Variant::ToggleLoading] {
        let seq = generate_sequence(variant, &params, &mut StdRng::seed_from_u64(8))?;
        for snap in &seq {
            assert_eq!(snap.loading.shape(), (0, params.n_observed));
            assert!(snap.latent.iter().all(|&x| x == 0.0));
            assert_eq!(snap.observed, snap.theta);
        }
    }
    Ok(())
}

#[test]
fn invalid_parameters_are_rejected() {
    let mut rng = StdRng::seed_from_u64(0);
    let cases = [
        SequenceParams {
            n_observed: 3,
            n_latent: 3,
            ..Default::default()
        },
        SequenceParams {
            n_observed: 3,
            degree: 3,
            n_latent: 1,
            ..Default::default()
        },
        SequenceParams {
            num_steps: 0,
            ..Default::default()
        },
        SequenceParams {
            epsilon: -1.0,
            ..Default::default()
        },
        SequenceParams {
            retry: RetryPolicy { max_attempts: 0 },
            ..Default::default()
        },
    ];
    for params in cases.iter() {
        let err = generate_sequence(Variant::EvolvingBoth, params, &mut rng).unwrap_err();
        assert!(matches!(err, GeneratorError::InvalidParameter(_)), "{:?}", err);
    }
}

#[test]
fn ma_xue_zou_marginal() -> anyhow::Result<()> {
    let mut rng = StdRng::seed_from_u64(21);
    let params = MaXueZouParams {
        n_observed: 8,
        n_hidden: Some(4),
        ..Default::default()
    };
    let ret = generate_ma_xue_zou(&params, &mut rng)?;
    assert_eq!(ret.joint.shape(), (12, 12));
    assert_eq!(ret.n_hidden, 4);
    assert!(ret.observed_precision.is_pos_def(1e-12));
    assert_eq!(ret.latent.numerical_rank(), 4);

    // re-deriving the marginal from the joint gives the same answer
    let again = schur_complement(&ret.joint, 8, 4, 1e-12)?;
    approx::assert_abs_diff_eq!(again.observed_precision, ret.observed_precision, epsilon = 1e-12);

    let err = schur_complement(&ret.joint, 8, 8, 1e-12).unwrap_err();
    assert!(matches!(err, GeneratorError::InvalidParameter(_)));
    Ok(())
}

#[test]
fn gaussian_dataset_from_sequence() -> anyhow::Result<()> {
    struct Recorder {
        calls: usize,
    }

    impl ObservationSampler for Recorder {
        fn sample(
            &mut self,
            covariance: &nalgebra::DMatrix<f64>,
            n_samples: usize,
        ) -> anyhow::Result<nalgebra::DMatrix<f64>> {
            self.calls += 1;
            Ok(nalgebra::DMatrix::zeros(n_samples, covariance.nrows()))
        }
    }

    let params = SequenceParams {
        num_steps: 4,
        ..Default::default()
    };
    let seq = generate_sequence(Variant::EvolvingBoth, &params, &mut StdRng::seed_from_u64(2))?;

    let mut sampler = Recorder { calls: 0 };
    let ds = build_gaussian_dataset(seq.snapshots(), 50, &mut sampler)?;
    assert_eq!(sampler.calls, 4);
    assert_eq!(ds.data.len(), 4);
    for sigma in ds.covariances.iter() {
        for i in 0..params.n_observed {
            approx::assert_abs_diff_eq!(sigma[(i, i)], 1.0, epsilon = 1e-12);
        }
        assert!(sigma.is_pos_def(1e-12));
    }
    Ok(())
}
