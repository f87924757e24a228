//! Invariant checks applied to every candidate before it is accepted:
//!
//! 1. Θ symmetric, positive definite
//! 2. L symmetric, positive semi-definite, rank(L) = k
//! 3. Θ - L positive definite
//! 4. at most `degree` off-diagonal nonzeros per row of Θ

use crate::error::Violation;
use crate::snapshot::Snapshot;

use matrix_util::traits::{SparsityOps, SpectralOps};
use nalgebra::DMatrix;

const SYMMETRY_TOL: f64 = 1e-12;

/// What a valid snapshot must satisfy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constraints {
    /// Expected rank of L
    pub n_latent: usize,
    /// Degree bound on Θ; `None` skips the check
    pub degree: Option<usize>,
    pub eigen_tol: f64,
}

pub fn check_symmetric(what: &'static str, x: &DMatrix<f64>) -> Result<(), Violation> {
    if x.is_symmetric(SYMMETRY_TOL) {
        Ok(())
    } else {
        Err(Violation::NotSymmetric { what })
    }
}

pub fn check_pos_def(what: &'static str, x: &DMatrix<f64>, tol: f64) -> Result<(), Violation> {
    check_symmetric(what, x)?;
    if x.is_pos_def(tol) {
        Ok(())
    } else {
        Err(Violation::NotPositiveDefinite {
            what,
            min_eigenvalue: x.min_eigenvalue(),
        })
    }
}

pub fn check_pos_semidef(
    what: &'static str,
    x: &DMatrix<f64>,
    tol: f64,
) -> Result<(), Violation> {
    check_symmetric(what, x)?;
    if x.is_pos_semidef(tol) {
        Ok(())
    } else {
        Err(Violation::NotPositiveSemidefinite {
            what,
            min_eigenvalue: x.min_eigenvalue(),
        })
    }
}

pub fn check_rank(what: &'static str, x: &DMatrix<f64>, expected: usize) -> Result<(), Violation> {
    let found = x.numerical_rank();
    if found == expected {
        Ok(())
    } else {
        Err(Violation::WrongRank {
            what,
            expected,
            found,
        })
    }
}

pub fn check_degree(theta: &DMatrix<f64>, bound: usize) -> Result<(), Violation> {
    match theta
        .offdiag_degrees()
        .into_iter()
        .enumerate()
        .find(|&(_, d)| d > bound)
    {
        Some((row, degree)) => Err(Violation::DegreeExceeded { row, degree, bound }),
        None => Ok(()),
    }
}

/// Θ alone: invariants 1 and 4
pub fn check_precision(theta: &DMatrix<f64>, constraints: &Constraints) -> Result<(), Violation> {
    if let Some(bound) = constraints.degree {
        check_degree(theta, bound)?;
    }
    check_pos_def("theta", theta, constraints.eigen_tol)
}

/// L alone: invariant 2
pub fn check_latent(latent: &DMatrix<f64>, constraints: &Constraints) -> Result<(), Violation> {
    check_pos_semidef("latent", latent, constraints.eigen_tol)?;
    check_rank("latent", latent, constraints.n_latent)
}

/// All four invariants
pub fn check_snapshot(snapshot: &Snapshot, constraints: &Constraints) -> Result<(), Violation> {
    check_precision(&snapshot.theta, constraints)?;
    check_latent(&snapshot.latent, constraints)?;
    check_pos_def("theta - latent", &snapshot.observed, constraints.eigen_tol)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constraints(degree: usize) -> Constraints {
        Constraints {
            n_latent: 1,
            degree: Some(degree),
            eigen_tol: 1e-12,
        }
    }

    #[test]
    fn test_valid_snapshot() {
        let theta = DMatrix::from_row_slice(3, 3, &[1.0, 0.25, 0.0, 0.25, 1.0, 0.0, 0.0, 0.0, 1.0]);
        let kk = DMatrix::from_row_slice(1, 3, &[0.1, 0.1, 0.0]);
        let snap = Snapshot::new(theta, kk);
        assert_eq!(check_snapshot(&snap, &constraints(1)), Ok(()));
    }

    #[test]
    fn test_degree_exceeded() {
        let theta = DMatrix::from_row_slice(3, 3, &[1.0, 0.1, 0.1, 0.1, 1.0, 0.0, 0.1, 0.0, 1.0]);
        assert_eq!(
            check_degree(&theta, 1),
            Err(Violation::DegreeExceeded {
                row: 0,
                degree: 2,
                bound: 1
            })
        );
    }

    #[test]
    fn test_indefinite_observed() {
        let theta = DMatrix::identity(2, 2);
        let kk = DMatrix::from_row_slice(1, 2, &[1.0, 1.0]);
        let snap = Snapshot::new(theta, kk);
        assert!(matches!(
            check_snapshot(&snap, &constraints(1)),
            Err(Violation::NotPositiveDefinite {
                what: "theta - latent",
                ..
            })
        ));
    }

    #[test]
    fn test_wrong_rank() {
        let theta = DMatrix::identity(3, 3);
        let kk = DMatrix::from_row_slice(2, 3, &[0.1, 0.1, 0.0, 0.2, 0.2, 0.0]);
        let snap = Snapshot::new(theta, kk);
        let cc = Constraints {
            n_latent: 2,
            ..constraints(2)
        };
        assert_eq!(
            check_snapshot(&snap, &cc),
            Err(Violation::WrongRank {
                what: "latent",
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn test_asymmetric_theta() {
        let theta = DMatrix::from_row_slice(2, 2, &[1.0, 0.1, 0.0, 1.0]);
        assert_eq!(
            check_precision(&theta, &constraints(1)),
            Err(Violation::NotSymmetric { what: "theta" })
        );
    }
}
