use std::fmt;

/// Why a candidate matrix (or snapshot) was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    NotSymmetric { what: &'static str },
    NotPositiveDefinite { what: &'static str, min_eigenvalue: f64 },
    NotPositiveSemidefinite { what: &'static str, min_eigenvalue: f64 },
    WrongRank { what: &'static str, expected: usize, found: usize },
    DegreeExceeded { row: usize, degree: usize, bound: usize },
    Degenerate { what: &'static str },
    NoCandidates { what: &'static str },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::NotSymmetric { what } => write!(f, "{} is not symmetric", what),
            Violation::NotPositiveDefinite {
                what,
                min_eigenvalue,
            } => write!(
                f,
                "{} is not positive definite (min eigenvalue {:e})",
                what, min_eigenvalue
            ),
            Violation::NotPositiveSemidefinite {
                what,
                min_eigenvalue,
            } => write!(
                f,
                "{} is not positive semi-definite (min eigenvalue {:e})",
                what, min_eigenvalue
            ),
            Violation::WrongRank {
                what,
                expected,
                found,
            } => write!(f, "rank({}) = {}, expected {}", what, found, expected),
            Violation::DegreeExceeded { row, degree, bound } => write!(
                f,
                "row {} has {} off-diagonal nonzeros, bound is {}",
                row, degree, bound
            ),
            Violation::Degenerate { what } => write!(f, "{} is degenerate", what),
            Violation::NoCandidates { what } => write!(f, "no admissible {} left", what),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// Parameters that can never be satisfied; raised before any work
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Could not construct a valid matrix within the retry budget
    #[error("constraint violation after {attempts} attempts: {violation}")]
    ConstraintViolation { attempts: usize, violation: Violation },

    /// A perturbation step found no valid update within the retry budget
    #[error("step {step}: no valid perturbation after {attempts} attempts (last: {last})")]
    ExhaustedRetries {
        step: usize,
        attempts: usize,
        last: Violation,
    },

    /// The injected observation sampler failed
    #[error("sampler failed: {0}")]
    Sampler(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, GeneratorError>;

/// `bail!`-style shortcut for `GeneratorError::InvalidParameter`
macro_rules! invalid {
    ($($arg:tt)*) => {
        return Err($crate::error::GeneratorError::InvalidParameter(format!($($arg)*)))
    };
}

pub(crate) use invalid;
