use crate::error::Violation;
use crate::params::RetryPolicy;

use log::debug;

/// Run `attempt_fn(attempt)` until it succeeds or `policy.max_attempts`
/// is reached. On exhaustion returns the number of attempts and the
/// last violation.
pub(crate) fn with_retry<T, F>(
    policy: &RetryPolicy,
    what: &str,
    mut attempt_fn: F,
) -> Result<T, (usize, Violation)>
where
    F: FnMut(usize) -> Result<T, Violation>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match attempt_fn(attempt) {
            Ok(ret) => return Ok(ret),
            Err(violation) if attempt >= policy.max_attempts => {
                return Err((attempt, violation));
            }
            Err(violation) => {
                debug!("{}: attempt {} rejected, {}", what, attempt, violation);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stops_at_first_success() {
        let policy = RetryPolicy { max_attempts: 10 };
        let ret = with_retry(&policy, "test", |attempt| {
            if attempt < 3 {
                Err(Violation::NotSymmetric { what: "x" })
            } else {
                Ok(attempt)
            }
        });
        assert_eq!(ret, Ok(3));
    }

    #[test]
    fn test_reports_last_violation() {
        let policy = RetryPolicy { max_attempts: 4 };
        let ret: Result<(), _> = with_retry(&policy, "test", |attempt| {
            Err(Violation::WrongRank {
                what: "latent",
                expected: 2,
                found: attempt,
            })
        });
        assert_eq!(
            ret,
            Err((
                4,
                Violation::WrongRank {
                    what: "latent",
                    expected: 2,
                    found: 4
                }
            ))
        );
    }
}
