//! The result of a retry run.

use super::error::RetryError;

/// Final report of a retry run.
///
/// The executors never propagate operation errors; they always hand back one
/// of these. Cancellation is reported separately from exhaustion.
///
/// # Examples
///
/// ```rust
/// use stillwater_retry::{retry, RetryOutcome, RetryPolicy};
///
/// let policy = RetryPolicy::new(3, stillwater_retry::Backoff::None)?;
/// let mut calls = 0;
/// let outcome = retry(&policy, || {
///     calls += 1;
///     if calls < 2 { Err("not yet") } else { Ok(calls * 10) }
/// });
///
/// assert_eq!(outcome, RetryOutcome::Success { value: 20, attempts: 2 });
/// # Ok::<(), stillwater_retry::PolicyError>(())
/// ```
#[must_use = "a retry outcome may hold the operation's error"]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T, E> {
    /// The operation succeeded.
    Success {
        /// The value produced by the successful attempt.
        value: T,
        /// 1-based number of the successful attempt.
        attempts: u32,
    },
    /// Every allowed attempt failed.
    Failure {
        /// The error from the final attempt.
        last_error: E,
        /// Number of attempts made; equals the policy's budget.
        attempts: u32,
    },
    /// The run was cancelled before the budget was spent.
    Cancelled {
        /// The error from the last attempt made, if any.
        last_error: Option<E>,
        /// Number of attempts made before cancellation.
        attempts: u32,
    },
}

impl<T, E> RetryOutcome<T, E> {
    /// Returns true if the operation eventually succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns true if the attempt budget was exhausted.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    /// Returns true if the run was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Number of times the operation was invoked.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Success { attempts, .. }
            | Self::Failure { attempts, .. }
            | Self::Cancelled { attempts, .. } => *attempts,
        }
    }

    /// Get a reference to the success value.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Success { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Get a reference to the last operation error.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { last_error, .. } => Some(last_error),
            Self::Cancelled { last_error, .. } => last_error.as_ref(),
        }
    }

    /// Extract the success value, discarding metadata.
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Success { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Transform the success value.
    pub fn map<U, F>(self, f: F) -> RetryOutcome<U, E>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Success { value, attempts } => RetryOutcome::Success {
                value: f(value),
                attempts,
            },
            Self::Failure {
                last_error,
                attempts,
            } => RetryOutcome::Failure {
                last_error,
                attempts,
            },
            Self::Cancelled {
                last_error,
                attempts,
            } => RetryOutcome::Cancelled {
                last_error,
                attempts,
            },
        }
    }

    /// Transform the operation error.
    pub fn map_err<E2, F>(self, f: F) -> RetryOutcome<T, E2>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            Self::Success { value, attempts } => RetryOutcome::Success { value, attempts },
            Self::Failure {
                last_error,
                attempts,
            } => RetryOutcome::Failure {
                last_error: f(last_error),
                attempts,
            },
            Self::Cancelled {
                last_error,
                attempts,
            } => RetryOutcome::Cancelled {
                last_error: last_error.map(f),
                attempts,
            },
        }
    }

    /// Convert into a `Result`, keeping attempt counts on the error side.
    pub fn into_result(self) -> Result<T, RetryError<E>> {
        match self {
            Self::Success { value, .. } => Ok(value),
            Self::Failure {
                last_error,
                attempts,
            } => Err(RetryError::Exhausted {
                last_error,
                attempts,
            }),
            Self::Cancelled {
                last_error,
                attempts,
            } => Err(RetryError::Cancelled {
                last_error,
                attempts,
            }),
        }
    }
}

impl<T, E> From<RetryOutcome<T, E>> for Result<T, RetryError<E>> {
    fn from(outcome: RetryOutcome<T, E>) -> Self {
        outcome.into_result()
    }
}

#[cfg(test)]
mod outcome_tests {
    use super::*;

    #[test]
    fn test_success_accessors() {
        let outcome: RetryOutcome<i32, &str> = RetryOutcome::Success {
            value: 42,
            attempts: 2,
        };
        assert!(outcome.is_success());
        assert!(!outcome.is_failure());
        assert_eq!(outcome.attempts(), 2);
        assert_eq!(outcome.value(), Some(&42));
        assert_eq!(outcome.last_error(), None);
        assert_eq!(outcome.into_value(), Some(42));
    }

    #[test]
    fn test_failure_accessors() {
        let outcome: RetryOutcome<i32, &str> = RetryOutcome::Failure {
            last_error: "down",
            attempts: 3,
        };
        assert!(outcome.is_failure());
        assert_eq!(outcome.last_error(), Some(&"down"));
        assert_eq!(outcome.clone().into_value(), None);
        assert_eq!(
            outcome.into_result(),
            Err(RetryError::Exhausted {
                last_error: "down",
                attempts: 3
            })
        );
    }

    #[test]
    fn test_cancelled_is_not_failure() {
        let outcome: RetryOutcome<i32, &str> = RetryOutcome::Cancelled {
            last_error: Some("down"),
            attempts: 1,
        };
        assert!(outcome.is_cancelled());
        assert!(!outcome.is_failure());
        let err = Result::from(outcome).unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_map_and_map_err() {
        let ok: RetryOutcome<i32, &str> = RetryOutcome::Success {
            value: 2,
            attempts: 1,
        };
        assert_eq!(ok.map(|v| v * 10).into_value(), Some(20));

        let cancelled: RetryOutcome<i32, &str> = RetryOutcome::Cancelled {
            last_error: Some("x"),
            attempts: 1,
        };
        let mapped = cancelled.map_err(str::len);
        assert_eq!(mapped.last_error(), Some(&1));
        assert_eq!(mapped.attempts(), 1);
    }
}
