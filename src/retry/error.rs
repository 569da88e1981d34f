//! Error types for retry policies and retry runs.

use std::fmt;

/// Error returned when a [`RetryPolicy`](super::RetryPolicy) cannot be built.
///
/// These are programming or configuration mistakes. They are reported when
/// the policy is constructed, never while an operation is being retried.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyError {
    /// The attempt budget was zero.
    ZeroAttempts,
    /// A duration from configuration was negative.
    NegativeDuration {
        /// Name of the offending field.
        field: &'static str,
        /// The value that was supplied, in milliseconds.
        millis: i64,
    },
    /// A proportional jitter factor from configuration was NaN or infinite.
    InvalidJitter {
        /// The value that was supplied.
        factor: f64,
    },
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyError::ZeroAttempts => write!(f, "max_attempts must be at least 1"),
            PolicyError::NegativeDuration { field, millis } => {
                write!(f, "{} must not be negative (got {}ms)", field, millis)
            }
            PolicyError::InvalidJitter { factor } => {
                write!(f, "jitter factor must be a finite number (got {})", factor)
            }
        }
    }
}

impl std::error::Error for PolicyError {}

/// Error form of a non-successful [`RetryOutcome`](super::RetryOutcome).
///
/// Produced by [`RetryOutcome::into_result`](super::RetryOutcome::into_result)
/// for callers that want to use `?`.
///
/// # Examples
///
/// ```rust
/// use stillwater_retry::{retry, RetryError, RetryPolicy};
///
/// let policy = RetryPolicy::new(2, stillwater_retry::Backoff::None)?;
/// let result = retry(&policy, || Err::<(), _>("always fails")).into_result();
///
/// match result {
///     Err(RetryError::Exhausted { last_error, attempts }) => {
///         assert_eq!(last_error, "always fails");
///         assert_eq!(attempts, 2);
///     }
///     _ => panic!("Expected exhaustion"),
/// }
/// # Ok::<(), stillwater_retry::PolicyError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// Every allowed attempt failed.
    Exhausted {
        /// The error from the final attempt.
        last_error: E,
        /// Total number of attempts made.
        attempts: u32,
    },
    /// The run was cancelled before the budget was spent.
    Cancelled {
        /// The error from the last attempt, if any attempt was made.
        last_error: Option<E>,
        /// Number of attempts made before cancellation.
        attempts: u32,
    },
}

impl<E> RetryError<E> {
    /// Number of attempts made.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } | Self::Cancelled { attempts, .. } => *attempts,
        }
    }

    /// Returns true if this error came from cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Get a reference to the last operation error, if there is one.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            Self::Exhausted { last_error, .. } => Some(last_error),
            Self::Cancelled { last_error, .. } => last_error.as_ref(),
        }
    }

    /// Extract the last operation error, discarding metadata.
    pub fn into_last_error(self) -> Option<E> {
        match self {
            Self::Exhausted { last_error, .. } => Some(last_error),
            Self::Cancelled { last_error, .. } => last_error,
        }
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted {
                last_error,
                attempts,
            } => write!(
                f,
                "retry exhausted after {} attempts: {}",
                attempts, last_error
            ),
            Self::Cancelled {
                last_error: Some(e),
                attempts,
            } => write!(f, "retry cancelled after {} attempts: {}", attempts, e),
            Self::Cancelled {
                last_error: None,
                attempts,
            } => write!(f, "retry cancelled after {} attempts", attempts),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.last_error().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;
    use std::error::Error as _;

    #[derive(Debug)]
    struct Refused;

    impl fmt::Display for Refused {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("connection refused")
        }
    }

    impl std::error::Error for Refused {}

    #[test]
    fn test_policy_error_display() {
        assert_eq!(
            PolicyError::ZeroAttempts.to_string(),
            "max_attempts must be at least 1"
        );
        let err = PolicyError::NegativeDuration {
            field: "base_ms",
            millis: -5,
        };
        assert_eq!(err.to_string(), "base_ms must not be negative (got -5ms)");
        let err = PolicyError::InvalidJitter { factor: f64::NAN };
        assert_eq!(
            err.to_string(),
            "jitter factor must be a finite number (got NaN)"
        );
    }

    #[test]
    fn test_exhausted_display() {
        let err = RetryError::Exhausted {
            last_error: "connection failed",
            attempts: 3,
        };
        let display = format!("{}", err);
        assert!(display.contains("retry exhausted"));
        assert!(display.contains("3 attempts"));
        assert!(display.contains("connection failed"));
    }

    #[test]
    fn test_cancelled_display_without_error() {
        let err: RetryError<String> = RetryError::Cancelled {
            last_error: None,
            attempts: 0,
        };
        assert_eq!(err.to_string(), "retry cancelled after 0 attempts");
        assert!(err.is_cancelled());
        assert_eq!(err.attempts(), 0);
    }

    #[test]
    fn test_into_last_error() {
        let err = RetryError::Exhausted {
            last_error: "boom",
            attempts: 5,
        };
        assert_eq!(err.last_error(), Some(&"boom"));
        assert_eq!(err.into_last_error(), Some("boom"));
    }

    #[test]
    fn test_source_is_last_error() {
        let err = RetryError::Exhausted {
            last_error: Refused,
            attempts: 2,
        };
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("connection refused"));

        let cancelled: RetryError<Refused> = RetryError::Cancelled {
            last_error: None,
            attempts: 0,
        };
        assert!(cancelled.source().is_none());
    }
}
