//! Testing utilities for code that retries.
//!
//! Real waits make tests slow and flaky. [`RecordingSleeper`] stands in for
//! the thread sleeper and records what the executor asked for, and
//! [`FlakyOperation`] gives a deterministic operation that fails a fixed
//! number of times.
//!
//! # Examples
//!
//! ```rust
//! use stillwater_retry::testing::{FlakyOperation, RecordingSleeper};
//! use stillwater_retry::{assert_succeeded, Retrier, RetryPolicy};
//! use std::time::Duration;
//!
//! let sleeper = RecordingSleeper::new();
//! let retrier = Retrier::new(RetryPolicy::fixed(5, Duration::from_secs(1))?)
//!     .with_sleeper(&sleeper);
//! let op = FlakyOperation::new(2, "ok");
//!
//! assert_succeeded!(retrier.run(|| op.call()), 3);
//! assert_eq!(sleeper.total(), Duration::from_secs(2));
//! # Ok::<(), stillwater_retry::PolicyError>(())
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::retry::{CancelToken, Sleeper, Wake};

/// A [`Sleeper`] that records requested waits and returns immediately.
///
/// Optionally simulates a cancellation arriving during the n-th wait; the
/// token passed to the executor (if any) is cancelled at that point too.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
    cancel_on: Option<usize>,
}

impl RecordingSleeper {
    /// Create a sleeper that never cancels.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report cancellation on the `n`-th wait (1-based).
    pub fn cancel_on_wait(mut self, n: usize) -> Self {
        self.cancel_on = Some(n);
        self
    }

    /// Every wait requested so far, in order.
    pub fn waits(&self) -> Vec<Duration> {
        self.waits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sum of all requested waits.
    pub fn total(&self) -> Duration {
        self.waits().into_iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration, cancel: Option<&CancelToken>) -> Wake {
        let mut waits = self.waits.lock().unwrap_or_else(PoisonError::into_inner);
        waits.push(duration);
        if self.cancel_on == Some(waits.len()) {
            if let Some(token) = cancel {
                token.cancel();
            }
            return Wake::Cancelled;
        }
        if cancel.is_some_and(CancelToken::is_cancelled) {
            Wake::Cancelled
        } else {
            Wake::Elapsed
        }
    }
}

/// Error produced by [`FlakyOperation`]; carries the failing attempt number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlakyError(pub u32);

impl fmt::Display for FlakyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "simulated failure on attempt {}", self.0)
    }
}

impl std::error::Error for FlakyError {}

/// An operation that fails a fixed number of times, then keeps succeeding.
#[derive(Debug)]
pub struct FlakyOperation<T> {
    failures: u32,
    value: T,
    calls: AtomicU32,
}

impl<T: Clone> FlakyOperation<T> {
    /// Fail the first `failures` calls, then return `value`.
    pub fn new(failures: u32, value: T) -> Self {
        Self {
            failures,
            value,
            calls: AtomicU32::new(0),
        }
    }

    /// Fail on every call.
    pub fn always_failing(value: T) -> Self {
        Self::new(u32::MAX, value)
    }

    /// Invoke the operation.
    pub fn call(&self) -> Result<T, FlakyError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= self.failures {
            Err(FlakyError(n))
        } else {
            Ok(self.value.clone())
        }
    }

    /// How many times [`call`](Self::call) has run.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Assert that a retry run succeeded, optionally after exactly `n` attempts.
///
/// # Example
///
/// ```rust
/// use stillwater_retry::{assert_succeeded, RetryOutcome};
///
/// let outcome: RetryOutcome<i32, String> = RetryOutcome::Success { value: 1, attempts: 2 };
/// assert_succeeded!(outcome, 2);
/// ```
#[macro_export]
macro_rules! assert_succeeded {
    ($outcome:expr) => {
        match $outcome {
            $crate::RetryOutcome::Success { .. } => {}
            other => panic!("Expected Success, got {:?}", other),
        }
    };
    ($outcome:expr, $attempts:expr) => {
        match $outcome {
            $crate::RetryOutcome::Success { attempts, .. } => {
                assert_eq!(attempts, $attempts, "unexpected attempt count");
            }
            other => panic!("Expected Success, got {:?}", other),
        }
    };
}

/// Assert that a retry run exhausted its budget, optionally after `n` attempts.
///
/// # Example
///
/// ```rust
/// use stillwater_retry::{assert_exhausted, RetryOutcome};
///
/// let outcome: RetryOutcome<i32, &str> = RetryOutcome::Failure { last_error: "x", attempts: 3 };
/// assert_exhausted!(outcome, 3);
/// ```
#[macro_export]
macro_rules! assert_exhausted {
    ($outcome:expr) => {
        match $outcome {
            $crate::RetryOutcome::Failure { .. } => {}
            other => panic!("Expected Failure, got {:?}", other),
        }
    };
    ($outcome:expr, $attempts:expr) => {
        match $outcome {
            $crate::RetryOutcome::Failure { attempts, .. } => {
                assert_eq!(attempts, $attempts, "unexpected attempt count");
            }
            other => panic!("Expected Failure, got {:?}", other),
        }
    };
}

/// Assert that a retry run was cancelled.
///
/// # Example
///
/// ```rust
/// use stillwater_retry::{assert_cancelled, RetryOutcome};
///
/// let outcome: RetryOutcome<i32, &str> = RetryOutcome::Cancelled {
///     last_error: None,
///     attempts: 0,
/// };
/// assert_cancelled!(outcome);
/// ```
#[macro_export]
macro_rules! assert_cancelled {
    ($outcome:expr) => {
        match $outcome {
            $crate::RetryOutcome::Cancelled { .. } => {}
            other => panic!("Expected Cancelled, got {:?}", other),
        }
    };
}

#[cfg(feature = "proptest")]
mod arbitrary {
    use proptest::prelude::*;
    use std::time::Duration;

    use crate::retry::{Backoff, RetryPolicy};

    fn any_duration() -> impl Strategy<Value = Duration> {
        (0u64..10_000).prop_map(Duration::from_millis)
    }

    impl Arbitrary for Backoff {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
            prop_oneof![
                Just(Backoff::None),
                any_duration().prop_map(Backoff::Fixed),
                (any_duration(), proptest::option::of(any_duration()))
                    .prop_map(|(base, max)| Backoff::Linear { base, max }),
                (any_duration(), proptest::option::of(any_duration()))
                    .prop_map(|(base, max)| Backoff::Exponential { base, max }),
            ]
            .boxed()
        }
    }

    impl Arbitrary for RetryPolicy {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
            (1u32..=20, any::<Backoff>())
                .prop_filter_map("attempts are non-zero", |(n, backoff)| {
                    RetryPolicy::new(n, backoff).ok()
                })
                .boxed()
        }
    }

}
