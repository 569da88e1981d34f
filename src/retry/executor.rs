//! Blocking retry executor.
//!
//! The loop runs on the caller's thread. The only suspension point is the
//! wait between a failed attempt and the next one, and that wait goes
//! through a [`Sleeper`] so it can be observed in tests and interrupted by a
//! [`CancelToken`].

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::outcome::RetryOutcome;
use super::policy::RetryPolicy;

/// Information about a failed attempt, passed to hooks.
#[derive(Debug, Clone)]
pub struct RetryEvent<'a, E> {
    /// Which attempt just failed (1-indexed).
    pub attempt: u32,
    /// The error from the failed attempt.
    pub error: &'a E,
    /// Delay before the next attempt, or `None` if this was the last one.
    pub next_delay: Option<Duration>,
    /// Total elapsed time since the first attempt started.
    pub elapsed: Duration,
}

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// The full duration elapsed.
    Elapsed,
    /// A cancellation request cut the wait short.
    Cancelled,
}

/// Something that can suspend the retry loop between attempts.
pub trait Sleeper {
    /// Wait for `duration`, returning early if `cancel` is triggered.
    fn sleep(&self, duration: Duration, cancel: Option<&CancelToken>) -> Wake;
}

/// Blocks the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration, cancel: Option<&CancelToken>) -> Wake {
        match cancel {
            Some(token) => token.wait_timeout(duration),
            None => {
                std::thread::sleep(duration);
                Wake::Elapsed
            }
        }
    }
}

impl<S: Sleeper + ?Sized> Sleeper for &S {
    fn sleep(&self, duration: Duration, cancel: Option<&CancelToken>) -> Wake {
        (**self).sleep(duration, cancel)
    }
}

/// Cooperative cancellation flag shared between a retry run and its owner.
///
/// Clones share the same flag. Cancelling wakes any thread blocked in a
/// [`ThreadSleeper`] wait on this token.
///
/// # Examples
///
/// ```rust
/// use stillwater_retry::{CancelToken, Retrier, RetryPolicy};
/// use std::time::Duration;
///
/// let token = CancelToken::new();
/// token.cancel();
///
/// let policy = RetryPolicy::fixed(5, Duration::from_secs(60))?;
/// let outcome = Retrier::new(policy).run_cancellable(|| Err::<(), _>("down"), &token);
///
/// assert!(outcome.is_cancelled());
/// assert_eq!(outcome.attempts(), 0);
/// # Ok::<(), stillwater_retry::PolicyError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelState>,
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

impl CancelToken {
    /// Create a token that is not yet cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation and wake any waiter.
    pub fn cancel(&self) {
        let mut cancelled = self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *cancelled = true;
        self.inner.wake.notify_all();
    }

    /// Returns true once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        *self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Block for up to `duration`, returning early on cancellation.
    pub fn wait_timeout(&self, duration: Duration) -> Wake {
        let guard = self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = self
            .inner
            .wake
            .wait_timeout_while(guard, duration, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        if *guard {
            Wake::Cancelled
        } else {
            Wake::Elapsed
        }
    }
}

/// Runs operations under a [`RetryPolicy`].
///
/// # Examples
///
/// ```rust
/// use stillwater_retry::{Retrier, RetryPolicy};
/// use std::time::Duration;
///
/// let retrier = Retrier::new(RetryPolicy::fixed(3, Duration::from_millis(1))?);
///
/// let mut calls = 0;
/// let outcome = retrier.run(|| {
///     calls += 1;
///     if calls < 3 { Err("busy") } else { Ok("done") }
/// });
///
/// assert_eq!(outcome.into_value(), Some("done"));
/// assert_eq!(calls, 3);
/// # Ok::<(), stillwater_retry::PolicyError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Retrier<S = ThreadSleeper> {
    policy: RetryPolicy,
    sleeper: S,
}

impl Retrier<ThreadSleeper> {
    /// Create a retrier that blocks the calling thread between attempts.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            sleeper: ThreadSleeper,
        }
    }
}

impl<S: Sleeper> Retrier<S> {
    /// Replace the sleeper used between attempts.
    pub fn with_sleeper<S2: Sleeper>(self, sleeper: S2) -> Retrier<S2> {
        Retrier {
            policy: self.policy,
            sleeper,
        }
    }

    /// Get the policy.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `op` until it succeeds or the attempt budget is spent.
    pub fn run<T, E, F>(&self, op: F) -> RetryOutcome<T, E>
    where
        F: FnMut() -> Result<T, E>,
    {
        self.execute(op, None, |_: &RetryEvent<'_, E>| {})
    }

    /// Like [`run`](Self::run), calling `on_retry` after every failed attempt.
    ///
    /// The hook is synchronous and should not block; use it for logging or
    /// metrics.
    pub fn run_with_hooks<T, E, F, H>(&self, op: F, on_retry: H) -> RetryOutcome<T, E>
    where
        F: FnMut() -> Result<T, E>,
        H: FnMut(&RetryEvent<'_, E>),
    {
        self.execute(op, None, on_retry)
    }

    /// Like [`run`](Self::run), stopping as soon as `token` is cancelled.
    ///
    /// Cancellation is checked before every attempt and interrupts a pending
    /// wait. The operation itself is never interrupted.
    pub fn run_cancellable<T, E, F>(&self, op: F, token: &CancelToken) -> RetryOutcome<T, E>
    where
        F: FnMut() -> Result<T, E>,
    {
        self.execute(op, Some(token), |_: &RetryEvent<'_, E>| {})
    }

    /// Cancellable run with a retry hook.
    pub fn run_cancellable_with_hooks<T, E, F, H>(
        &self,
        op: F,
        token: &CancelToken,
        on_retry: H,
    ) -> RetryOutcome<T, E>
    where
        F: FnMut() -> Result<T, E>,
        H: FnMut(&RetryEvent<'_, E>),
    {
        self.execute(op, Some(token), on_retry)
    }

    fn execute<T, E, F, H>(
        &self,
        mut op: F,
        cancel: Option<&CancelToken>,
        mut on_retry: H,
    ) -> RetryOutcome<T, E>
    where
        F: FnMut() -> Result<T, E>,
        H: FnMut(&RetryEvent<'_, E>),
    {
        let start = Instant::now();
        let mut attempt = 1u32;
        let mut last_error: Option<E> = None;

        loop {
            if cancel.is_some_and(CancelToken::is_cancelled) {
                return cancelled(last_error, attempt - 1);
            }

            let error = match op() {
                Ok(value) => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(attempt, "operation succeeded");
                    return RetryOutcome::Success {
                        value,
                        attempts: attempt,
                    };
                }
                Err(error) => error,
            };

            let next_delay = self
                .policy
                .allows_attempt(attempt.saturating_add(1))
                .then(|| self.policy.delay_with_jitter(attempt));

            on_retry(&RetryEvent {
                attempt,
                error: &error,
                next_delay,
                elapsed: start.elapsed(),
            });

            let Some(delay) = next_delay else {
                #[cfg(feature = "tracing")]
                tracing::warn!(attempts = attempt, "retry budget exhausted");
                return RetryOutcome::Failure {
                    last_error: error,
                    attempts: attempt,
                };
            };

            #[cfg(feature = "tracing")]
            tracing::debug!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                "attempt failed, retrying"
            );

            if !delay.is_zero() && self.sleeper.sleep(delay, cancel) == Wake::Cancelled {
                return cancelled(Some(error), attempt);
            }

            last_error = Some(error);
            attempt = attempt.saturating_add(1);
        }
    }
}

fn cancelled<T, E>(last_error: Option<E>, attempts: u32) -> RetryOutcome<T, E> {
    #[cfg(feature = "tracing")]
    tracing::info!(attempts, "retry cancelled");
    RetryOutcome::Cancelled {
        last_error,
        attempts,
    }
}

/// Run `op` under `policy`, blocking the calling thread between attempts.
///
/// # Examples
///
/// ```rust
/// use stillwater_retry::{retry, RetryPolicy};
///
/// let outcome = retry(&RetryPolicy::once(), || Err::<(), _>("nope"));
/// assert!(outcome.is_failure());
/// assert_eq!(outcome.attempts(), 1);
/// ```
pub fn retry<T, E, F>(policy: &RetryPolicy, op: F) -> RetryOutcome<T, E>
where
    F: FnMut() -> Result<T, E>,
{
    Retrier::new(policy.clone()).run(op)
}
