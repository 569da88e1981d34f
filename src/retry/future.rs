//! Async retry executor built on tokio timers.
//!
//! Same loop as [`Retrier`](super::Retrier), but the operation returns a
//! future and waits use `tokio::time::sleep`. From the caller's side the run
//! is still one sequential flow: it completes when the operation succeeds,
//! the budget is spent, or the cancellation future resolves.

use std::future::Future;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::Instant;

use super::executor::RetryEvent;
use super::outcome::RetryOutcome;
use super::policy::RetryPolicy;

/// Retry an async operation.
///
/// Each retry calls `op` again to get a fresh future.
///
/// # Example
///
/// ```rust
/// use stillwater_retry::{retry_async, RetryPolicy};
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let policy = RetryPolicy::exponential(3, Duration::from_millis(1)).unwrap();
/// let outcome = retry_async(&policy, || async { Ok::<_, String>(42) }).await;
///
/// assert_eq!(outcome.into_value(), Some(42));
/// # });
/// ```
pub async fn retry_async<T, E, F, Fut>(policy: &RetryPolicy, op: F) -> RetryOutcome<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    run(policy, op, futures::future::pending(), |_: &RetryEvent<'_, E>| {}).await
}

/// Retry an async operation, calling `on_retry` after every failed attempt.
///
/// # Example
///
/// ```rust
/// use stillwater_retry::{retry_async_with_hooks, RetryEvent, RetryPolicy};
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let policy = RetryPolicy::fixed(2, Duration::from_millis(1)).unwrap();
/// let mut seen = Vec::new();
/// let outcome = retry_async_with_hooks(
///     &policy,
///     || async { Err::<(), _>("down") },
///     |event: &RetryEvent<'_, &str>| seen.push(event.attempt),
/// )
/// .await;
///
/// assert!(outcome.is_failure());
/// assert_eq!(seen, vec![1, 2]);
/// # });
/// ```
pub async fn retry_async_with_hooks<T, E, F, Fut, H>(
    policy: &RetryPolicy,
    op: F,
    on_retry: H,
) -> RetryOutcome<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    H: FnMut(&RetryEvent<'_, E>),
{
    run(policy, op, futures::future::pending(), on_retry).await
}

/// Retry an async operation until it succeeds, the budget is spent, or
/// `cancel` resolves.
///
/// `cancel` can be any future: a `CancellationToken::cancelled()`, a
/// shutdown signal, a oneshot receiver. A pending wait is abandoned as soon
/// as it resolves; an in-flight attempt is allowed to finish.
pub async fn retry_async_until<T, E, F, Fut, C>(
    policy: &RetryPolicy,
    op: F,
    cancel: C,
) -> RetryOutcome<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Future<Output = ()>,
{
    run(policy, op, cancel, |_: &RetryEvent<'_, E>| {}).await
}

async fn run<T, E, F, Fut, C, H>(
    policy: &RetryPolicy,
    mut op: F,
    cancel: C,
    mut on_retry: H,
) -> RetryOutcome<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Future<Output = ()>,
    H: FnMut(&RetryEvent<'_, E>),
{
    let mut cancel = std::pin::pin!(cancel);
    let start = Instant::now();
    let mut attempt = 1u32;
    let mut last_error: Option<E> = None;

    loop {
        if cancel.as_mut().now_or_never().is_some() {
            return cancelled(last_error, attempt - 1);
        }

        let error = match op().await {
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

        let next_delay = policy
            .allows_attempt(attempt.saturating_add(1))
            .then(|| policy.delay_with_jitter(attempt));

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

        if delay > Duration::ZERO {
            tokio::select! {
                biased;
                () = cancel.as_mut() => return cancelled(Some(error), attempt),
                () = tokio::time::sleep(delay) => {}
            }
        }

        last_error = Some(error);
        attempt = attempt.saturating_add(1);
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
