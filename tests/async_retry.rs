//! Async executor tests on paused tokio time
#![cfg(feature = "async")]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use stillwater_retry::prelude::*;
use stillwater_retry::{assert_cancelled, assert_exhausted, assert_succeeded};
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn exponential_waits_before_attempts_two_three_four() {
    let policy = RetryPolicy::exponential(4, Duration::from_millis(5)).unwrap();
    let mut delays = Vec::new();

    let outcome = retry_async_with_hooks(
        &policy,
        || async { Err::<(), _>("down") },
        |event: &RetryEvent<'_, &str>| delays.extend(event.next_delay),
    )
    .await;

    assert_exhausted!(outcome, 4);
    assert_eq!(
        delays,
        vec![
            Duration::from_millis(5),
            Duration::from_millis(10),
            Duration::from_millis(20)
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn backoff_timing_is_honoured() {
    let attempts = Arc::new(AtomicU32::new(0));
    let start = Instant::now();

    let outcome = retry_async(
        &RetryPolicy::exponential(6, Duration::from_millis(10)).unwrap(),
        || {
            let attempts = attempts.clone();
            async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                if n < 3 {
                    Err("retry")
                } else {
                    Ok("done")
                }
            }
        },
    )
    .await;

    // 10ms + 20ms + 40ms
    assert_succeeded!(outcome, 4);
    assert!(start.elapsed() >= Duration::from_millis(70));
}

#[tokio::test(start_paused = true)]
async fn forever_policy_stops_on_cancel() {
    let token = CancelToken::new();
    let remote = token.clone();
    let calls = Arc::new(AtomicU32::new(0));

    let outcome = retry_async_until(
        &RetryPolicy::forever(Backoff::fixed(Duration::from_secs(1))),
        || {
            let calls = calls.clone();
            let remote = remote.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 4 {
                    remote.cancel();
                }
                Err::<(), _>("still down")
            }
        },
        async {
            while !token.is_cancelled() {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        },
    )
    .await;

    assert_cancelled!(outcome);
    assert_eq!(calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn concurrent_runs_are_independent() {
    let policy = RetryPolicy::new(3, Backoff::None).unwrap();

    let (a, b) = tokio::join!(
        retry_async(&policy, || async { Ok::<_, &str>(1) }),
        retry_async(&policy, || async { Err::<i32, _>("down") }),
    );

    assert_succeeded!(a, 1);
    assert_exhausted!(b, 3);
}
