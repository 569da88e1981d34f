//! Integration tests for retry functionality.

use super::*;
use crate::testing::{FlakyError, FlakyOperation, RecordingSleeper};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn test_retry_succeeds_on_third_attempt() {
    let sleeper = RecordingSleeper::new();
    let retrier = Retrier::new(RetryPolicy::fixed(5, ms(1)).unwrap())
        .with_sleeper(&sleeper);
    let op = FlakyOperation::new(2, "success");

    let outcome = retrier.run(|| op.call());

    assert_eq!(
        outcome,
        RetryOutcome::Success {
            value: "success",
            attempts: 3
        }
    );
    assert_eq!(op.calls(), 3);
    assert_eq!(sleeper.waits().len(), 2);
}

#[test]
fn test_retry_exhausted_returns_last_error() {
    let sleeper = RecordingSleeper::new();
    let retrier = Retrier::new(RetryPolicy::fixed(4, ms(1)).unwrap())
        .with_sleeper(&sleeper);
    let op = FlakyOperation::always_failing(());

    let outcome = retrier.run(|| op.call());

    assert_eq!(
        outcome,
        RetryOutcome::Failure {
            last_error: FlakyError(4),
            attempts: 4
        }
    );
    assert_eq!(op.calls(), 4);
}

#[test]
fn test_single_attempt_policy_never_waits() {
    let sleeper = RecordingSleeper::new();
    let retrier = Retrier::new(RetryPolicy::once())
        .with_sleeper(&sleeper);
    let op = FlakyOperation::always_failing(());

    let outcome = retrier.run(|| op.call());

    assert!(outcome.is_failure());
    assert_eq!(op.calls(), 1);
    assert!(sleeper.waits().is_empty());
}

#[test]
fn test_exponential_waits_before_each_retry() {
    let sleeper = RecordingSleeper::new();
    let retrier = Retrier::new(RetryPolicy::exponential(4, ms(5)).unwrap())
        .with_sleeper(&sleeper);

    let _ = retrier.run(|| Err::<(), _>("down"));

    assert_eq!(sleeper.waits(), vec![ms(5), ms(10), ms(20)]);
}

#[test]
fn test_exponential_waits_respect_cap() {
    let sleeper = RecordingSleeper::new();
    let policy = RetryPolicy::new(4, Backoff::exponential(ms(5)).capped_at(ms(8))).unwrap();
    let retrier = Retrier::new(policy)
        .with_sleeper(&sleeper);

    let _ = retrier.run(|| Err::<(), _>("down"));

    assert_eq!(sleeper.waits(), vec![ms(5), ms(8), ms(8)]);
}

#[test]
fn test_policy_is_reusable_across_runs() {
    let sleeper = RecordingSleeper::new();
    let retrier = Retrier::new(RetryPolicy::fixed(3, ms(10)).unwrap())
        .with_sleeper(&sleeper);

    let first = retrier.run(|| Err::<(), _>("down"));
    let second = retrier.run(|| Ok::<_, &str>(1));

    assert_eq!(first.attempts(), 3);
    assert_eq!(second.attempts(), 1);
    assert_eq!(sleeper.total(), ms(20));
}

#[test]
fn test_errors_are_not_classified() {
    #[derive(Debug, PartialEq, Clone)]
    enum TestError {
        Transient,
        Permanent,
    }

    let attempts = AtomicU32::new(0);
    let policy = RetryPolicy::new(3, Backoff::None).unwrap();

    let outcome = retry(&policy, || {
        let n = attempts.fetch_add(1, Ordering::SeqCst);
        if n == 0 {
            Err::<(), _>(TestError::Transient)
        } else {
            Err(TestError::Permanent)
        }
    });

    assert_eq!(outcome.last_error(), Some(&TestError::Permanent));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[test]
fn test_hooks_called_for_each_failure() {
    let hook_calls = Arc::new(AtomicU32::new(0));
    let retrier = Retrier::new(RetryPolicy::new(5, Backoff::None).unwrap());
    let op = FlakyOperation::new(2, "success");

    let outcome = retrier.run_with_hooks(|| op.call(), {
        let hook_calls = hook_calls.clone();
        move |_event: &RetryEvent<'_, FlakyError>| {
            hook_calls.fetch_add(1, Ordering::SeqCst);
        }
    });

    assert!(outcome.is_success());
    assert_eq!(hook_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_hook_event_carries_error() {
    let retrier = Retrier::new(RetryPolicy::new(2, Backoff::None).unwrap());
    let mut errors = Vec::new();

    let _ = retrier.run_with_hooks(
        || Err::<(), _>(String::from("refused")),
        |event: &RetryEvent<'_, String>| errors.push(event.error.clone()),
    );

    assert_eq!(errors, vec!["refused".to_string(), "refused".to_string()]);
}

#[test]
fn test_cancel_from_other_thread_stops_real_wait() {
    let token = CancelToken::new();
    let remote = token.clone();
    let retrier = Retrier::new(RetryPolicy::fixed(3, Duration::from_secs(60)).unwrap());

    let handle = std::thread::spawn(move || {
        std::thread::sleep(ms(20));
        remote.cancel();
    });
    let start = std::time::Instant::now();
    let outcome = retrier.run_cancellable(|| Err::<(), _>("down"), &token);
    handle.join().unwrap();

    assert_eq!(
        outcome,
        RetryOutcome::Cancelled {
            last_error: Some("down"),
            attempts: 1
        }
    );
    assert!(start.elapsed() < Duration::from_secs(30));
}

#[test]
fn test_cancellable_with_hooks_runs_to_success() {
    let token = CancelToken::new();
    let retrier = Retrier::new(RetryPolicy::new(3, Backoff::None).unwrap());
    let op = FlakyOperation::new(1, 9);
    let mut hooks = 0;

    let outcome = retrier.run_cancellable_with_hooks(
        || op.call(),
        &token,
        |_: &RetryEvent<'_, FlakyError>| hooks += 1,
    );

    assert_eq!(outcome.into_value(), Some(9));
    assert_eq!(hooks, 1);
}

#[test]
fn test_into_result_with_question_mark() {
    fn fetch(policy: &RetryPolicy) -> Result<u32, RetryError<FlakyError>> {
        let op = FlakyOperation::new(1, 7);
        let value = retry(policy, || op.call()).into_result()?;
        Ok(value * 2)
    }

    let policy = RetryPolicy::new(2, Backoff::None).unwrap();
    assert_eq!(fetch(&policy), Ok(14));
    assert_eq!(
        fetch(&RetryPolicy::once()),
        Err(RetryError::Exhausted {
            last_error: FlakyError(1),
            attempts: 1
        })
    );
}
