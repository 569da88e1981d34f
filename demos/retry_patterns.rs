//! Retry Patterns Example
//!
//! Demonstrates:
//! - Comparing backoff schedules
//! - Blocking retry with a hook for logging
//! - Async retry with cancellation
//! - Picking a policy by name from the environment

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use stillwater_retry::config::{BackoffConfig, PolicyConfig, PolicySet};
use stillwater_retry::prelude::*;

// ==================== Backoff Schedules ====================

fn example_schedules() -> Result<(), PolicyError> {
    println!("\n=== Example 1: Backoff Schedules ===");

    let base = Duration::from_millis(100);
    let policies = [
        ("fixed", RetryPolicy::fixed(5, base)?),
        ("linear", RetryPolicy::linear(5, base)?),
        ("exponential", RetryPolicy::exponential(5, base)?),
        (
            "capped",
            RetryPolicy::new(5, Backoff::exponential(base).capped_at(Duration::from_millis(300)))?,
        ),
    ];

    for (name, policy) in &policies {
        let waits: Vec<_> = policy.schedule().collect();
        println!("  {:<12} {:?}", name, waits);
    }
    Ok(())
}

// ==================== Blocking Retry ====================

fn example_blocking() -> Result<(), PolicyError> {
    println!("\n=== Example 2: Blocking Retry With Hooks ===");

    let retrier = Retrier::new(RetryPolicy::fixed(4, Duration::from_millis(20))?);
    let mut calls = 0;

    let outcome = retrier.run_with_hooks(
        || {
            calls += 1;
            if calls < 3 {
                Err(format!("connection refused ({})", calls))
            } else {
                Ok("connected")
            }
        },
        |event: &RetryEvent<'_, String>| {
            println!(
                "  attempt {} failed: {}, next delay: {:?}",
                event.attempt, event.error, event.next_delay
            );
        },
    );

    match outcome {
        RetryOutcome::Success { value, attempts } => {
            println!("  {} after {} attempts", value, attempts)
        }
        other => println!("  gave up: {:?}", other),
    }
    Ok(())
}

// ==================== Async Retry With Cancellation ====================

async fn example_cancellation() -> Result<(), PolicyError> {
    println!("\n=== Example 3: Async Retry With Cancellation ===");

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(250)).await;
        println!("  shutdown requested");
        let _ = tx.send(());
    });

    let attempts = Arc::new(AtomicU32::new(0));
    let outcome = retry_async_until(
        &RetryPolicy::forever(Backoff::fixed(Duration::from_millis(100))),
        || {
            let attempts = attempts.clone();
            async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                println!("  attempt {}", n);
                Err::<(), _>("upstream unavailable")
            }
        },
        async move {
            let _ = rx.await;
        },
    )
    .await;

    println!("  cancelled: {}, attempts: {}", outcome.is_cancelled(), outcome.attempts());
    Ok(())
}

// ==================== Policy Selection ====================

fn example_selection() -> Result<(), Box<dyn std::error::Error>> {
    println!("\n=== Example 4: Policy Selection ===");

    let set = PolicySet::new()
        .with("dev", PolicyConfig::new(1, BackoffConfig::None))
        .with(
            "prod",
            PolicyConfig::new(
                5,
                BackoffConfig::Exponential {
                    base_ms: 200,
                    max_ms: Some(5_000),
                },
            ),
        );

    let policy = set.select_from_env("RETRY_POLICY", "dev")?;
    println!(
        "  selected policy with {:?} attempts: {:?}",
        policy.max_attempts(),
        policy.schedule().collect::<Vec<_>>()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("Retry Patterns Examples");
    println!("=======================");

    example_schedules()?;
    example_blocking()?;
    example_cancellation().await?;
    example_selection()?;

    println!("\n=== All examples completed successfully! ===");
    Ok(())
}
