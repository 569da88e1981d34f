//! Retry execution with declarative backoff policies.
//!
//! This module follows the "pure core, imperative shell" split:
//!
//! - **Pure Core**: [`RetryPolicy`] is just data. Its wait schedule is a pure
//!   function of the attempt number and can be inspected without running
//!   anything.
//! - **Imperative Shell**: [`Retrier`] and [`retry`] (and the async variants
//!   behind the `async` feature) run the loop, suspend between attempts, and
//!   turn every result into a [`RetryOutcome`].
//!
//! # Quick Start
//!
//! ```rust
//! use stillwater_retry::{retry, RetryOutcome, RetryPolicy};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::exponential(3, Duration::from_millis(1))?;
//!
//! let mut calls = 0;
//! let outcome = retry(&policy, || {
//!     calls += 1;
//!     if calls == 1 { Err("warming up") } else { Ok(calls) }
//! });
//!
//! assert_eq!(outcome, RetryOutcome::Success { value: 2, attempts: 2 });
//! # Ok::<(), stillwater_retry::PolicyError>(())
//! ```
//!
//! # Backoff Strategies
//!
//! - **None**: Retry immediately
//! - **Fixed**: Same delay before every retry
//! - **Linear**: Delay grows with the attempt number (100ms, 200ms, 300ms, ...)
//! - **Exponential**: Delay doubles each retry (100ms, 200ms, 400ms, ...)
//! - **Custom**: Any `Fn(u32) -> Duration`
//!
//! # Jitter Support
//!
//! Enable the `jitter` feature to randomise waits:
//!
//! ```toml
//! stillwater-retry = { version = "...", features = ["jitter"] }
//! ```
//!
//! # Error Types
//!
//! - [`PolicyError`]: an invalid policy, reported at construction
//! - [`RetryError`]: the `Result` form of a failed or cancelled run

mod error;
mod executor;
#[cfg(feature = "async")]
mod future;
mod outcome;
mod policy;

pub use error::{PolicyError, RetryError};
pub use executor::{retry, CancelToken, Retrier, RetryEvent, Sleeper, ThreadSleeper, Wake};
#[cfg(feature = "async")]
pub use future::{retry_async, retry_async_until, retry_async_with_hooks};
pub use outcome::RetryOutcome;
pub use policy::{Backoff, JitterStrategy, MaxAttempts, RetryPolicy, WaitFn};

#[cfg(test)]
mod tests;
