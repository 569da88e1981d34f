//! # Stillwater Retry
//!
//! > *"Still waters run pure"*
//!
//! Retry a fallible operation under an immutable policy and always get a
//! definite answer back.
//!
//! ## Philosophy
//!
//! - **Still** = the policy: pure data, cloneable, reusable, inspectable
//! - **Water** = the executor: runs the operation, waits between attempts,
//!   and reports a [`RetryOutcome`] instead of propagating failures
//!
//! ## Quick Example
//!
//! ```rust
//! use stillwater_retry::{Backoff, Retrier, RetryOutcome, RetryPolicy};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new(
//!     4,
//!     Backoff::exponential(Duration::from_millis(1)).capped_at(Duration::from_millis(3)),
//! )?;
//!
//! let outcome = Retrier::new(policy).run(|| Err::<(), _>("service unavailable"));
//!
//! match outcome {
//!     RetryOutcome::Failure { last_error, attempts } => {
//!         assert_eq!(last_error, "service unavailable");
//!         assert_eq!(attempts, 4);
//!     }
//!     other => panic!("unexpected outcome: {:?}", other),
//! }
//! # Ok::<(), stillwater_retry::PolicyError>(())
//! ```
//!
//! The operation must be safe to invoke more than once; the executor has no
//! way of knowing what a failed attempt left behind.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod config;
pub mod retry;
pub mod testing;

// Re-exports
pub use config::{ConfigError, PolicyConfig, PolicySet};
pub use retry::{
    retry, Backoff, CancelToken, PolicyError, Retrier, RetryError, RetryEvent, RetryOutcome,
    RetryPolicy,
};
#[cfg(feature = "async")]
pub use retry::{retry_async, retry_async_until, retry_async_with_hooks};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::retry::{
        retry, Backoff, CancelToken, PolicyError, Retrier, RetryError, RetryEvent, RetryOutcome,
        RetryPolicy,
    };
    #[cfg(feature = "async")]
    pub use crate::retry::{retry_async, retry_async_until, retry_async_with_hooks};
}
