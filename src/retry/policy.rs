//! Retry policy types and configuration.

use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use super::error::PolicyError;

/// A retry policy describing how many times to run an operation and how
/// long to wait between attempts.
///
/// Policies are pure data - they describe retry behavior but don't execute it.
/// A policy can be cloned freely and reused across any number of retry calls.
///
/// # Bounds Behavior
///
/// Every policy built with [`RetryPolicy::new`] (or one of the shorthand
/// constructors) has a finite attempt budget of at least one. Retrying without
/// limit is only possible through [`RetryPolicy::forever`], so an unbounded
/// loop is always an explicit choice.
///
/// # Examples
///
/// ```rust
/// use stillwater_retry::{Backoff, RetryPolicy};
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new(4, Backoff::exponential(Duration::from_millis(5)))?;
///
/// assert_eq!(policy.max_attempts(), Some(4));
/// let waits: Vec<_> = policy.schedule().collect();
/// assert_eq!(
///     waits,
///     vec![
///         Duration::from_millis(5),
///         Duration::from_millis(10),
///         Duration::from_millis(20),
///     ]
/// );
/// # Ok::<(), stillwater_retry::PolicyError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: MaxAttempts,
    backoff: Backoff,
    max_delay: Option<Duration>,
    jitter: JitterStrategy,
}

/// How many times an operation may be invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxAttempts {
    /// At most this many invocations, the first one included.
    Limited(NonZeroU32),
    /// Keep going until the operation succeeds or the run is cancelled.
    Unlimited,
}

/// The wait schedule between attempts.
///
/// Waits are computed from the 1-based number of the attempt that just
/// failed. Arithmetic saturates instead of overflowing.
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    /// Retry immediately.
    None,
    /// The same delay before every retry.
    Fixed(Duration),
    /// Delay grows linearly: base * attempt.
    Linear {
        /// Base delay duration.
        base: Duration,
        /// Optional upper bound for a single wait.
        max: Option<Duration>,
    },
    /// Delay doubles: base * 2^(attempt - 1).
    Exponential {
        /// Base delay duration.
        base: Duration,
        /// Optional upper bound for a single wait.
        max: Option<Duration>,
    },
    /// Caller-supplied wait function.
    Custom(WaitFn),
}

/// A shareable wait function for [`Backoff::Custom`].
///
/// Two `WaitFn`s compare equal only when they share the same allocation.
#[derive(Clone)]
pub struct WaitFn(Arc<dyn Fn(u32) -> Duration + Send + Sync>);

/// Strategy for adding randomness to delays.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum JitterStrategy {
    /// No jitter applied.
    #[default]
    None,
    /// Add ±percentage randomness to delay.
    Proportional(f64),
    /// Random delay between 0 and calculated delay.
    Full,
}

impl WaitFn {
    /// Wrap a function from attempt number to wait duration.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Evaluate the function for a failed attempt.
    pub fn call(&self, attempt: u32) -> Duration {
        (self.0)(attempt)
    }
}

impl fmt::Debug for WaitFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WaitFn(..)")
    }
}

impl PartialEq for WaitFn {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Backoff {
    /// Constant delay between attempts.
    pub fn fixed(delay: Duration) -> Self {
        Backoff::Fixed(delay)
    }

    /// Linearly increasing delay with no cap.
    ///
    /// ```rust
    /// use stillwater_retry::Backoff;
    /// use std::time::Duration;
    ///
    /// let backoff = Backoff::linear(Duration::from_millis(100));
    /// assert_eq!(backoff.wait(1), Duration::from_millis(100));
    /// assert_eq!(backoff.wait(3), Duration::from_millis(300));
    /// ```
    pub fn linear(base: Duration) -> Self {
        Backoff::Linear { base, max: None }
    }

    /// Exponentially increasing delay with no cap.
    ///
    /// ```rust
    /// use stillwater_retry::Backoff;
    /// use std::time::Duration;
    ///
    /// let backoff = Backoff::exponential(Duration::from_millis(100))
    ///     .capped_at(Duration::from_millis(250));
    /// assert_eq!(backoff.wait(1), Duration::from_millis(100));
    /// assert_eq!(backoff.wait(2), Duration::from_millis(200));
    /// assert_eq!(backoff.wait(3), Duration::from_millis(250));
    /// ```
    pub fn exponential(base: Duration) -> Self {
        Backoff::Exponential { base, max: None }
    }

    /// Build a backoff from an arbitrary function of the failed attempt number.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        Backoff::Custom(WaitFn::new(f))
    }

    /// Set the cap of a linear or exponential backoff.
    ///
    /// Other variants are returned unchanged; use
    /// [`RetryPolicy::with_max_delay`] to cap any schedule.
    pub fn capped_at(self, cap: Duration) -> Self {
        match self {
            Backoff::Linear { base, .. } => Backoff::Linear {
                base,
                max: Some(cap),
            },
            Backoff::Exponential { base, .. } => Backoff::Exponential {
                base,
                max: Some(cap),
            },
            other => other,
        }
    }

    /// Wait after the given failed attempt (1-based).
    ///
    /// An attempt number of 0 is treated as 1.
    pub fn wait(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        match self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(d) => *d,
            Backoff::Linear { base, max } => cap(base.saturating_mul(attempt), *max),
            Backoff::Exponential { base, max } => {
                let factor = 2u32.saturating_pow(attempt - 1);
                cap(base.saturating_mul(factor), *max)
            }
            Backoff::Custom(f) => f.call(attempt),
        }
    }
}

/// Clamp a proportional jitter factor to `0.0..=1.0`; non-finite becomes 0.
fn jitter_factor(factor: f64) -> f64 {
    if factor.is_finite() {
        factor.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn cap(delay: Duration, max: Option<Duration>) -> Duration {
    match max {
        Some(max) => delay.min(max),
        None => delay,
    }
}

impl RetryPolicy {
    /// Create a policy allowing at most `max_attempts` invocations.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::ZeroAttempts`] when `max_attempts` is zero.
    ///
    /// ```rust
    /// use stillwater_retry::{Backoff, PolicyError, RetryPolicy};
    ///
    /// assert_eq!(
    ///     RetryPolicy::new(0, Backoff::None),
    ///     Err(PolicyError::ZeroAttempts)
    /// );
    /// ```
    pub fn new(max_attempts: u32, backoff: Backoff) -> Result<Self, PolicyError> {
        let max_attempts = NonZeroU32::new(max_attempts).ok_or(PolicyError::ZeroAttempts)?;
        Ok(Self {
            max_attempts: MaxAttempts::Limited(max_attempts),
            backoff,
            max_delay: None,
            jitter: JitterStrategy::None,
        })
    }

    /// Try exactly once, never retry.
    pub fn once() -> Self {
        Self {
            max_attempts: MaxAttempts::Limited(NonZeroU32::MIN),
            backoff: Backoff::None,
            max_delay: None,
            jitter: JitterStrategy::None,
        }
    }

    /// Constant delay between up to `max_attempts` attempts.
    ///
    /// ```rust
    /// use stillwater_retry::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::fixed(3, Duration::from_millis(10))?;
    /// let total: Duration = policy.schedule().sum();
    /// assert_eq!(total, Duration::from_millis(20));
    /// # Ok::<(), stillwater_retry::PolicyError>(())
    /// ```
    pub fn fixed(max_attempts: u32, delay: Duration) -> Result<Self, PolicyError> {
        Self::new(max_attempts, Backoff::fixed(delay))
    }

    /// Linear backoff between up to `max_attempts` attempts.
    pub fn linear(max_attempts: u32, base: Duration) -> Result<Self, PolicyError> {
        Self::new(max_attempts, Backoff::linear(base))
    }

    /// Exponential backoff between up to `max_attempts` attempts.
    pub fn exponential(max_attempts: u32, base: Duration) -> Result<Self, PolicyError> {
        Self::new(max_attempts, Backoff::exponential(base))
    }

    /// Retry until the operation succeeds or the run is cancelled.
    ///
    /// Only use this together with a cancellable executor entry point, or
    /// with an operation that is known to eventually succeed.
    pub fn forever(backoff: Backoff) -> Self {
        Self {
            max_attempts: MaxAttempts::Unlimited,
            backoff,
            max_delay: None,
            jitter: JitterStrategy::None,
        }
    }

    /// Cap every wait, jitter included, at `max`.
    pub fn with_max_delay(mut self, max: Duration) -> Self {
        self.max_delay = Some(max);
        self
    }

    /// Add proportional jitter to delays.
    ///
    /// The factor is clamped to `0.0..=1.0`; `0.25` spreads each wait over
    /// ±25% of its computed value. A NaN or infinite factor means no spread.
    ///
    /// **Note**: Requires the `jitter` feature. Without it, waits are not randomised.
    pub fn with_jitter(mut self, factor: f64) -> Self {
        self.jitter = JitterStrategy::Proportional(jitter_factor(factor));
        self
    }

    /// Use full jitter: each wait is uniform between zero and its computed value.
    ///
    /// **Note**: Requires the `jitter` feature. Without it, waits are not randomised.
    pub fn with_full_jitter(mut self) -> Self {
        self.jitter = JitterStrategy::Full;
        self
    }

    /// Maximum number of attempts, or `None` for [`RetryPolicy::forever`].
    pub fn max_attempts(&self) -> Option<u32> {
        match self.max_attempts {
            MaxAttempts::Limited(n) => Some(n.get()),
            MaxAttempts::Unlimited => None,
        }
    }

    /// Returns true if this policy never runs out of attempts.
    pub fn is_unlimited(&self) -> bool {
        self.max_attempts == MaxAttempts::Unlimited
    }

    /// Get the backoff schedule.
    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Get the maximum delay cap.
    pub fn max_delay(&self) -> Option<Duration> {
        self.max_delay
    }

    /// Get the jitter strategy.
    pub fn jitter(&self) -> &JitterStrategy {
        &self.jitter
    }

    /// Whether attempt number `attempt` (1-based) is within budget.
    pub fn allows_attempt(&self, attempt: u32) -> bool {
        match self.max_attempts {
            MaxAttempts::Limited(n) => attempt >= 1 && attempt <= n.get(),
            MaxAttempts::Unlimited => attempt >= 1,
        }
    }

    /// The wait after failed attempt `attempt` (1-based), without jitter.
    ///
    /// This is a pure function of the policy and the attempt number. It does
    /// not consult the attempt budget.
    pub fn wait_for(&self, attempt: u32) -> Duration {
        cap(self.backoff.wait(attempt), self.max_delay)
    }

    /// The wait actually used by the executors, jitter applied.
    pub(crate) fn delay_with_jitter(&self, attempt: u32) -> Duration {
        let delay = self.jitter.apply(self.backoff.wait(attempt));
        cap(delay, self.max_delay)
    }

    /// The sequence of waits between attempts.
    ///
    /// A limited policy yields `max_attempts - 1` waits; an unlimited one
    /// yields waits for every attempt number up to `u32::MAX`.
    pub fn schedule(&self) -> impl Iterator<Item = Duration> + '_ {
        let end = match self.max_attempts {
            MaxAttempts::Limited(n) => n.get(),
            MaxAttempts::Unlimited => u32::MAX,
        };
        (1..end).map(move |attempt| self.wait_for(attempt))
    }
}

impl JitterStrategy {
    /// Apply jitter to a computed delay.
    pub fn apply(&self, delay: Duration) -> Duration {
        match self {
            JitterStrategy::None => delay,
            #[cfg(feature = "jitter")]
            JitterStrategy::Proportional(factor) => {
                use rand::Rng;
                let secs = delay.as_secs_f64();
                let spread = secs * jitter_factor(*factor);
                let min = (secs - spread).max(0.0);
                let max = secs + spread;
                let jittered = rand::rng().random_range(min..=max);
                Duration::try_from_secs_f64(jittered).unwrap_or(Duration::MAX)
            }
            #[cfg(not(feature = "jitter"))]
            JitterStrategy::Proportional(_) => delay,
            #[cfg(feature = "jitter")]
            JitterStrategy::Full => {
                use rand::Rng;
                let max_nanos = u64::try_from(delay.as_nanos()).unwrap_or(u64::MAX);
                Duration::from_nanos(rand::rng().random_range(0..=max_nanos))
            }
            #[cfg(not(feature = "jitter"))]
            JitterStrategy::Full => delay,
        }
    }
}
