//! Declarative policy configuration and named policy selection.
//!
//! Choosing which policy to use (by name, by deployment environment) is an
//! application concern. This module keeps that step a plain lookup: policies
//! are described as data, stored under names in a [`PolicySet`], and turned
//! into [`RetryPolicy`] values on demand.
//!
//! With the `serde` feature the types below can be loaded from any serde
//! format:
//!
//! ```rust,ignore
//! let set: PolicySet = serde_json::from_str(r#"{
//!     "policies": {
//!         "dev":  { "max_attempts": 1, "backoff": { "kind": "none" } },
//!         "prod": { "max_attempts": 5,
//!                   "backoff": { "kind": "exponential", "base_ms": 100, "max_ms": 2000 } }
//!     }
//! }"#)?;
//! let policy = set.select_from_env("APP_RETRY_POLICY", "dev")?;
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::retry::{Backoff, PolicyError, RetryPolicy};

/// Backoff schedule as configuration data.
///
/// Millisecond values are signed so that a negative value is reported as a
/// [`PolicyError::NegativeDuration`] instead of a parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum BackoffConfig {
    /// Retry immediately.
    #[default]
    None,
    /// Constant delay.
    Fixed {
        /// Delay in milliseconds.
        delay_ms: i64,
    },
    /// Linear growth.
    Linear {
        /// Base delay in milliseconds.
        base_ms: i64,
        /// Optional cap in milliseconds.
        #[cfg_attr(feature = "serde", serde(default))]
        max_ms: Option<i64>,
    },
    /// Exponential growth.
    Exponential {
        /// Base delay in milliseconds.
        base_ms: i64,
        /// Optional cap in milliseconds.
        #[cfg_attr(feature = "serde", serde(default))]
        max_ms: Option<i64>,
    },
}

/// Jitter selection as configuration data.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum JitterConfig {
    /// No jitter.
    #[default]
    None,
    /// ±`factor` proportional jitter.
    Proportional {
        /// Spread as a fraction of the delay, clamped to `0.0..=1.0`.
        factor: f64,
    },
    /// Uniform between zero and the computed delay.
    Full,
}

/// A complete retry policy as configuration data.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PolicyConfig {
    /// Attempt budget; must be at least 1 unless `retry_forever` is set.
    pub max_attempts: u32,
    /// Ignore `max_attempts` and retry until success or cancellation.
    #[cfg_attr(feature = "serde", serde(default))]
    pub retry_forever: bool,
    /// Wait schedule.
    #[cfg_attr(feature = "serde", serde(default))]
    pub backoff: BackoffConfig,
    /// Cap applied to every wait, in milliseconds.
    #[cfg_attr(feature = "serde", serde(default))]
    pub max_delay_ms: Option<i64>,
    /// Jitter selection.
    #[cfg_attr(feature = "serde", serde(default))]
    pub jitter: JitterConfig,
}

impl PolicyConfig {
    /// A config for `max_attempts` attempts with the given backoff.
    pub fn new(max_attempts: u32, backoff: BackoffConfig) -> Self {
        Self {
            max_attempts,
            retry_forever: false,
            backoff,
            max_delay_ms: None,
            jitter: JitterConfig::None,
        }
    }
}

fn millis(field: &'static str, value: i64) -> Result<Duration, PolicyError> {
    u64::try_from(value)
        .map(Duration::from_millis)
        .map_err(|_| PolicyError::NegativeDuration {
            field,
            millis: value,
        })
}

fn optional_millis(
    field: &'static str,
    value: Option<i64>,
) -> Result<Option<Duration>, PolicyError> {
    value.map(|v| millis(field, v)).transpose()
}

impl TryFrom<&BackoffConfig> for Backoff {
    type Error = PolicyError;

    fn try_from(config: &BackoffConfig) -> Result<Self, Self::Error> {
        Ok(match *config {
            BackoffConfig::None => Backoff::None,
            BackoffConfig::Fixed { delay_ms } => Backoff::Fixed(millis("delay_ms", delay_ms)?),
            BackoffConfig::Linear { base_ms, max_ms } => Backoff::Linear {
                base: millis("base_ms", base_ms)?,
                max: optional_millis("max_ms", max_ms)?,
            },
            BackoffConfig::Exponential { base_ms, max_ms } => Backoff::Exponential {
                base: millis("base_ms", base_ms)?,
                max: optional_millis("max_ms", max_ms)?,
            },
        })
    }
}

impl TryFrom<&PolicyConfig> for RetryPolicy {
    type Error = PolicyError;

    fn try_from(config: &PolicyConfig) -> Result<Self, Self::Error> {
        let backoff = Backoff::try_from(&config.backoff)?;
        let mut policy = if config.retry_forever {
            RetryPolicy::forever(backoff)
        } else {
            RetryPolicy::new(config.max_attempts, backoff)?
        };
        if let Some(max) = optional_millis("max_delay_ms", config.max_delay_ms)? {
            policy = policy.with_max_delay(max);
        }
        policy = match config.jitter {
            JitterConfig::None => policy,
            JitterConfig::Proportional { factor } if !factor.is_finite() => {
                return Err(PolicyError::InvalidJitter { factor });
            }
            JitterConfig::Proportional { factor } => policy.with_jitter(factor),
            JitterConfig::Full => policy.with_full_jitter(),
        };
        Ok(policy)
    }
}

/// Error returned when selecting a named policy.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// No policy is registered under this name.
    UnknownPolicy(String),
    /// The named policy is registered but invalid.
    Invalid {
        /// Name of the policy.
        name: String,
        /// Why it could not be built.
        source: PolicyError,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownPolicy(name) => write!(f, "unknown retry policy '{}'", name),
            ConfigError::Invalid { name, source } => {
                write!(f, "invalid retry policy '{}': {}", name, source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::UnknownPolicy(_) => None,
            ConfigError::Invalid { source, .. } => Some(source),
        }
    }
}

/// Named retry policies.
///
/// # Examples
///
/// ```rust
/// use stillwater_retry::config::{BackoffConfig, PolicyConfig, PolicySet};
///
/// let set = PolicySet::new()
///     .with("quick", PolicyConfig::new(2, BackoffConfig::None))
///     .with("patient", PolicyConfig::new(
///         6,
///         BackoffConfig::Exponential { base_ms: 50, max_ms: Some(1_000) },
///     ));
///
/// let policy = set.select("patient")?;
/// assert_eq!(policy.max_attempts(), Some(6));
/// assert!(set.select("missing").is_err());
/// # Ok::<(), stillwater_retry::config::ConfigError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PolicySet {
    #[cfg_attr(feature = "serde", serde(default))]
    policies: BTreeMap<String, PolicyConfig>,
}

impl PolicySet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `config` under `name`, replacing any previous entry.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        config: PolicyConfig,
    ) -> Option<PolicyConfig> {
        self.policies.insert(name.into(), config)
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, config: PolicyConfig) -> Self {
        self.insert(name, config);
        self
    }

    /// Look up the raw configuration for `name`.
    pub fn get(&self, name: &str) -> Option<&PolicyConfig> {
        self.policies.get(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.policies.keys().map(String::as_str)
    }

    /// Build the policy registered under `name`.
    pub fn select(&self, name: &str) -> Result<RetryPolicy, ConfigError> {
        let config = self
            .get(name)
            .ok_or_else(|| ConfigError::UnknownPolicy(name.to_string()))?;
        RetryPolicy::try_from(config).map_err(|source| ConfigError::Invalid {
            name: name.to_string(),
            source,
        })
    }

    /// Build the policy named by environment variable `var`, or `default`
    /// when the variable is unset or not valid unicode.
    pub fn select_from_env(&self, var: &str, default: &str) -> Result<RetryPolicy, ConfigError> {
        let name = std::env::var(var).unwrap_or_else(|_| default.to_string());
        #[cfg(feature = "tracing")]
        tracing::debug!(policy = %name, var, "selecting retry policy");
        self.select(&name)
    }
}
