//! Loading named policies from JSON
#![cfg(feature = "serde")]

use std::time::Duration;

use stillwater_retry::config::{BackoffConfig, ConfigError, PolicyConfig, PolicySet};
use stillwater_retry::PolicyError;

const POLICIES: &str = r#"{
    "policies": {
        "dev": { "max_attempts": 1 },
        "prod": {
            "max_attempts": 4,
            "backoff": { "kind": "exponential", "base_ms": 5, "max_ms": 15 }
        },
        "daemon": {
            "max_attempts": 0,
            "retry_forever": true,
            "backoff": { "kind": "fixed", "delay_ms": 1000 },
            "jitter": { "kind": "proportional", "factor": 0.1 }
        },
        "broken": {
            "max_attempts": 3,
            "backoff": { "kind": "linear", "base_ms": -10 }
        }
    }
}"#;

fn load() -> PolicySet {
    serde_json::from_str(POLICIES).expect("policy json parses")
}

#[test]
fn defaults_fill_missing_fields() {
    let set = load();
    let dev = set.get("dev").unwrap();
    assert_eq!(dev.backoff, BackoffConfig::None);
    assert!(!dev.retry_forever);
    assert_eq!(set.select("dev").unwrap().schedule().count(), 0);
}

#[test]
fn exponential_policy_from_json() {
    let policy = load().select("prod").unwrap();
    assert_eq!(
        policy.schedule().collect::<Vec<_>>(),
        vec![
            Duration::from_millis(5),
            Duration::from_millis(10),
            Duration::from_millis(15)
        ]
    );
}

#[test]
fn forever_must_be_explicit() {
    let policy = load().select("daemon").unwrap();
    assert!(policy.is_unlimited());
}

#[test]
fn negative_duration_reported_with_policy_name() {
    let err = load().select("broken").unwrap_err();
    assert_eq!(
        err,
        ConfigError::Invalid {
            name: "broken".to_string(),
            source: PolicyError::NegativeDuration {
                field: "base_ms",
                millis: -10
            },
        }
    );
}

#[test]
fn config_round_trips_through_json() {
    let config = PolicyConfig::new(
        3,
        BackoffConfig::Linear {
            base_ms: 100,
            max_ms: None,
        },
    );
    let json = serde_json::to_value(&config).unwrap();
    assert_eq!(json["backoff"]["kind"], "linear");
    let back: PolicyConfig = serde_json::from_value(json).unwrap();
    assert_eq!(back, config);
}
