//! Tests for configuration loading and validation

use std::collections::HashMap;
use std::time::Duration;

use order_dispatch::config::DispatchConfig;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key: &str| vars.get(key).cloned()
}

#[test]
fn test_defaults() {
    let cfg = DispatchConfig::default();
    assert_eq!(cfg.poll_interval_ms, 1_000);
    assert_eq!(cfg.processing_duration_ms, 10_000);
    assert_eq!(cfg.poll_interval(), Duration::from_secs(1));
    assert_eq!(cfg.processing_duration(), Duration::from_secs(10));
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_zero_values_rejected() {
    let cfg = DispatchConfig::new().with_poll_interval(Duration::ZERO);
    assert!(cfg.validate().unwrap_err().contains("poll_interval_ms"));

    let cfg = DispatchConfig::new().with_processing_duration(Duration::ZERO);
    assert!(cfg.validate().unwrap_err().contains("processing_duration_ms"));

    let cfg = DispatchConfig::new().with_event_log_capacity(0);
    assert!(cfg.validate().is_err());
}

#[test]
fn test_json_missing_fields_take_defaults() {
    let cfg = DispatchConfig::from_json_str(r#"{"processing_duration_ms": 250}"#).unwrap();
    assert_eq!(cfg.processing_duration_ms, 250);
    assert_eq!(cfg.poll_interval_ms, 1_000);
}

#[test]
fn test_json_invalid_values_rejected() {
    assert!(DispatchConfig::from_json_str(r#"{"poll_interval_ms": 0}"#).is_err());
    assert!(DispatchConfig::from_json_str("not json")
        .unwrap_err()
        .starts_with("parse error"));
}

#[test]
fn test_lookup_overrides() {
    let cfg = DispatchConfig::from_lookup(lookup(&[
        ("DISPATCH_POLL_INTERVAL_MS", "200"),
        ("DISPATCH_PROCESSING_DURATION_MS", " 5000 "),
    ]))
    .unwrap();
    assert_eq!(cfg.poll_interval_ms, 200);
    assert_eq!(cfg.processing_duration_ms, 5_000);
    assert_eq!(cfg.event_log_capacity, 1_024);
}

#[test]
fn test_lookup_rejects_garbage() {
    let err = DispatchConfig::from_lookup(lookup(&[("DISPATCH_POLL_INTERVAL_MS", "soon")]))
        .unwrap_err();
    assert!(err.to_string().contains("DISPATCH_POLL_INTERVAL_MS"));

    assert!(DispatchConfig::from_lookup(lookup(&[("DISPATCH_EVENT_LOG_CAPACITY", "0")])).is_err());
}

#[test]
fn test_lookup_empty_is_default() {
    let cfg = DispatchConfig::from_lookup(|_| None).unwrap();
    assert_eq!(cfg, DispatchConfig::default());
}
