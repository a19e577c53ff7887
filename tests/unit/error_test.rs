//! Tests for error types

use order_dispatch::core::{DispatchError, OrderState};

#[test]
fn test_error_display() {
    assert_eq!(DispatchError::NoWorkerAvailable.to_string(), "no worker available");
    assert_eq!(DispatchError::OrderNotFound(1001).to_string(), "order 1001 not found");
    assert_eq!(
        DispatchError::InvalidConfig("poll_interval_ms must be greater than 0".into()).to_string(),
        "invalid configuration: poll_interval_ms must be greater than 0"
    );
}

#[test]
fn test_invalid_transition_names_states() {
    let err = DispatchError::InvalidTransition {
        order: 1002,
        from: OrderState::Complete,
        to: OrderState::Processing,
    };
    let msg = err.to_string();
    assert!(msg.contains("1002"));
    assert!(msg.contains("Complete"));
    assert!(msg.contains("Processing"));
}

#[test]
fn test_error_into_anyhow() {
    let err: anyhow::Error = DispatchError::Runtime("driver stopped".into()).into();
    assert_eq!(err.to_string(), "runtime error: driver stopped");
    assert!(err.downcast_ref::<DispatchError>().is_some());
}
