//! Tests for builder modules

use order_dispatch::builders::{build_dispatcher, DispatcherBuilder};
use order_dispatch::config::DispatchConfig;
use order_dispatch::core::{DispatchError, EventKind, EventLog};
use order_dispatch::infra::InMemoryLanes;

#[test]
fn test_builder_adds_initial_workers_with_subscriber() {
    let config = DispatchConfig::default().with_event_log_capacity(3);
    let log = EventLog::for_config(&config);
    let dispatcher = DispatcherBuilder::new(config)
        .with_epoch(500)
        .with_subscriber(log.clone())
        .with_initial_workers(2)
        .build()
        .unwrap();

    assert_eq!(dispatcher.count_workers(), 2);
    assert_eq!(dispatcher.now(), 500);
    // Capacity 3: the first creation event was dropped.
    assert_eq!(
        log.kinds(),
        vec![
            EventKind::WorkerIdle,
            EventKind::WorkerCreated,
            EventKind::WorkerIdle,
        ]
    );
}

#[test]
fn test_builder_rejects_invalid_config() {
    let cfg = DispatchConfig {
        processing_duration_ms: 0,
        ..DispatchConfig::default()
    };
    let err = DispatcherBuilder::new(cfg).build().unwrap_err();
    assert!(matches!(err, DispatchError::InvalidConfig(_)));
}

#[test]
fn test_build_dispatcher_propagates_factory_error() {
    let result = build_dispatcher(&DispatchConfig::default(), |_| {
        Err::<InMemoryLanes<u64>, _>(DispatchError::Runtime("queue unavailable".into()))
    });
    assert_eq!(
        result.unwrap_err(),
        DispatchError::Runtime("queue unavailable".into())
    );
}
