//! End-to-end dispatch scenarios on the logical clock.
//!
//! These tests validate:
//! 1. Strict priority then FIFO dispatch
//! 2. Preemption returns in-flight orders to the head of their lane
//! 3. Removal cancels completion callbacks
//! 4. Completion and the next dispatch happen in one step
//! 5. Conservation of orders under random operation sequences

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use order_dispatch::config::DispatchConfig;
use order_dispatch::core::{
    DispatchEvent, Dispatcher, EventKind, EventLog, OrderState, WorkerState, ORDER_ID_BASE,
};
use order_dispatch::util::{init_tracing_with, PriorityClass};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ============================================================================
// HELPERS
// ============================================================================

fn setup() -> (Dispatcher, EventLog) {
    init_tracing_with("order_dispatch=warn");
    let mut dispatcher = Dispatcher::new(DispatchConfig::default())
        .expect("default config is valid")
        .with_epoch(0);
    let log = EventLog::new(10_000);
    dispatcher.set_event_subscriber(log.clone());
    (dispatcher, log)
}

fn assert_conserved(d: &Dispatcher) {
    let status = d.status();
    assert_eq!(
        status.pending_orders + status.processing_orders + status.completed_orders,
        status.total_orders
    );
    d.verify_invariants().expect("dispatcher invariants hold");
}

// ============================================================================
// PRIORITY
// ============================================================================

#[test]
fn test_vip_order_dispatched_before_earlier_normal() {
    let (mut d, _log) = setup();
    let normal = d.create_order(PriorityClass::Normal);
    let vip = d.create_order(PriorityClass::High);

    let worker = d.add_worker();

    assert_eq!(worker.current_order, Some(vip.id));
    assert_eq!(d.order(normal.id).unwrap().state, OrderState::Pending);
    assert_eq!(d.pending_ids(), vec![normal.id]);
}

#[test]
fn test_two_workers_take_priority_then_fifo() {
    let (mut d, _log) = setup();
    let n1 = d.create_order(PriorityClass::Normal);
    let h1 = d.create_order(PriorityClass::High);
    let n2 = d.create_order(PriorityClass::Normal);

    d.add_worker();
    d.add_worker();

    let listing = d.orders();
    let dispatched: HashSet<_> = listing.processing.iter().map(|o| o.id).collect();
    assert_eq!(dispatched, HashSet::from([h1.id, n1.id]));
    assert_eq!(listing.pending.len(), 1);
    assert_eq!(listing.pending[0].id, n2.id);
    assert_conserved(&d);
}

#[test]
fn test_orders_served_in_creation_order_within_lane() {
    let (mut d, _log) = setup();
    let ids: Vec<_> = (0..4).map(|_| d.create_order(PriorityClass::Normal).id).collect();
    d.add_worker();

    let mut served = Vec::new();
    for _ in 0..4 {
        served.push(d.worker(1).unwrap().current_order.unwrap());
        d.advance_by(Duration::from_secs(10));
    }
    assert_eq!(served, ids);
    assert_eq!(d.count_completed_orders(), 4);
}

#[test]
fn test_new_vip_jumps_ahead_of_waiting_normals() {
    let (mut d, _log) = setup();
    let n1 = d.create_order(PriorityClass::Normal);
    let n2 = d.create_order(PriorityClass::Normal);
    d.add_worker();
    d.advance_by(Duration::from_secs(5));
    let vip = d.create_order(PriorityClass::High);

    d.advance_by(Duration::from_secs(5));

    assert_eq!(d.order(n1.id).unwrap().state, OrderState::Complete);
    assert_eq!(d.worker(1).unwrap().current_order, Some(vip.id));
    assert_eq!(d.pending_ids(), vec![n2.id]);
}

#[test]
fn test_order_ids_start_after_base() {
    let (mut d, _log) = setup();
    let first = d.create_order(PriorityClass::Normal);
    let second = d.create_order(PriorityClass::High);
    assert_eq!(first.id, ORDER_ID_BASE + 1);
    assert_eq!(second.id, ORDER_ID_BASE + 2);
    assert_eq!(first.created_at, 0);
}

// ============================================================================
// PREEMPTION
// ============================================================================

#[test]
fn test_removed_worker_returns_order_to_lane_head() {
    let (mut d, log) = setup();
    let vip = d.create_order(PriorityClass::High);
    d.add_worker();
    d.advance_by(Duration::from_secs(3));
    let later = d.create_order(PriorityClass::High);

    let removed = d.remove_worker().unwrap();
    assert_eq!(removed.state, WorkerState::Processing);

    let order = d.order(vip.id).unwrap();
    assert_eq!(order.state, OrderState::Pending);
    assert_eq!(order.assigned_worker, None);
    assert_eq!(order.processing_started_at, None);
    assert_eq!(d.pending_ids(), vec![vip.id, later.id]);

    let tail: Vec<_> = log.kinds().into_iter().rev().take(2).collect();
    assert_eq!(tail, vec![EventKind::WorkerRemoved, EventKind::OrderReturnedToPending]);
    assert_conserved(&d);
}

#[test]
fn test_preempted_order_never_completes() {
    let (mut d, log) = setup();
    let order = d.create_order(PriorityClass::Normal);
    d.add_worker();
    d.advance_by(Duration::from_secs(9));
    d.remove_worker();

    d.advance_by(Duration::from_secs(60));

    assert_eq!(d.order(order.id).unwrap().state, OrderState::Pending);
    assert_eq!(d.count_completed_orders(), 0);
    assert!(log.events().iter().all(|e| e.kind() != EventKind::OrderCompleted));
}

#[test]
fn test_preempted_order_stays_behind_high_lane() {
    let (mut d, _log) = setup();
    let normal = d.create_order(PriorityClass::Normal);
    d.add_worker();
    let vip = d.create_order(PriorityClass::High);
    d.remove_worker();

    assert_eq!(d.pending_ids(), vec![vip.id, normal.id]);
    let worker = d.add_worker();
    assert_eq!(worker.current_order, Some(vip.id));
}

#[test]
fn test_preempted_order_is_picked_up_again_first() {
    let (mut d, _log) = setup();
    let first = d.create_order(PriorityClass::Normal);
    d.add_worker();
    let second = d.create_order(PriorityClass::Normal);
    d.advance_by(Duration::from_secs(2));
    d.remove_worker();

    let worker = d.add_worker();
    assert_eq!(worker.current_order, Some(first.id));

    d.advance_by(Duration::from_secs(10));
    let done = d.order(first.id).unwrap();
    assert_eq!(done.state, OrderState::Complete);
    assert_eq!(done.processing_started_at, Some(2_000));
    assert_eq!(done.completed_at, Some(12_000));
    assert_eq!(d.worker(worker.id).unwrap().current_order, Some(second.id));
}

#[test]
fn test_removing_idle_worker_touches_no_order() {
    let (mut d, log) = setup();
    d.create_order(PriorityClass::Normal);
    d.add_worker();
    d.add_worker();
    let before = d.orders();
    log.drain();

    let removed = d.remove_worker().unwrap();

    assert_eq!(removed.state, WorkerState::Idle);
    assert_eq!(d.orders(), before);
    assert_eq!(log.kinds(), vec![EventKind::WorkerRemoved]);
    assert!(d.outstanding_callback(removed.id).is_none());
}

// ============================================================================
// POOL
// ============================================================================

#[test]
fn test_removal_is_last_in_first_out() {
    let (mut d, _log) = setup();
    for _ in 0..5 {
        d.add_worker();
    }
    let removed: Vec<_> = (0..3).map(|_| d.remove_worker().unwrap().id).collect();

    assert_eq!(removed, vec![5, 4, 3]);
    assert_eq!(d.count_workers(), 2);
    let remaining: Vec<_> = d.workers().iter().map(|w| w.id).collect();
    assert_eq!(remaining, vec![1, 2]);
}

#[test]
fn test_remove_past_empty_reports_none_without_side_effects() {
    let (mut d, log) = setup();
    d.create_order(PriorityClass::High);
    d.add_worker();
    d.add_worker();
    d.remove_worker();
    d.remove_worker();
    let events_before = log.len();
    let orders_before = d.orders();

    assert!(d.remove_worker().is_none());
    assert_eq!(log.len(), events_before);
    assert_eq!(d.orders(), orders_before);
    assert_eq!(d.count_workers(), 0);
}

#[test]
fn test_worker_ids_not_reused() {
    let (mut d, _log) = setup();
    d.add_worker();
    d.add_worker();
    d.remove_worker();
    let next = d.add_worker();
    assert_eq!(next.id, 3);
}

#[test]
fn test_worker_snapshots_are_copies() {
    let (mut d, _log) = setup();
    d.add_worker();
    let mut workers = d.workers();
    workers[0].state = WorkerState::Processing;
    workers.clear();
    assert_eq!(d.worker(1).unwrap().state, WorkerState::Idle);
    assert_eq!(d.count_workers(), 1);
}

// ============================================================================
// EVENTS
// ============================================================================

#[test]
fn test_completion_event_followed_by_dispatch_in_same_step() {
    let (mut d, log) = setup();
    let a = d.create_order(PriorityClass::Normal);
    let b = d.create_order(PriorityClass::Normal);
    d.add_worker();
    log.drain();

    d.advance_to(10_000);

    let events = log.events();
    assert_eq!(events.len(), 2);
    match (&events[0], &events[1]) {
        (
            DispatchEvent::OrderCompleted { order: done, worker },
            DispatchEvent::OrderDispatched { order: next, .. },
        ) => {
            assert_eq!(done.id, a.id);
            assert_eq!(done.state, OrderState::Complete);
            assert_eq!(worker.id, 1);
            assert_eq!(next.id, b.id);
            assert_eq!(next.processing_started_at, Some(10_000));
        }
        other => panic!("unexpected events: {other:?}"),
    }
}

#[test]
fn test_event_lines_read_like_a_log() {
    let (mut d, log) = setup();
    d.create_order(PriorityClass::High);
    d.add_worker();
    d.advance_by(Duration::from_secs(10));
    d.remove_worker();

    let lines: Vec<_> = log.events().iter().map(ToString::to_string).collect();
    assert_eq!(
        lines,
        vec![
            "Bot #1 created - Status: ACTIVE",
            "Bot #1 picked up VIP Order #1001 - Status: PROCESSING",
            "Bot #1 completed VIP Order #1001 - Status: COMPLETE",
            "Bot #1 is now IDLE - No pending orders",
            "Bot #1 destroyed while IDLE",
        ]
    );
}

// ============================================================================
// CONSERVATION
// ============================================================================

#[test]
fn test_random_operations_conserve_orders() {
    for seed in 0..8_u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let (mut d, _log) = setup();

        // Idle polls are too chatty for a bounded log; keep only what the
        // checks below need.
        let lifecycle = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lifecycle);
        d.set_event_subscriber(move |event: &DispatchEvent| {
            if matches!(
                event.kind(),
                EventKind::WorkerRemoved | EventKind::OrderCompleted
            ) {
                sink.lock().push(event.clone());
            }
        });

        for _ in 0..400 {
            match rng.random_range(0..10) {
                0..=2 => {
                    d.create_order(PriorityClass::Normal);
                }
                3 => {
                    d.create_order(PriorityClass::High);
                }
                4 | 5 => {
                    d.add_worker();
                }
                6 => {
                    d.remove_worker();
                }
                _ => {
                    d.advance_by(Duration::from_millis(rng.random_range(0..15_000)));
                }
            }
            assert_conserved(&d);
        }

        let mut removed = HashSet::new();
        let mut completed = HashSet::new();
        for event in lifecycle.lock().iter() {
            match event {
                DispatchEvent::WorkerRemoved { worker } => {
                    removed.insert(worker.id);
                }
                DispatchEvent::OrderCompleted { order, worker } => {
                    assert!(!removed.contains(&worker.id), "seed {seed}: removed worker completed");
                    assert!(completed.insert(order.id), "seed {seed}: order completed twice");
                }
                _ => {}
            }
        }
        assert_eq!(completed.len(), d.count_completed_orders());
    }
}
