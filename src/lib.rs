//! # Order Dispatch
//!
//! A priority dispatcher that hands discrete work items ("orders") to a pool
//! of ephemeral single-order workers ("bots").
//!
//! Orders come in two priority classes. Pending orders wait in two FIFO lanes
//! and are drained with strict priority: a normal order is only dispatched
//! when no high-priority order is pending. Each worker processes one order for
//! a fixed duration, then immediately tries to pick up the next one; a worker
//! that finds nothing re-checks after a fixed poll interval.
//!
//! Workers can be removed at any time. Removal takes the most recently added
//! worker, cancels its pending completion in the same step, and puts its
//! in-flight order back at the head of its own lane, so the order is never
//! lost, never completed by a dead worker, and never overtaken by newer
//! orders of the same class.
//!
//! ## Key Features
//!
//! - **O(1) lanes**: append, pop and head re-insertion on both lanes
//! - **Conservation**: every order is pending, processing or completed, always
//! - **Deterministic timing**: the core runs on a logical clock; simultaneous
//!   callbacks fire in ascending worker id order
//! - **Single subscriber**: one event sink receives every state transition
//! - **Tokio driver**: `DispatchService` runs the core against real time
//!
//! ## Dispatcher - Deterministic Core
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use order_dispatch::config::DispatchConfig;
//! use order_dispatch::core::{Dispatcher, EventLog};
//! use order_dispatch::util::PriorityClass;
//!
//! let mut dispatcher = Dispatcher::new(DispatchConfig::default())?;
//! let log = EventLog::new(128);
//! dispatcher.set_event_subscriber(log.clone());
//!
//! dispatcher.create_order(PriorityClass::Normal);
//! let vip = dispatcher.create_order(PriorityClass::High);
//! let bot = dispatcher.add_worker();
//! assert_eq!(bot.current_order, Some(vip.id));
//!
//! dispatcher.advance_by(Duration::from_secs(10));
//! assert_eq!(dispatcher.count_completed_orders(), 1);
//! ```
//!
//! ## DispatchService - Real Time
//!
//! ```rust,ignore
//! use order_dispatch::runtime::{DispatchService, TokioSpawner};
//!
//! let service = DispatchService::start(dispatcher, &TokioSpawner::current());
//! let events = service.subscribe();
//! service.add_worker();
//! ```
//!
//! For complete scenarios, see `tests/dispatch_scenarios.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Dispatch core: ledger, worker pool, timers and events.
pub mod core;
/// Configuration models for the dispatcher.
pub mod config;
/// Builders to construct dispatchers from configuration.
pub mod builders;
/// Pending-queue backends.
pub mod infra;
/// Tokio runtime adapter and API surface.
#[cfg(feature = "tokio-runtime")]
pub mod runtime;
/// Shared utilities.
pub mod util;
