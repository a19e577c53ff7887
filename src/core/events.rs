//! Dispatch events and the single-subscriber notifier.
//!
//! The dispatcher reports every state transition through one [`EventSink`].
//! Only one subscriber can be registered at a time; registering another
//! replaces the first. Sinks run inline with the transition that produced the
//! event, so they must not block or call back into the dispatcher.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::DispatchConfig;
use crate::core::{Order, Worker};
use crate::util::serde::WorkerId;

/// Event discriminant, with the external kebab-case names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    /// `worker-created`
    WorkerCreated,
    /// `worker-removed`
    WorkerRemoved,
    /// `worker-idle`
    WorkerIdle,
    /// `order-dispatched`
    OrderDispatched,
    /// `order-completed`
    OrderCompleted,
    /// `order-returned-to-pending`
    OrderReturnedToPending,
}

impl EventKind {
    /// External name of the event kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WorkerCreated => "worker-created",
            Self::WorkerRemoved => "worker-removed",
            Self::WorkerIdle => "worker-idle",
            Self::OrderDispatched => "order-dispatched",
            Self::OrderCompleted => "order-completed",
            Self::OrderReturnedToPending => "order-returned-to-pending",
        }
    }
}

/// A state transition, carrying snapshots taken at emission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DispatchEvent {
    /// A worker joined the pool.
    WorkerCreated {
        /// The new worker.
        worker: Worker,
    },
    /// A worker left the pool. The snapshot holds its final state.
    WorkerRemoved {
        /// The worker as it was when removed.
        worker: Worker,
    },
    /// A worker found nothing to do.
    WorkerIdle {
        /// The idle worker.
        worker: Worker,
    },
    /// A worker picked up an order.
    OrderDispatched {
        /// The order, now processing.
        order: Order,
        /// The worker holding it.
        worker: Worker,
    },
    /// A worker finished an order.
    OrderCompleted {
        /// The completed order.
        order: Order,
        /// The worker that finished it, still holding the order.
        worker: Worker,
    },
    /// A removed worker's in-flight order went back to the head of its lane.
    OrderReturnedToPending {
        /// The order, pending again.
        order: Order,
        /// The worker that was removed.
        worker_id: WorkerId,
    },
}

impl DispatchEvent {
    /// Event discriminant.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::WorkerCreated { .. } => EventKind::WorkerCreated,
            Self::WorkerRemoved { .. } => EventKind::WorkerRemoved,
            Self::WorkerIdle { .. } => EventKind::WorkerIdle,
            Self::OrderDispatched { .. } => EventKind::OrderDispatched,
            Self::OrderCompleted { .. } => EventKind::OrderCompleted,
            Self::OrderReturnedToPending { .. } => EventKind::OrderReturnedToPending,
        }
    }

    /// Worker the event concerns.
    #[must_use]
    pub const fn worker_id(&self) -> WorkerId {
        match self {
            Self::WorkerCreated { worker }
            | Self::WorkerRemoved { worker }
            | Self::WorkerIdle { worker }
            | Self::OrderDispatched { worker, .. }
            | Self::OrderCompleted { worker, .. } => worker.id,
            Self::OrderReturnedToPending { worker_id, .. } => *worker_id,
        }
    }

    /// Order the event concerns, if any.
    #[must_use]
    pub const fn order(&self) -> Option<&Order> {
        match self {
            Self::OrderDispatched { order, .. }
            | Self::OrderCompleted { order, .. }
            | Self::OrderReturnedToPending { order, .. } => Some(order),
            _ => None,
        }
    }
}

impl fmt::Display for DispatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WorkerCreated { worker } => write!(f, "Bot #{} created - Status: ACTIVE", worker.id),
            Self::WorkerRemoved { worker } => {
                write!(f, "Bot #{} destroyed while {}", worker.id, worker.state)
            }
            Self::WorkerIdle { worker } => {
                write!(f, "Bot #{} is now IDLE - No pending orders", worker.id)
            }
            Self::OrderDispatched { order, worker } => write!(
                f,
                "Bot #{} picked up {} Order #{} - Status: PROCESSING",
                worker.id, order.priority, order.id
            ),
            Self::OrderCompleted { order, worker } => write!(
                f,
                "Bot #{} completed {} Order #{} - Status: COMPLETE",
                worker.id, order.priority, order.id
            ),
            Self::OrderReturnedToPending { order, worker_id } => write!(
                f,
                "Order #{} returned to PENDING (Bot #{} was removed)",
                order.id, worker_id
            ),
        }
    }
}

/// Receiver of dispatch events.
pub trait EventSink: Send {
    /// Handle one event. Must not block.
    fn deliver(&mut self, event: &DispatchEvent);
}

impl<F> EventSink for F
where
    F: FnMut(&DispatchEvent) + Send,
{
    fn deliver(&mut self, event: &DispatchEvent) {
        self(event);
    }
}

/// Holder of the single registered subscriber.
#[derive(Default)]
pub struct EventNotifier {
    subscriber: Option<Box<dyn EventSink>>,
    emitted: u64,
}

impl EventNotifier {
    /// Notifier with no subscriber.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `sink`, replacing any previous subscriber. Returns whether one
    /// was replaced.
    pub fn set_subscriber<S: EventSink + 'static>(&mut self, sink: S) -> bool {
        self.set_boxed_subscriber(Box::new(sink))
    }

    /// Register an already boxed sink, replacing any previous subscriber.
    pub fn set_boxed_subscriber(&mut self, sink: Box<dyn EventSink>) -> bool {
        self.subscriber.replace(sink).is_some()
    }

    /// Drop the current subscriber.
    pub fn clear_subscriber(&mut self) {
        self.subscriber = None;
    }

    /// Whether a subscriber is registered.
    #[must_use]
    pub const fn has_subscriber(&self) -> bool {
        self.subscriber.is_some()
    }

    /// Deliver `event` to the subscriber, if any.
    pub fn emit(&mut self, event: &DispatchEvent) {
        self.emitted += 1;
        tracing::trace!(kind = event.kind().as_str(), "{event}");
        if let Some(sink) = self.subscriber.as_mut() {
            sink.deliver(event);
        }
    }

    /// Events emitted so far, subscribed or not.
    #[must_use]
    pub const fn emitted(&self) -> u64 {
        self.emitted
    }
}

impl fmt::Debug for EventNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventNotifier")
            .field("has_subscriber", &self.has_subscriber())
            .field("emitted", &self.emitted)
            .finish()
    }
}

/// Bounded in-memory event log for tests and diagnostics.
///
/// Clones share one buffer, so a clone can be handed to the dispatcher while
/// this one is kept for inspection. When full, the oldest event is dropped.
#[derive(Debug, Clone)]
pub struct EventLog {
    events: Arc<Mutex<VecDeque<DispatchEvent>>>,
    max_events: usize,
}

impl EventLog {
    /// Create a log keeping at most `max_events` events.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(max_events.min(1024)))),
            max_events,
        }
    }

    /// Log sized by `config.event_log_capacity`.
    #[must_use]
    pub fn for_config(config: &DispatchConfig) -> Self {
        Self::new(config.event_log_capacity)
    }

    /// Snapshot of stored events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<DispatchEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Kinds of stored events, oldest first.
    #[must_use]
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().iter().map(DispatchEvent::kind).collect()
    }

    /// Remove and return every stored event.
    pub fn drain(&self) -> Vec<DispatchEvent> {
        self.events.lock().drain(..).collect()
    }

    /// Number of stored events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for EventLog {
    fn deliver(&mut self, event: &DispatchEvent) {
        if self.max_events == 0 {
            return;
        }
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event.clone());
    }
}

/// Forwards events into a crossbeam channel without ever blocking.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<DispatchEvent>,
}

impl ChannelSink {
    /// Wrap an existing sender.
    #[must_use]
    pub const fn new(tx: Sender<DispatchEvent>) -> Self {
        Self { tx }
    }

    /// Sink over a fresh unbounded channel.
    #[must_use]
    pub fn unbounded() -> (Self, Receiver<DispatchEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self::new(tx), rx)
    }

    /// Sink over a fresh bounded channel. Events are dropped while it is full.
    #[must_use]
    pub fn bounded(capacity: usize) -> (Self, Receiver<DispatchEvent>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (Self::new(tx), rx)
    }
}

impl EventSink for ChannelSink {
    fn deliver(&mut self, event: &DispatchEvent) {
        match self.tx.try_send(event.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                tracing::warn!(kind = dropped.kind().as_str(), "event channel full, dropping event");
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::debug!("event channel receiver gone");
            }
        }
    }
}
