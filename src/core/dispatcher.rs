//! Worker pool and scheduler.
//!
//! [`Dispatcher`] owns the workers, the order ledger and the deferred
//! callbacks, and runs every worker's dispatch loop on a logical millisecond
//! clock. It is a plain synchronous state machine: time only moves when the
//! caller invokes [`Dispatcher::advance_to`], which makes every schedule
//! reproducible. `runtime::DispatchService` drives it from real time.
//!
//! Worker loop:
//!
//! ```text
//!   add_worker ──► dispatch attempt ──(queue empty)──► IDLE ──poll interval──┐
//!                      ▲      │                                             │
//!                      │      └──(order)──► PROCESSING ──processing─────┐   │
//!                      │                                 duration       │   │
//!                      └────────────── completion ◄─────────────────────┘   │
//!                      └────────────────────────────────────────────────────┘
//! ```
//!
//! Removing a worker cancels its outstanding callback in the same call and
//! hands any in-flight order back to the head of its lane.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::DispatchConfig;
use crate::core::{
    Deferred, DispatchError, DispatchEvent, EventNotifier, EventSink, Order, OrderLedger,
    OrderListing, OrderState, PendingQueue, TimerQueue, Worker, WorkerState,
};
use crate::infra::queue::InMemoryLanes;
use crate::util::clock::now_ms;
use crate::util::serde::{OrderId, PriorityClass, Timestamp, WorkerId};

/// Aggregate counts across the pool and the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    /// Pending orders.
    pub pending_orders: usize,
    /// Orders being processed.
    pub processing_orders: usize,
    /// Completed orders.
    pub completed_orders: usize,
    /// Orders ever created.
    pub total_orders: usize,
    /// Workers in the pool.
    pub workers: usize,
    /// Workers holding an order.
    pub active_workers: usize,
    /// Workers without an order.
    pub idle_workers: usize,
}

/// Priority dispatcher for a pool of single-order workers.
#[derive(Debug)]
pub struct Dispatcher<Q = InMemoryLanes<OrderId>> {
    config: DispatchConfig,
    ledger: OrderLedger<Q>,
    /// Insertion order; ids are strictly ascending.
    workers: Vec<Worker>,
    last_worker_id: WorkerId,
    timers: TimerQueue,
    notifier: EventNotifier,
    epoch_ms: Timestamp,
    elapsed_ms: u64,
}

impl Dispatcher<InMemoryLanes<OrderId>> {
    /// Create a dispatcher backed by the in-memory two-lane queue.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::InvalidConfig` if the configuration is invalid.
    pub fn new(config: DispatchConfig) -> Result<Self, DispatchError> {
        Self::with_queue(config, InMemoryLanes::new())
    }
}

impl<Q: PendingQueue<OrderId>> Dispatcher<Q> {
    /// Create a dispatcher over a caller-supplied pending queue.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::InvalidConfig` if the configuration is invalid.
    pub fn with_queue(config: DispatchConfig, queue: Q) -> Result<Self, DispatchError> {
        config.validate().map_err(DispatchError::InvalidConfig)?;
        info!(
            poll_interval_ms = config.poll_interval_ms,
            processing_duration_ms = config.processing_duration_ms,
            "dispatcher initialized"
        );
        Ok(Self {
            config,
            ledger: OrderLedger::with_queue(queue),
            workers: Vec::new(),
            last_worker_id: 0,
            timers: TimerQueue::new(),
            notifier: EventNotifier::new(),
            epoch_ms: now_ms(),
            elapsed_ms: 0,
        })
    }

    /// Anchor timestamps at `epoch_ms` instead of the wall clock.
    #[must_use]
    pub fn with_epoch(mut self, epoch_ms: Timestamp) -> Self {
        self.epoch_ms = epoch_ms;
        self
    }

    /// Active configuration.
    pub const fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Milliseconds elapsed on the logical clock.
    pub const fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Current timestamp (`epoch + elapsed`).
    pub const fn now(&self) -> Timestamp {
        self.epoch_ms.saturating_add(self.elapsed_ms)
    }

    /// Latest logical time the clock can reach. Leaves room for the longest
    /// deferred delay so neither due times nor timestamps can overflow;
    /// callbacks due past it never fire.
    pub fn clock_limit_ms(&self) -> u64 {
        let horizon = self
            .config
            .poll_interval_ms
            .max(self.config.processing_duration_ms);
        u64::MAX.saturating_sub(self.epoch_ms).saturating_sub(horizon)
    }

    /// Earliest logical time at which a deferred callback is due.
    pub fn next_deadline_ms(&self) -> Option<u64> {
        self.timers.next_due()
    }

    /// The worker's outstanding deferred callback.
    pub fn outstanding_callback(&self, worker: WorkerId) -> Option<Deferred> {
        self.timers.pending_for(worker)
    }

    /// Replace the event subscriber. Returns whether one was replaced.
    pub fn set_event_subscriber<S: EventSink + 'static>(&mut self, sink: S) -> bool {
        self.notifier.set_subscriber(sink)
    }

    /// Replace the event subscriber with an already boxed sink.
    pub fn set_boxed_event_subscriber(&mut self, sink: Box<dyn EventSink>) -> bool {
        self.notifier.set_boxed_subscriber(sink)
    }

    /// Stop delivering events.
    pub fn clear_event_subscriber(&mut self) {
        self.notifier.clear_subscriber();
    }

    /// Create a pending order at the tail of its lane.
    ///
    /// Idle workers pick it up on their next poll.
    pub fn create_order(&mut self, priority: PriorityClass) -> Order {
        let order = self.ledger.create(priority, self.now());
        info!(order_id = order.id, priority = %priority, "order created");
        order
    }

    /// Add a worker and run its first dispatch attempt immediately.
    ///
    /// The returned snapshot reflects that attempt, so the worker may already
    /// be processing.
    pub fn add_worker(&mut self) -> Worker {
        self.last_worker_id += 1;
        let id = self.last_worker_id;
        let worker = Worker::new(id, self.now());
        self.workers.push(worker.clone());
        info!(worker_id = id, workers = self.workers.len(), "worker added");
        self.notifier.emit(&DispatchEvent::WorkerCreated {
            worker: worker.clone(),
        });

        self.dispatch(id);
        self.worker(id).unwrap_or(worker)
    }

    /// Remove the most recently added worker.
    ///
    /// Its outstanding callback is canceled before anything else happens, so
    /// it can never complete afterwards. An in-flight order goes back to the
    /// head of its own lane. Returns `None` when the pool is empty.
    pub fn remove_worker(&mut self) -> Option<Worker> {
        let worker = self.workers.pop()?;
        self.timers.cancel(worker.id);

        if let Some(order_id) = worker.current_order {
            match self.ledger.return_to_pending(order_id) {
                Ok(order) => {
                    info!(worker_id = worker.id, order_id, "in-flight order returned to pending");
                    self.notifier.emit(&DispatchEvent::OrderReturnedToPending {
                        order,
                        worker_id: worker.id,
                    });
                }
                Err(err) => warn!(worker_id = worker.id, order_id, %err, "stale in-flight order"),
            }
        }

        info!(worker_id = worker.id, state = %worker.state, "worker removed");
        self.notifier.emit(&DispatchEvent::WorkerRemoved {
            worker: worker.clone(),
        });
        Some(worker)
    }

    /// Fire every callback due at or before `target_ms`, in `(due, worker id)`
    /// order, then move the clock to `target_ms`. Targets in the past only
    /// fire what is already overdue; targets past [`Self::clock_limit_ms`]
    /// are clamped to it. Returns the number of callbacks fired.
    pub fn advance_to(&mut self, target_ms: u64) -> usize {
        let target_ms = target_ms.min(self.clock_limit_ms());
        let mut fired = 0;
        while let Some(timer) = self.timers.pop_due(target_ms) {
            self.elapsed_ms = self.elapsed_ms.max(timer.due_ms);
            fired += 1;
            match timer.deferred {
                Deferred::PollRetry => {
                    debug!(worker_id = timer.worker, at_ms = timer.due_ms, "poll retry");
                    self.dispatch(timer.worker);
                }
                Deferred::Complete { order } => self.complete(timer.worker, order),
            }
        }
        self.elapsed_ms = self.elapsed_ms.max(target_ms);
        fired
    }

    /// Advance the clock by `delta`.
    pub fn advance_by(&mut self, delta: Duration) -> usize {
        let delta_ms = u64::try_from(delta.as_millis()).unwrap_or(u64::MAX);
        self.advance_to(self.elapsed_ms.saturating_add(delta_ms))
    }

    /// Dispatch attempt: pull the next order for `worker_id`, or go idle and
    /// retry after the poll interval.
    fn dispatch(&mut self, worker_id: WorkerId) {
        let Ok(idx) = self.worker_index(worker_id) else {
            debug!(worker_id, "dispatch attempt for removed worker");
            return;
        };
        let now = self.now();
        let worker = &mut self.workers[idx];

        let Some(order) = self.ledger.dispatch_next(worker_id, now) else {
            worker.release();
            self.notifier.emit(&DispatchEvent::WorkerIdle {
                worker: worker.clone(),
            });
            let due = self.elapsed_ms.saturating_add(self.config.poll_interval_ms);
            self.timers.schedule(worker_id, due, Deferred::PollRetry);
            return;
        };

        let order_id = order.id;
        worker.assign(order_id);
        info!(worker_id, order_id, priority = %order.priority, "order dispatched");
        self.notifier.emit(&DispatchEvent::OrderDispatched {
            order,
            worker: worker.clone(),
        });

        let due = self.elapsed_ms.saturating_add(self.config.processing_duration_ms);
        self.timers.schedule(worker_id, due, Deferred::Complete { order: order_id });
    }

    /// Completion callback: finish the order, reset the worker and loop.
    fn complete(&mut self, worker_id: WorkerId, order_id: OrderId) {
        let Ok(idx) = self.worker_index(worker_id) else {
            debug!(worker_id, order_id, "completion for removed worker ignored");
            return;
        };
        let now = self.now();
        let worker = &mut self.workers[idx];

        match self.ledger.complete(order_id, now) {
            Ok(order) => {
                info!(worker_id, order_id, "order completed");
                self.notifier.emit(&DispatchEvent::OrderCompleted {
                    order,
                    worker: worker.clone(),
                });
            }
            Err(err) => warn!(worker_id, order_id, %err, "completion for stale order"),
        }
        worker.release();

        self.dispatch(worker_id);
    }

    fn worker_index(&self, worker_id: WorkerId) -> Result<usize, usize> {
        self.workers.binary_search_by_key(&worker_id, |worker| worker.id)
    }

    /// Snapshot of the pool in insertion order.
    pub fn workers(&self) -> Vec<Worker> {
        self.workers.clone()
    }

    /// Snapshot of one worker.
    pub fn worker(&self, id: WorkerId) -> Option<Worker> {
        let idx = self.worker_index(id).ok()?;
        Some(self.workers[idx].clone())
    }

    /// Snapshot of every order, grouped by state.
    pub fn orders(&self) -> OrderListing {
        self.ledger.listing()
    }

    /// Snapshot of one order.
    pub fn order(&self, id: OrderId) -> Option<Order> {
        self.ledger.get(id).cloned()
    }

    /// Pending ids in dispatch order.
    pub fn pending_ids(&self) -> Vec<OrderId> {
        self.ledger.pending_ids()
    }

    /// Workers in the pool.
    pub fn count_workers(&self) -> usize {
        self.workers.len()
    }

    /// Workers holding an order.
    pub fn count_active_workers(&self) -> usize {
        self.workers.iter().filter(|worker| worker.is_processing()).count()
    }

    /// Workers without an order.
    pub fn count_idle_workers(&self) -> usize {
        self.workers.len() - self.count_active_workers()
    }

    /// Orders waiting in either lane.
    pub fn count_pending_orders(&self) -> usize {
        self.ledger.pending_count()
    }

    /// Orders held by a worker.
    pub fn count_processing_orders(&self) -> usize {
        self.ledger.processing_count()
    }

    /// Orders that reached completion.
    pub fn count_completed_orders(&self) -> usize {
        self.ledger.completed_count()
    }

    /// Aggregate counts.
    pub fn status(&self) -> StatusSummary {
        let active = self.count_active_workers();
        StatusSummary {
            pending_orders: self.ledger.pending_count(),
            processing_orders: self.ledger.processing_count(),
            completed_orders: self.ledger.completed_count(),
            total_orders: self.ledger.created_count(),
            workers: self.workers.len(),
            active_workers: active,
            idle_workers: self.workers.len() - active,
        }
    }

    /// Check the cross-structure invariants: the order partition is complete,
    /// every processing worker holds a processing order assigned back to it,
    /// and only processing workers have completion callbacks outstanding.
    ///
    /// # Errors
    ///
    /// Describes the first violated invariant.
    pub fn verify_invariants(&self) -> Result<(), String> {
        let listing = self.ledger.listing();
        if listing.total() != self.ledger.created_count() {
            return Err(format!(
                "partition lost orders: {} listed, {} created",
                listing.total(),
                self.ledger.created_count()
            ));
        }
        if listing.processing.len() != self.count_active_workers() {
            return Err(format!(
                "{} processing orders but {} active workers",
                listing.processing.len(),
                self.count_active_workers()
            ));
        }
        for worker in &self.workers {
            match (worker.state, worker.current_order) {
                (WorkerState::Idle, None) => {
                    if matches!(self.timers.pending_for(worker.id), Some(Deferred::Complete { .. })) {
                        return Err(format!("idle worker {} has a completion pending", worker.id));
                    }
                }
                (WorkerState::Processing, Some(order_id)) => {
                    let order = self
                        .ledger
                        .get(order_id)
                        .ok_or_else(|| format!("worker {} holds unknown order {order_id}", worker.id))?;
                    if order.state != OrderState::Processing || order.assigned_worker != Some(worker.id) {
                        return Err(format!(
                            "worker {} holds order {order_id} assigned to {:?} in state {:?}",
                            worker.id, order.assigned_worker, order.state
                        ));
                    }
                    if self.timers.pending_for(worker.id) != Some(Deferred::Complete { order: order_id }) {
                        return Err(format!("worker {} has no completion pending", worker.id));
                    }
                }
                (state, current) => {
                    return Err(format!("worker {} is {state} with order {current:?}", worker.id));
                }
            }
        }
        Ok(())
    }
}
