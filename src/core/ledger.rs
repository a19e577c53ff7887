//! Order ledger: lifecycle bookkeeping for every order ever created.
//!
//! The ledger owns the pending queue. Each order lives in exactly one of the
//! pending queue, the processing set or the completed set, so
//! `pending + processing + completed == created` holds after every call.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::{DispatchError, Order, OrderState};
use crate::infra::queue::InMemoryLanes;
use crate::util::serde::{OrderId, PriorityClass, Timestamp, WorkerId};

/// First order id is `ORDER_ID_BASE + 1`.
pub const ORDER_ID_BASE: OrderId = 1000;

/// Abstraction for the pending-queue backend.
pub trait PendingQueue<T> {
    /// Append to the tail of `class`'s lane.
    fn enqueue_tail(&mut self, class: PriorityClass, item: T);
    /// Insert at the head of `class`'s lane. Reserved for preemption re-entry.
    fn enqueue_head(&mut self, class: PriorityClass, item: T);
    /// Remove the head of the high lane, else of the normal lane.
    fn dequeue_head(&mut self) -> Option<T>;
    /// Every pending item in dispatch order, without mutating the queue.
    fn snapshot(&self) -> Vec<T>;
    /// Number of items in one lane.
    fn lane_len(&self, class: PriorityClass) -> usize;
    /// Number of items across both lanes.
    fn len(&self) -> usize;
    /// Whether both lanes are empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Immutable copy of the order partition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderListing {
    /// Pending orders in dispatch order.
    pub pending: Vec<Order>,
    /// Processing orders in dispatch order.
    pub processing: Vec<Order>,
    /// Completed orders in completion order.
    pub completed: Vec<Order>,
}

impl OrderListing {
    /// Total number of orders across all three sets.
    #[must_use]
    pub fn total(&self) -> usize {
        self.pending.len() + self.processing.len() + self.completed.len()
    }
}

/// Tracks every order's lifecycle independent of its lane.
#[derive(Debug)]
pub struct OrderLedger<Q = InMemoryLanes<OrderId>> {
    queue: Q,
    orders: HashMap<OrderId, Order>,
    processing: Vec<OrderId>,
    completed: Vec<OrderId>,
    last_id: OrderId,
}

impl OrderLedger<InMemoryLanes<OrderId>> {
    /// Ledger backed by the in-memory two-lane queue.
    #[must_use]
    pub fn new() -> Self {
        Self::with_queue(InMemoryLanes::new())
    }
}

impl Default for OrderLedger<InMemoryLanes<OrderId>> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Q: PendingQueue<OrderId>> OrderLedger<Q> {
    /// Ledger backed by a caller-supplied queue. The queue must start empty.
    pub fn with_queue(queue: Q) -> Self {
        debug_assert!(queue.is_empty(), "ledger queue must start empty");
        Self {
            queue,
            orders: HashMap::new(),
            processing: Vec::new(),
            completed: Vec::new(),
            last_id: ORDER_ID_BASE,
        }
    }

    /// Allocate the next id and append a pending order to its lane.
    pub fn create(&mut self, priority: PriorityClass, now: Timestamp) -> Order {
        self.last_id += 1;
        let order = Order::new(self.last_id, priority, now);
        self.queue.enqueue_tail(priority, order.id);
        self.orders.insert(order.id, order.clone());
        order
    }

    /// Dequeue the next pending order and move it into the processing set on
    /// behalf of `worker`, in one step. Returns `None` when both lanes are
    /// empty.
    pub fn dispatch_next(&mut self, worker: WorkerId, now: Timestamp) -> Option<Order> {
        while let Some(id) = self.queue.dequeue_head() {
            match self.begin_processing(id, worker, now) {
                Ok(order) => return Some(order),
                Err(err) => warn!(order_id = id, %err, "dropping stale queue entry"),
            }
        }
        None
    }

    /// Move a freshly dequeued order into the processing set.
    ///
    /// `OrderNotFound` if the id was never allocated, `InvalidTransition` if
    /// the order is not pending.
    fn begin_processing(
        &mut self,
        id: OrderId,
        worker: WorkerId,
        now: Timestamp,
    ) -> Result<Order, DispatchError> {
        let order = self.orders.get_mut(&id).ok_or(DispatchError::OrderNotFound(id))?;
        if order.state != OrderState::Pending {
            return Err(DispatchError::InvalidTransition {
                order: id,
                from: order.state,
                to: OrderState::Processing,
            });
        }
        order.state = OrderState::Processing;
        order.processing_started_at = Some(now);
        order.assigned_worker = Some(worker);
        self.processing.push(id);
        Ok(order.clone())
    }

    /// Mark a processing order complete.
    ///
    /// # Errors
    ///
    /// `OrderNotFound` if the order is not currently processing (for example
    /// it was preempted first). Nothing changes in that case.
    pub fn complete(&mut self, id: OrderId, now: Timestamp) -> Result<Order, DispatchError> {
        self.take_processing(id)?;
        let order = self.orders.get_mut(&id).ok_or(DispatchError::OrderNotFound(id))?;
        order.state = OrderState::Complete;
        order.completed_at = Some(now);
        order.assigned_worker = None;
        self.completed.push(id);
        Ok(order.clone())
    }

    /// Return a processing order to the head of its own lane.
    ///
    /// # Errors
    ///
    /// `OrderNotFound` if the order is not currently processing. Nothing
    /// changes in that case.
    pub fn return_to_pending(&mut self, id: OrderId) -> Result<Order, DispatchError> {
        self.take_processing(id)?;
        let order = self.orders.get_mut(&id).ok_or(DispatchError::OrderNotFound(id))?;
        order.state = OrderState::Pending;
        order.processing_started_at = None;
        order.assigned_worker = None;
        self.queue.enqueue_head(order.priority, id);
        Ok(order.clone())
    }

    fn take_processing(&mut self, id: OrderId) -> Result<(), DispatchError> {
        let pos = self
            .processing
            .iter()
            .position(|&p| p == id)
            .ok_or(DispatchError::OrderNotFound(id))?;
        self.processing.remove(pos);
        Ok(())
    }

    /// Look up an order by id.
    #[must_use]
    pub fn get(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id)
    }

    /// Pending ids in dispatch order.
    #[must_use]
    pub fn pending_ids(&self) -> Vec<OrderId> {
        self.queue.snapshot()
    }

    /// Copy of the full partition.
    #[must_use]
    pub fn listing(&self) -> OrderListing {
        OrderListing {
            pending: self.collect(&self.queue.snapshot()),
            processing: self.collect(&self.processing),
            completed: self.collect(&self.completed),
        }
    }

    fn collect(&self, ids: &[OrderId]) -> Vec<Order> {
        ids.iter().filter_map(|id| self.orders.get(id)).cloned().collect()
    }

    /// Pending orders across both lanes.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// Pending orders in one lane.
    #[must_use]
    pub fn lane_count(&self, class: PriorityClass) -> usize {
        self.queue.lane_len(class)
    }

    /// Orders currently held by a worker.
    #[must_use]
    pub fn processing_count(&self) -> usize {
        self.processing.len()
    }

    /// Orders that reached completion.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// Orders ever created.
    #[must_use]
    pub fn created_count(&self) -> usize {
        self.orders.len()
    }
}
