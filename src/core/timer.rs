//! Cancelable deferred callbacks on the dispatcher's logical clock.

use std::collections::{BTreeMap, HashMap};

use crate::util::serde::{OrderId, WorkerId};

/// Callback kinds a worker can have outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deferred {
    /// Re-run the dispatch attempt after the poll interval.
    PollRetry,
    /// Finish `order` after the processing duration.
    Complete {
        /// Order the worker is holding.
        order: OrderId,
    },
}

/// A callback that fell due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiredTimer {
    /// Logical time the callback was scheduled for.
    pub due_ms: u64,
    /// Worker that owns the callback.
    pub worker: WorkerId,
    /// What to run.
    pub deferred: Deferred,
}

/// Deferred callbacks ordered by `(due_ms, worker)`.
///
/// Each worker owns at most one callback; scheduling a new one replaces the
/// old. Callbacks due at the same instant fire in ascending worker id order.
#[derive(Debug, Default)]
pub struct TimerQueue {
    entries: BTreeMap<(u64, WorkerId), Deferred>,
    by_worker: HashMap<WorkerId, u64>,
}

impl TimerQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `deferred` for `worker` at `due_ms`, returning whatever the
    /// worker had outstanding before.
    pub fn schedule(&mut self, worker: WorkerId, due_ms: u64, deferred: Deferred) -> Option<Deferred> {
        let previous = self.cancel(worker);
        self.entries.insert((due_ms, worker), deferred);
        self.by_worker.insert(worker, due_ms);
        previous
    }

    /// Drop the worker's outstanding callback, if any.
    pub fn cancel(&mut self, worker: WorkerId) -> Option<Deferred> {
        let due = self.by_worker.remove(&worker)?;
        self.entries.remove(&(due, worker))
    }

    /// Remove and return the earliest callback due at or before `now_ms`.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<FiredTimer> {
        let (&(due_ms, _), _) = self.entries.first_key_value()?;
        if due_ms > now_ms {
            return None;
        }
        let ((due_ms, worker), deferred) = self.entries.pop_first()?;
        self.by_worker.remove(&worker);
        Some(FiredTimer {
            due_ms,
            worker,
            deferred,
        })
    }

    /// Earliest due time.
    #[must_use]
    pub fn next_due(&self) -> Option<u64> {
        self.entries.keys().next().map(|&(due, _)| due)
    }

    /// The worker's outstanding callback.
    #[must_use]
    pub fn pending_for(&self, worker: WorkerId) -> Option<Deferred> {
        let due = self.by_worker.get(&worker)?;
        self.entries.get(&(*due, worker)).copied()
    }

    /// Number of outstanding callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is outstanding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
