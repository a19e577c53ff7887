//! Worker ("bot") records.

use serde::{Deserialize, Serialize};

use crate::util::serde::{OrderId, Timestamp, WorkerId};

/// Worker state. There is no removed state: removal deletes the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerState {
    /// Not holding an order; re-checks the queue every poll interval.
    Idle,
    /// Holding `current_order` until its completion timer fires.
    Processing,
}

/// Snapshot of a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Worker {
    /// Unique, monotonically increasing identifier.
    pub id: WorkerId,
    /// Current state.
    pub state: WorkerState,
    /// Set iff `state` is `Processing`.
    pub current_order: Option<OrderId>,
    /// Creation time.
    pub created_at: Timestamp,
}

impl Worker {
    pub(crate) const fn new(id: WorkerId, created_at: Timestamp) -> Self {
        Self {
            id,
            state: WorkerState::Idle,
            current_order: None,
            created_at,
        }
    }

    pub(crate) fn assign(&mut self, order: OrderId) {
        self.state = WorkerState::Processing;
        self.current_order = Some(order);
    }

    pub(crate) fn release(&mut self) {
        self.state = WorkerState::Idle;
        self.current_order = None;
    }

    /// Whether the worker currently holds an order.
    #[must_use]
    pub const fn is_processing(&self) -> bool {
        matches!(self.state, WorkerState::Processing)
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Idle => "IDLE",
            Self::Processing => "PROCESSING",
        })
    }
}
