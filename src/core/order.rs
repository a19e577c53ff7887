//! Order records.

use serde::{Deserialize, Serialize};

use crate::util::serde::{OrderId, PriorityClass, Timestamp, WorkerId};

/// Lifecycle state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    /// Waiting in its priority lane.
    Pending,
    /// Held by exactly one worker.
    Processing,
    /// Finished; terminal.
    Complete,
}

/// A unit of work flowing through the dispatcher.
///
/// Values handed out by the dispatcher are snapshots: mutating one never
/// affects dispatcher state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Unique, monotonically increasing identifier.
    pub id: OrderId,
    /// Priority lane the order belongs to. Never changes.
    pub priority: PriorityClass,
    /// Current lifecycle state.
    pub state: OrderState,
    /// Creation time.
    pub created_at: Timestamp,
    /// Set when dispatched; cleared again on preemption.
    pub processing_started_at: Option<Timestamp>,
    /// Set once on completion.
    pub completed_at: Option<Timestamp>,
    /// Worker holding the order while it is processing.
    pub assigned_worker: Option<WorkerId>,
}

impl Order {
    pub(crate) const fn new(id: OrderId, priority: PriorityClass, created_at: Timestamp) -> Self {
        Self {
            id,
            priority,
            state: OrderState::Pending,
            created_at,
            processing_started_at: None,
            completed_at: None,
            assigned_worker: None,
        }
    }

    /// Whether the order sits in the high-priority lane.
    #[must_use]
    pub fn is_high_priority(&self) -> bool {
        self.priority == PriorityClass::High
    }
}
