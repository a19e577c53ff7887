//! Error types for dispatch operations.

use thiserror::Error;

use crate::core::OrderState;
use crate::util::serde::OrderId;

/// Errors produced by dispatch components.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// No worker is left to remove.
    #[error("no worker available")]
    NoWorkerAvailable,
    /// The order is not in the state the operation expects (already
    /// completed, already preempted, or never existed).
    #[error("order {0} not found")]
    OrderNotFound(OrderId),
    /// A state transition was requested that the order lifecycle forbids.
    #[error("order {order} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        /// Order the transition was attempted on.
        order: OrderId,
        /// State the order was found in.
        from: OrderState,
        /// Requested target state.
        to: OrderState,
    },
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Runtime driver failure with context.
    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
