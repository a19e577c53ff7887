//! API-facing request/response models.
//!
//! The HTTP layer lives outside this crate; these models and helpers map its
//! routes onto exactly the service operations.

use serde::{Deserialize, Serialize};

use crate::core::{DispatchError, Order, OrderListing, PendingQueue, StatusSummary, Worker};
use crate::runtime::DispatchService;
use crate::util::serde::{OrderId, PriorityClass};

/// Order creation payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    /// Lane for the new order.
    pub priority: PriorityClass,
}

/// Worker listing with counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerListing {
    /// Workers in insertion order.
    pub workers: Vec<Worker>,
    /// Pool size.
    pub count: usize,
    /// Workers holding an order.
    pub active: usize,
    /// Workers without an order.
    pub idle: usize,
}

/// Outcome of a worker removal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveWorkerResponse {
    /// The removed worker in its final state.
    pub worker: Worker,
    /// Order handed back to its lane, if the worker was processing.
    pub returned_order: Option<OrderId>,
}

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
}

/// Response envelope shared by every route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Human-readable outcome.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Payload on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Successful response.
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }

    /// Successful response without a message.
    pub const fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    /// Failed response.
    pub fn error(err: &DispatchError) -> Self {
        Self {
            success: false,
            message: Some(err.to_string()),
            data: None,
        }
    }
}

/// Create an order.
pub fn create_order<Q>(service: &DispatchService<Q>, req: CreateOrderRequest) -> ApiResponse<Order>
where
    Q: PendingQueue<OrderId> + Send + 'static,
{
    let order = service.create_order(req.priority);
    ApiResponse::ok(format!("{} order created", req.priority), order)
}

/// Add a worker.
pub fn add_worker<Q>(service: &DispatchService<Q>) -> ApiResponse<Worker>
where
    Q: PendingQueue<OrderId> + Send + 'static,
{
    ApiResponse::ok("Bot added", service.add_worker())
}

/// Remove the newest worker.
///
/// # Errors
///
/// `DispatchError::NoWorkerAvailable` when the pool is empty.
pub fn remove_worker<Q>(
    service: &DispatchService<Q>,
) -> Result<ApiResponse<RemoveWorkerResponse>, DispatchError>
where
    Q: PendingQueue<OrderId> + Send + 'static,
{
    let worker = service.remove_worker().ok_or(DispatchError::NoWorkerAvailable)?;
    let message = format!("Bot #{} removed", worker.id);
    Ok(ApiResponse::ok(
        message,
        RemoveWorkerResponse {
            returned_order: worker.current_order,
            worker,
        },
    ))
}

/// List workers with counts.
pub fn list_workers<Q>(service: &DispatchService<Q>) -> ApiResponse<WorkerListing>
where
    Q: PendingQueue<OrderId> + Send + 'static,
{
    let workers = service.list_workers();
    let active = workers.iter().filter(|w| w.is_processing()).count();
    ApiResponse::data(WorkerListing {
        count: workers.len(),
        active,
        idle: workers.len() - active,
        workers,
    })
}

/// List orders grouped by state.
pub fn list_orders<Q>(service: &DispatchService<Q>) -> ApiResponse<OrderListing>
where
    Q: PendingQueue<OrderId> + Send + 'static,
{
    ApiResponse::data(service.list_orders())
}

/// System status summary.
pub fn status<Q>(service: &DispatchService<Q>) -> ApiResponse<StatusSummary>
where
    Q: PendingQueue<OrderId> + Send + 'static,
{
    ApiResponse::data(service.status())
}

/// Return a health payload.
#[must_use]
pub const fn health() -> Health {
    Health { ok: true }
}
