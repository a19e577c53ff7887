//! Tokio runtime adapter and API surface.

pub mod api;
pub mod service;
pub mod tokio_spawner;

pub use api::{ApiResponse, CreateOrderRequest, Health, RemoveWorkerResponse, WorkerListing};
pub use service::DispatchService;
pub use tokio_spawner::TokioSpawner;
