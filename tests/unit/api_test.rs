//! Tests for API models and helpers

use order_dispatch::builders::DispatcherBuilder;
use order_dispatch::config::DispatchConfig;
use order_dispatch::core::DispatchError;
use order_dispatch::runtime::api::{self, ApiResponse, CreateOrderRequest};
use order_dispatch::runtime::{DispatchService, TokioSpawner};
use order_dispatch::util::PriorityClass;

fn service() -> DispatchService {
    let dispatcher = DispatcherBuilder::new(DispatchConfig::default())
        .with_epoch(0)
        .build()
        .unwrap();
    DispatchService::start(dispatcher, &TokioSpawner::current())
}

#[test]
fn test_create_order_request_accepts_vip() {
    let req: CreateOrderRequest = serde_json::from_str(r#"{"priority":"VIP"}"#).unwrap();
    assert_eq!(req.priority, PriorityClass::High);
}

#[test]
fn test_error_response_shape() {
    let resp: ApiResponse<()> = ApiResponse::error(&DispatchError::NoWorkerAvailable);
    let json = serde_json::to_value(&resp).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "no worker available");
    assert!(json.get("data").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_api_round_trip_through_service() {
    let service = service();

    let created = api::create_order(&service, CreateOrderRequest { priority: PriorityClass::High });
    assert!(created.success);
    assert_eq!(created.message.as_deref(), Some("VIP order created"));
    let order = created.data.unwrap();

    let added = api::add_worker(&service);
    assert_eq!(added.data.unwrap().current_order, Some(order.id));

    let listing = api::list_workers(&service).data.unwrap();
    assert_eq!((listing.count, listing.active, listing.idle), (1, 1, 0));

    let status = api::status(&service).data.unwrap();
    assert_eq!(status.processing_orders, 1);

    let removed = api::remove_worker(&service).unwrap();
    assert_eq!(removed.message.as_deref(), Some("Bot #1 removed"));
    assert_eq!(removed.data.unwrap().returned_order, Some(order.id));
    assert_eq!(
        api::remove_worker(&service).unwrap_err(),
        DispatchError::NoWorkerAvailable
    );
    assert_eq!(api::list_orders(&service).data.unwrap().pending.len(), 1);
    assert!(api::health().ok);
}
