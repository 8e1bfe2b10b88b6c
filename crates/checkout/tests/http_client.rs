//! Integration tests for the HTTP reconciliation backend.

use std::sync::Arc;
use std::time::Duration;

use cart::{CartProduct, CartStore};
use checkout::{
    ConfirmationDeps, ConfirmationView, HttpReconciliationClient, InMemoryNavigator,
    OrderReconciliationClient, PaymentSession, ReconciliationError, Route, StatusTag,
};
use common::Money;
use httpmock::prelude::*;
use serde_json::json;

fn session(token: &str) -> PaymentSession {
    PaymentSession::new(token).unwrap()
}

fn confirmation_body() -> serde_json::Value {
    json!({
        "order_ids": ["OC-1", "OC-2"],
        "items": [
            {
                "product_id": "7f1c2a4e-0000-4000-8000-000000000001",
                "product_name": "Widget",
                "quantity": 1,
                "unit_price": 84.74,
                "subtotal": 84.74,
                "tax_amount": 15.25,
                "total_amount": 99.99
            },
            {
                "product_id": "7f1c2a4e-0000-4000-8000-000000000002",
                "product_name": "Gadget",
                "quantity": 1,
                "unit_price": 25.42,
                "subtotal": 25.42,
                "tax_amount": 4.58,
                "total_amount": 30.0
            }
        ],
        "total_amount": 129.99,
        "status": "PENDING",
        "delivery_date": "2026-10-21T10:15:00.000000-05:00"
    })
}

#[tokio::test]
async fn test_confirm_posts_session_and_decodes_orders() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/public/orders")
                .header("content-type", "application/json")
                .json_body(json!({ "session_id": "sess_abc123" }));
            then.status(200).json_body(confirmation_body());
        })
        .await;

    let client = HttpReconciliationClient::new(server.url("/api/v1/public"));
    let order = client.confirm(&session("sess_abc123")).await.unwrap();

    mock.assert_async().await;
    assert_eq!(order.total_amount().cents(), 12999);
    assert_eq!(order.order_ids_display(), "OC-1, OC-2");
    assert_eq!(order.items().len(), 2);
    assert_eq!(order.status(), "PENDING");
    assert_eq!(
        order.delivery_date().map(|d| d.to_string()),
        Some("2026-10-21".to_string())
    );
}

#[tokio::test]
async fn test_rejection_carries_status_and_detail() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/orders");
            then.status(400)
                .json_body(json!({ "detail": "Payment has not been completed" }));
        })
        .await;

    let client = HttpReconciliationClient::new(server.base_url());
    let result = client.confirm(&session("sess_bad")).await;

    assert_eq!(
        result,
        Err(ReconciliationError::Rejected {
            status: 400,
            detail: "Payment has not been completed".to_string(),
        })
    );
}

#[tokio::test]
async fn test_server_error_without_body() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/orders");
            then.status(502);
        })
        .await;

    let client = HttpReconciliationClient::new(server.base_url());
    let result = client.confirm(&session("sess_abc123")).await;

    assert!(matches!(
        result,
        Err(ReconciliationError::Rejected { status: 502, .. })
    ));
}

#[tokio::test]
async fn test_malformed_body_is_invalid_payload() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/orders");
            then.status(200).body("<html>maintenance</html>");
        })
        .await;

    let client = HttpReconciliationClient::new(server.base_url());
    let result = client.confirm(&session("sess_abc123")).await;

    assert!(matches!(result, Err(ReconciliationError::InvalidPayload(_))));
}

#[tokio::test]
async fn test_empty_order_ids_is_invalid_payload() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/orders");
            then.status(200).json_body(json!({
                "order_ids": [],
                "items": [],
                "total_amount": 0.0,
                "status": "EMPTY",
                "message": "No items found in session."
            }));
        })
        .await;

    let client = HttpReconciliationClient::new(server.base_url());
    let result = client.confirm(&session("mock_session_empty")).await;

    assert!(matches!(result, Err(ReconciliationError::InvalidPayload(_))));
}

#[tokio::test]
async fn test_timeout_is_transport_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/orders");
            then.status(200)
                .delay(Duration::from_millis(500))
                .json_body(confirmation_body());
        })
        .await;

    let client =
        HttpReconciliationClient::with_timeout(server.base_url(), Duration::from_millis(50))
            .unwrap();
    let result = client.confirm(&session("sess_abc123")).await;

    assert!(matches!(result, Err(ReconciliationError::Transport(_))));
}

#[tokio::test]
async fn test_unreachable_backend_is_transport_error() {
    let client = HttpReconciliationClient::new("http://127.0.0.1:9");
    let result = client.confirm(&session("sess_abc123")).await;

    assert!(matches!(result, Err(ReconciliationError::Transport(_))));
}

#[tokio::test]
async fn test_view_over_http_posts_once_and_clears_cart() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/orders");
            then.status(200).json_body(confirmation_body());
        })
        .await;

    let cart = CartStore::new();
    cart.add(
        CartProduct::new("SKU-001", "Widget", Money::from_cents(9999), 4),
        1,
    )
    .unwrap();
    let navigator = InMemoryNavigator::new();
    let deps = ConfirmationDeps::new(
        Arc::new(HttpReconciliationClient::new(server.base_url())),
        Arc::new(cart.clone()),
        Arc::new(navigator.clone()),
    );

    let mut view = ConfirmationView::mount([("session_id", "sess_abc123")], deps);
    for _ in 0..3 {
        view.update([("session_id", "sess_abc123")]);
        view.render();
    }
    view.settled().await;

    mock.assert_hits_async(1).await;
    assert_eq!(view.render().status, StatusTag::Success);
    assert!(cart.is_empty());
    assert_eq!(view.dismiss(), Some(Route::Home));
}
