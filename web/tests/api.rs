//! API tests against the full router mounted on in-memory stores.

#![allow(clippy::unwrap_used)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use causeway_core::mocks::{MockInventoryLedger, MockPaymentGateway, MockReservationStore};
use causeway_core::{
    GatewayStatus, Money, PaymentReference, SettlementConfig, SettlementCoordinator,
    VerifiedPayment,
};
use causeway_web::{AppState, router};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

struct TestApp {
    app: Router,
    inventory: MockInventoryLedger,
    gateway: MockPaymentGateway,
}

fn test_app() -> TestApp {
    let inventory = MockInventoryLedger::new();
    let gateway = MockPaymentGateway::new();
    let coordinator = SettlementCoordinator::new(
        MockReservationStore::new(),
        inventory.clone(),
        gateway.clone(),
        SettlementConfig::default(),
    );

    TestApp {
        app: router(AppState::new(coordinator)),
        inventory,
        gateway,
    }
}

async fn send_json(app: &Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let t = test_app();
    let (status, body) = get(&t.app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_create_donation_returns_checkout_url() {
    let t = test_app();

    let (status, body) = send_json(
        &t.app,
        "POST",
        "/api/donations",
        json!({
            "name": "Ada",
            "email": "ada@example.org",
            "amount_minor": 50_000
        }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    assert!(body["reference"].as_str().unwrap().starts_with("CW-"));
    assert!(
        body["authorization_url"]
            .as_str()
            .unwrap()
            .starts_with("https://")
    );
}

#[tokio::test]
async fn test_invalid_email_is_rejected() {
    let t = test_app();

    let (status, body) = send_json(
        &t.app,
        "POST",
        "/api/donations",
        json!({
            "email": "not-an-email",
            "amount_minor": 1_000
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_nonpositive_amount_is_rejected() {
    let t = test_app();

    let (status, _) = send_json(
        &t.app,
        "POST",
        "/api/donations",
        json!({
            "email": "ada@example.org",
            "amount_minor": 0
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_reservation_is_404() {
    let t = test_app();
    let (status, body) = get(&t.app, "/api/reservations/CW-1-ABCDEF").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_ticket_purchase_settles_through_callback() {
    let t = test_app();
    let ticket_type = Uuid::new_v4();

    // Register capacity.
    let (status, _) = send_json(
        &t.app,
        "POST",
        "/api/admin/resources",
        json!({ "resource_id": ticket_type, "capacity": 20 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Buyer reserves two tickets.
    let (status, body) = send_json(
        &t.app,
        "POST",
        "/api/tickets",
        json!({
            "email": "attendee@example.org",
            "amount_minor": 10_000,
            "event_id": Uuid::new_v4(),
            "ticket_type_id": ticket_type,
            "quantity": 2
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let reference = body["reference"].as_str().unwrap().to_string();

    // Pending reservations hold no capacity.
    let (_, body) = get(&t.app, &format!("/api/availability/{ticket_type}")).await;
    assert_eq!(body["remaining"], 20);

    // Processor confirms the charge; browser returns.
    t.gateway.script_verify(
        &PaymentReference::from_string(reference.clone()),
        VerifiedPayment {
            status: GatewayStatus::Success,
            amount_confirmed: Money::from_minor_units(10_000),
        },
    );

    let (status, body) = get(&t.app, &format!("/payments/callback?reference={reference}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");

    let (_, body) = get(&t.app, &format!("/api/availability/{ticket_type}")).await;
    assert_eq!(body["remaining"], 18);
}

#[tokio::test]
async fn test_webhook_duplicates_are_absorbed() {
    let t = test_app();
    let ticket_type = Uuid::new_v4();

    send_json(
        &t.app,
        "POST",
        "/api/admin/resources",
        json!({ "resource_id": ticket_type, "capacity": 5 }),
    )
    .await;

    let (_, body) = send_json(
        &t.app,
        "POST",
        "/api/tickets",
        json!({
            "email": "attendee@example.org",
            "amount_minor": 5_000,
            "event_id": Uuid::new_v4(),
            "ticket_type_id": ticket_type,
            "quantity": 1
        }),
    )
    .await;
    let reference = body["reference"].as_str().unwrap().to_string();

    t.gateway.script_verify(
        &PaymentReference::from_string(reference.clone()),
        VerifiedPayment {
            status: GatewayStatus::Success,
            amount_confirmed: Money::from_minor_units(5_000),
        },
    );

    let webhook = json!({
        "event": "charge.success",
        "data": { "reference": reference }
    });

    let (status, _) = send_json(&t.app, "POST", "/payments/webhook", webhook.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send_json(&t.app, "POST", "/payments/webhook", webhook).await;
    assert_eq!(status, StatusCode::OK);

    // One decrement despite two deliveries.
    assert_eq!(t.inventory.reserve_calls(), 1);
    let (_, body) = get(&t.app, &format!("/api/availability/{ticket_type}")).await;
    assert_eq!(body["remaining"], 4);
}

#[tokio::test]
async fn test_webhook_ignores_unrelated_events() {
    let t = test_app();

    let (status, _) = send_json(
        &t.app,
        "POST",
        "/payments/webhook",
        json!({
            "event": "transfer.success",
            "data": { "reference": "TRF-123" }
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_webhook_for_unknown_reference_is_acknowledged() {
    let t = test_app();

    let (status, _) = send_json(
        &t.app,
        "POST",
        "/payments/webhook",
        json!({
            "event": "charge.success",
            "data": { "reference": "CW-1-ZZZZZZ" }
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_order_with_mismatched_total_is_rejected() {
    let t = test_app();

    let (status, _) = send_json(
        &t.app,
        "POST",
        "/api/orders",
        json!({
            "email": "shopper@example.org",
            "amount_minor": 9_999,
            "lines": [
                { "product_id": Uuid::new_v4(), "quantity": 2, "unit_price_minor": 2_000 }
            ],
            "subtotal_minor": 4_000,
            "shipping_minor": 1_000
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_callback_without_reference_is_rejected() {
    let t = test_app();
    let (status, _) = get(&t.app, "/payments/callback").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_amount_mismatch_settles_as_failed() {
    let t = test_app();

    let (_, body) = send_json(
        &t.app,
        "POST",
        "/api/donations",
        json!({ "email": "donor@example.org", "amount_minor": 10_000 }),
    )
    .await;
    let reference = body["reference"].as_str().unwrap().to_string();

    // Processor captured a different amount than was recorded.
    t.gateway.script_verify(
        &PaymentReference::from_string(reference.clone()),
        VerifiedPayment {
            status: GatewayStatus::Success,
            amount_confirmed: Money::from_minor_units(9_000),
        },
    );

    let (status, body) = get(&t.app, &format!("/payments/callback?reference={reference}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "failed");
    assert_eq!(body["failure_reason"]["reason"], "amount_mismatch");
}
