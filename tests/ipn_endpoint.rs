//! The IPN route's always-ack contract, exercised through the router.
//!
//! Whatever arrives on the callback endpoint, the gateway gets back a
//! 200 with `{return_code, return_message}`; anything else provokes
//! retry storms on the gateway side.

#![allow(clippy::unwrap_used)]

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use cinema_booking::server::{build_router, AppState};
use cinema_booking::types::{CustomerId, Money, PaymentMethod, ShowtimeId};
use common::{seat_list, TestEnv};
use tower::ServiceExt;

fn app(env: &TestEnv) -> axum::Router {
    build_router(AppState::new(
        env.hold_service.clone(),
        env.booking_service.clone(),
        env.reconciliation.clone(),
        env.ledger.clone(),
        env.clock.clone(),
        "wallet".to_string(),
    ))
}

async fn post_ipn(router: axum::Router, body: &str) -> (StatusCode, serde_json::Value) {
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/payments/wallet/ipn")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn malformed_body_is_acknowledged_not_rejected() {
    let env = TestEnv::new();
    let (status, ack) = post_ipn(app(&env), "this is not json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["return_code"], 0);
    assert_eq!(ack["return_message"], "received");
}

#[tokio::test]
async fn envelope_with_missing_fields_is_acknowledged() {
    let env = TestEnv::new();
    let (status, ack) = post_ipn(app(&env), r#"{"data": "{}"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["return_code"], 0);
}

#[tokio::test]
async fn valid_success_callback_is_applied_and_acked() {
    let env = TestEnv::new();
    let customer = CustomerId::new();

    let hold = env
        .hold_service
        .create_hold(customer, ShowtimeId::new(), &seat_list(&["A1"]), None)
        .await
        .unwrap();
    let receipt = env
        .booking_service
        .create_booking(hold.hold_id, customer, PaymentMethod::Wallet)
        .await
        .unwrap();
    let order = receipt.gateway_order.unwrap();

    let envelope =
        env.gateway_callback(&order.app_trans_id, "zp-ipn", Money::from_minor(order.amount), true);
    let body = serde_json::to_string(&envelope).unwrap();

    let (status, ack) = post_ipn(app(&env), &body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["return_code"], 1);
    assert_eq!(ack["return_message"], "success");
}
