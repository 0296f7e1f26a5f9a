//! Tests for the Razorpay adapter against a local mock of the orders API.

use domain::{Currency, Money};
use lifecycle::{GatewayError, PaymentGateway, RazorpayGateway, SignatureVerifier};
use serde_json::json;
use wiremock::matchers::{basic_auth, body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY_ID: &str = "rzp_test_key";
const KEY_SECRET: &str = "rzp_test_secret";

async fn gateway(server: &MockServer) -> RazorpayGateway {
    RazorpayGateway::new(KEY_ID, KEY_SECRET)
        .unwrap()
        .with_api_base(format!("{}/v1", server.uri()))
}

#[tokio::test]
async fn test_create_order_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/orders"))
        .and(basic_auth(KEY_ID, KEY_SECRET))
        .and(body_json(json!({
            "amount": 500_000,
            "currency": "INR",
            "receipt": "booking_1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "order_Rz123",
            "entity": "order",
            "amount": 500_000,
            "currency": "INR",
            "receipt": "booking_1",
            "status": "created"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let order = gateway(&server)
        .await
        .create_order(Money::from_major(5000), &Currency::inr(), "booking_1")
        .await
        .unwrap();

    assert_eq!(order.order_id, "order_Rz123");
    assert_eq!(order.amount, Money::from_major(5000));
    assert_eq!(order.currency, Currency::inr());
    assert_eq!(order.receipt, "booking_1");
}

#[tokio::test]
async fn test_non_success_status_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/orders"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": "BAD_REQUEST_ERROR", "description": "amount exceeds maximum" }
        })))
        .mount(&server)
        .await;

    let err = gateway(&server)
        .await
        .create_order(Money::from_major(5000), &Currency::inr(), "booking_1")
        .await
        .unwrap_err();

    match &err {
        GatewayError::Rejected { status, body } => {
            assert_eq!(*status, 400);
            assert!(body.contains("BAD_REQUEST_ERROR"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_server_error_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/orders"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = gateway(&server)
        .await
        .create_order(Money::from_major(10), &Currency::inr(), "booking_2")
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Rejected { status: 503, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_amount_mismatch_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "order_Rz456",
            "amount": 100,
            "currency": "INR",
            "receipt": "booking_3"
        })))
        .mount(&server)
        .await;

    let err = gateway(&server)
        .await
        .create_order(Money::from_major(5000), &Currency::inr(), "booking_3")
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::InvalidResponse(ref msg) if msg.contains("order_Rz456")));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_verify_callback_uses_key_secret() {
    let server = MockServer::start().await;
    let gateway = gateway(&server).await;
    let signature = SignatureVerifier::new(KEY_SECRET)
        .unwrap()
        .sign("order_Rz123", "pay_Rz1");

    assert!(gateway.verify_callback("order_Rz123", "pay_Rz1", &signature));
    assert!(!gateway.verify_callback("order_Rz123", "pay_Rz2", &signature));
}
