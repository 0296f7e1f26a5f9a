//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use api::config::DEV_PAYMENT_SECRET;
use api::identity::InMemoryTokenRegistry;
use api::routes::bookings::AppState;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use booking_store::InMemoryBookingStore;
use domain::{Actor, Money, UserId};
use lifecycle::{PropertyListing, SignatureVerifier};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: axum::Router,
    state: Arc<AppState<InMemoryBookingStore>>,
    buyer: String,
    seller: String,
    admin: String,
    property_id: String,
}

async fn setup() -> TestApp {
    let (state, tokens): (_, InMemoryTokenRegistry) =
        api::create_default_state(InMemoryBookingStore::new()).unwrap();
    let app = api::create_app(state.clone(), get_metrics_handle());

    let seller = Actor::seller(UserId::new());
    let listing = PropertyListing::new(seller.id, "Hill cottage", Money::from_major(5000));
    let property_id = listing.id.to_string();
    state.lifecycle.catalog().add(listing).await;

    TestApp {
        app,
        state,
        buyer: tokens.issue(Actor::buyer(UserId::new())).await,
        seller: tokens.issue(seller).await,
        admin: tokens.issue(Actor::admin(UserId::new())).await,
        property_id,
    }
}

impl TestApp {
    async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header("authorization", format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(serde_json::to_string(&json).unwrap())
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn create_booking(&self) -> Value {
        let (status, json) = self
            .send(
                "POST",
                "/bookings",
                Some(&self.buyer),
                Some(json!({
                    "property_id": self.property_id,
                    "visit_date": "2024-06-01",
                    "message": "Can I visit in the morning?"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        json
    }

    async fn post_action(&self, id: &str, action: &str, token: &str) -> (StatusCode, Value) {
        self.send("POST", &format!("/bookings/{id}/{action}"), Some(token), None)
            .await
    }
}

fn signed_callback(order_id: &str, payment_id: &str) -> Value {
    let signature = SignatureVerifier::new(DEV_PAYMENT_SECRET)
        .unwrap()
        .sign(order_id, payment_id);
    json!({
        "order_id": order_id,
        "payment_id": payment_id,
        "signature": signature,
        "success": true
    })
}

mod health {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        let t = setup().await;
        let (status, json) = t.send("GET", "/health", None, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["store"], "ok");
    }

    #[tokio::test]
    async fn test_metrics_endpoint_reports_transitions() {
        let t = setup().await;
        t.create_booking().await;

        let response = t
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("booking_transitions_total"));
    }
}

mod authentication {
    use super::*;

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let t = setup().await;
        let (status, json) = t.send("GET", "/bookings/mine", None, None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["kind"], "unauthenticated");
    }

    #[tokio::test]
    async fn test_unknown_token_is_unauthorized() {
        let t = setup().await;
        let (status, _) = t
            .send("GET", "/bookings/mine", Some("forged-token"), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

mod lifecycle_flow {
    use super::*;

    #[tokio::test]
    async fn test_create_booking() {
        let t = setup().await;
        let json = t.create_booking().await;

        assert_eq!(json["status"], "PENDING");
        assert_eq!(json["amount"], "5000.00");
        assert_eq!(json["amount_minor"], 500_000);
        assert_eq!(json["currency"], "INR");
        assert_eq!(json["visit_date"], "2024-06-01");
        assert_eq!(json["version"], 1);
        assert!(json["transaction_id"].as_str().is_some());
        assert!(json["payment_id"].is_null());
    }

    #[tokio::test]
    async fn test_confirm_pay_complete() {
        let t = setup().await;
        let created = t.create_booking().await;
        let id = created["id"].as_str().unwrap();
        let order_id = created["transaction_id"].as_str().unwrap();

        let (status, json) = t.post_action(id, "confirm", &t.seller).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "CONFIRMED");

        let (status, json) = t
            .send(
                "POST",
                &format!("/bookings/{id}/payment"),
                Some(&t.buyer),
                Some(signed_callback(order_id, "pay_http_1")),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{json}");
        assert_eq!(json["payment_id"], "pay_http_1");

        let (status, json) = t.post_action(id, "complete", &t.seller).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "COMPLETED");
        assert_eq!(json["version"], 4);

        let (status, json) = t
            .send("GET", &format!("/bookings/{id}"), Some(&t.buyer), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "COMPLETED");
    }

    #[tokio::test]
    async fn test_cancel_completed_is_conflict() {
        let t = setup().await;
        let created = t.create_booking().await;
        let id = created["id"].as_str().unwrap();
        let order_id = created["transaction_id"].as_str().unwrap();

        t.send(
            "POST",
            &format!("/bookings/{id}/payment"),
            Some(&t.buyer),
            Some(signed_callback(order_id, "pay_http_2")),
        )
        .await;
        let (status, _) = t.post_action(id, "complete", &t.seller).await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = t.post_action(id, "cancel", &t.buyer).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["kind"], "state");
    }

    #[tokio::test]
    async fn test_forged_payment_is_unprocessable() {
        let t = setup().await;
        let created = t.create_booking().await;
        let id = created["id"].as_str().unwrap();
        let order_id = created["transaction_id"].as_str().unwrap();

        let (status, json) = t
            .send(
                "POST",
                &format!("/bookings/{id}/payment"),
                Some(&t.buyer),
                Some(json!({
                    "order_id": order_id,
                    "payment_id": "pay_forged",
                    "signature": "00".repeat(32),
                    "success": true
                })),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["kind"], "payment_verification");

        let (_, json) = t
            .send("GET", &format!("/bookings/{id}"), Some(&t.buyer), None)
            .await;
        assert_eq!(json["status"], "PENDING");
        assert!(json["payment_id"].is_null());
    }

    #[tokio::test]
    async fn test_reject_then_listing() {
        let t = setup().await;
        let created = t.create_booking().await;
        let id = created["id"].as_str().unwrap();

        let (status, json) = t.post_action(id, "reject", &t.seller).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "REJECTED");

        let (status, json) = t.send("GET", "/bookings/seller", Some(&t.seller), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().unwrap().len(), 1);

        let (_, json) = t.send("GET", "/bookings/mine", Some(&t.buyer), None).await;
        assert_eq!(json[0]["id"], id);
    }
}

mod errors {
    use super::*;

    #[tokio::test]
    async fn test_seller_cannot_create() {
        let t = setup().await;
        let (status, json) = t
            .send(
                "POST",
                "/bookings",
                Some(&t.seller),
                Some(json!({ "property_id": t.property_id, "visit_date": "2024-06-01" })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["kind"], "authorization");
    }

    #[tokio::test]
    async fn test_missing_visit_date_is_bad_request() {
        let t = setup().await;
        let (status, json) = t
            .send(
                "POST",
                "/bookings",
                Some(&t.buyer),
                Some(json!({ "property_id": t.property_id })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["kind"], "validation");
    }

    #[tokio::test]
    async fn test_oversized_limit_is_bad_request() {
        let t = setup().await;
        let (status, json) = t
            .send(
                "GET",
                "/bookings?limit=18446744073709551615",
                Some(&t.admin),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["kind"], "validation");
    }

    #[tokio::test]
    async fn test_invalid_booking_id_format() {
        let t = setup().await;
        let (status, _) = t
            .send("GET", "/bookings/not-a-uuid", Some(&t.buyer), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_nonexistent_booking() {
        let t = setup().await;
        let (status, json) = t
            .send(
                "GET",
                &format!("/bookings/{}", uuid::Uuid::new_v4()),
                Some(&t.buyer),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["kind"], "not_found");
    }

    #[tokio::test]
    async fn test_admin_reads_but_cannot_confirm() {
        let t = setup().await;
        let created = t.create_booking().await;
        let id = created["id"].as_str().unwrap();

        let (status, json) = t
            .send("GET", "/bookings?status=PENDING", Some(&t.admin), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().unwrap().len(), 1);

        let (status, _) = t.send("GET", "/bookings", Some(&t.buyer), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, json) = t.post_action(id, "confirm", &t.admin).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["kind"], "authorization");

        let stored = t
            .state
            .lifecycle
            .store()
            .booking_count()
            .await;
        assert_eq!(stored, 1);
    }
}
