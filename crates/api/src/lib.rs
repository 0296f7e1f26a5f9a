//! HTTP API server with observability for the property booking service.
//!
//! Provides REST endpoints for the booking lifecycle, bearer-token identity,
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod identity;
pub mod routes;
pub mod seed;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use booking_store::BookingStore;
use lifecycle::{
    BookingLifecycleManager, GatewayError, InMemoryPaymentGateway, InMemoryPropertyCatalog,
    LifecycleSettings, PaymentGateway, RazorpayGateway, SignatureVerifier, TracingNotifier,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::{DEV_PAYMENT_SECRET, PaymentConfig};
use identity::{IdentityProvider, InMemoryTokenRegistry};
use routes::bookings::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: BookingStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route("/bookings", post(routes::bookings::create::<S>))
        .route("/bookings", get(routes::bookings::list::<S>))
        .route("/bookings/mine", get(routes::bookings::mine::<S>))
        .route("/bookings/seller", get(routes::bookings::seller::<S>))
        .route("/bookings/{id}", get(routes::bookings::get::<S>))
        .route("/bookings/{id}/confirm", post(routes::bookings::confirm::<S>))
        .route("/bookings/{id}/reject", post(routes::bookings::reject::<S>))
        .route("/bookings/{id}/cancel", post(routes::bookings::cancel::<S>))
        .route(
            "/bookings/{id}/complete",
            post(routes::bookings::complete::<S>),
        )
        .route(
            "/bookings/{id}/payment",
            post(routes::bookings::attach_payment::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Builds the payment gateway: Razorpay when credentials are configured,
/// otherwise the in-memory gateway signing with [`DEV_PAYMENT_SECRET`].
pub fn build_gateway(config: &PaymentConfig) -> Result<Arc<dyn PaymentGateway>, GatewayError> {
    match config.credentials() {
        Some((key_id, key_secret)) => {
            tracing::info!(api_base = %config.api_base, "using Razorpay payment gateway");
            let gateway =
                RazorpayGateway::new(key_id, key_secret)?.with_api_base(config.api_base.clone());
            Ok(Arc::new(gateway))
        }
        None => {
            tracing::warn!("no payment credentials configured, using in-memory gateway");
            let verifier = SignatureVerifier::new(DEV_PAYMENT_SECRET)?;
            Ok(Arc::new(InMemoryPaymentGateway::new(verifier)))
        }
    }
}

/// Creates application state around a store, gateway and identity provider.
///
/// The property catalog is held in memory; callers add listings through
/// `state.lifecycle.catalog()`.
pub fn create_state<S: BookingStore + 'static>(
    store: S,
    gateway: Arc<dyn PaymentGateway>,
    identity: Arc<dyn IdentityProvider>,
    settings: LifecycleSettings,
) -> Arc<AppState<S>> {
    let lifecycle = BookingLifecycleManager::new(
        store,
        InMemoryPropertyCatalog::new(),
        gateway,
        TracingNotifier,
    )
    .with_settings(settings);

    Arc::new(AppState {
        lifecycle,
        identity,
    })
}

/// Creates the default application state with the in-memory gateway and
/// token registry.
pub fn create_default_state<S: BookingStore + 'static>(
    store: S,
) -> Result<(Arc<AppState<S>>, InMemoryTokenRegistry), GatewayError> {
    let tokens = InMemoryTokenRegistry::new();
    let gateway = build_gateway(&PaymentConfig::default())?;
    let state = create_state(
        store,
        gateway,
        Arc::new(tokens.clone()),
        LifecycleSettings::default(),
    );
    Ok((state, tokens))
}
