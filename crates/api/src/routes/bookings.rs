//! Booking lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use booking_store::{BookingQuery, BookingStore};
use chrono::{DateTime, NaiveDate, Utc};
use common::{BookingId, PropertyId, UserId};
use domain::{
    AttachPayment, Booking, BookingStatus, CancelBooking, CompleteBooking, ConfirmBooking,
    CreateBooking, PaymentProof, RejectBooking,
};
use lifecycle::{BookingLifecycleManager, InMemoryPropertyCatalog, PaymentGateway, TracingNotifier};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::identity::{AuthenticatedActor, IdentityProvider};

/// Lifecycle manager as wired by the server.
pub type BookingLifecycle<S> = BookingLifecycleManager<
    S,
    InMemoryPropertyCatalog,
    Arc<dyn PaymentGateway>,
    TracingNotifier,
>;

/// Shared application state accessible from all handlers.
pub struct AppState<S: BookingStore> {
    pub lifecycle: BookingLifecycle<S>,
    pub identity: Arc<dyn IdentityProvider>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub property_id: String,
    pub visit_date: Option<NaiveDate>,
    pub message: Option<String>,
}

/// Gateway checkout callback values, forwarded by the client.
#[derive(Deserialize)]
pub struct PaymentCallbackRequest {
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub payment_id: String,
    #[serde(default)]
    pub signature: String,
    /// Advisory only.
    pub success: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ListBookingsParams {
    pub status: Option<BookingStatus>,
    pub property_id: Option<String>,
    pub buyer_id: Option<String>,
    pub seller_id: Option<String>,
    pub active_only: Option<bool>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

// -- Response types --

#[derive(Serialize)]
pub struct BookingResponse {
    pub id: String,
    pub property_id: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub status: String,
    pub amount: String,
    pub amount_minor: i64,
    pub currency: String,
    pub visit_date: NaiveDate,
    pub message: Option<String>,
    pub transaction_id: Option<String>,
    pub payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_modified_by: Option<String>,
    pub version: i64,
}

impl From<&Booking> for BookingResponse {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id().to_string(),
            property_id: booking.property_id().to_string(),
            buyer_id: booking.buyer_id().to_string(),
            seller_id: booking.seller_id().to_string(),
            status: booking.status().to_string(),
            amount: booking.amount().to_string(),
            amount_minor: booking.amount().minor(),
            currency: booking.currency().to_string(),
            visit_date: booking.visit_date(),
            message: booking.message().map(String::from),
            transaction_id: booking.transaction_id().map(String::from),
            payment_id: booking.payment_id().map(String::from),
            created_at: booking.created_at(),
            updated_at: booking.updated_at(),
            last_modified_by: booking.last_modified_by().map(|id| id.to_string()),
            version: booking.version().as_i64(),
        }
    }
}

fn to_responses(bookings: &[Booking]) -> Vec<BookingResponse> {
    bookings.iter().map(BookingResponse::from).collect()
}

// -- Handlers --

/// POST /bookings: request a visit to a property.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: BookingStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError> {
    let property_id = PropertyId::parse(&req.property_id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid property_id: {e}")))?;

    let booking = state
        .lifecycle
        .create(
            &actor,
            CreateBooking::new(property_id, req.visit_date, req.message),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(BookingResponse::from(&booking))))
}

/// GET /bookings/{id}: load one booking.
#[tracing::instrument(skip(state))]
pub async fn get<S: BookingStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking_id = parse_booking_id(&id)?;
    let booking = state.lifecycle.get_booking(&actor, booking_id).await?;
    Ok(Json(BookingResponse::from(&booking)))
}

/// GET /bookings: every booking matching the filters. Admins only.
#[tracing::instrument(skip(state))]
pub async fn list<S: BookingStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Query(params): Query<ListBookingsParams>,
) -> Result<Json<Vec<BookingResponse>>, ApiError> {
    let query = params.into_query()?;
    let bookings = state.lifecycle.all_bookings(&actor, query).await?;
    Ok(Json(to_responses(&bookings)))
}

/// GET /bookings/mine: the caller's own bookings.
#[tracing::instrument(skip(state))]
pub async fn mine<S: BookingStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> Result<Json<Vec<BookingResponse>>, ApiError> {
    let bookings = state.lifecycle.buyer_bookings(&actor).await?;
    Ok(Json(to_responses(&bookings)))
}

/// GET /bookings/seller: bookings on the caller's properties.
#[tracing::instrument(skip(state))]
pub async fn seller<S: BookingStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> Result<Json<Vec<BookingResponse>>, ApiError> {
    let bookings = state.lifecycle.seller_bookings(&actor).await?;
    Ok(Json(to_responses(&bookings)))
}

/// POST /bookings/{id}/confirm
#[tracing::instrument(skip(state))]
pub async fn confirm<S: BookingStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking_id = parse_booking_id(&id)?;
    let booking = state
        .lifecycle
        .confirm(&actor, ConfirmBooking::new(booking_id))
        .await?;
    Ok(Json(BookingResponse::from(&booking)))
}

/// POST /bookings/{id}/reject
#[tracing::instrument(skip(state))]
pub async fn reject<S: BookingStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking_id = parse_booking_id(&id)?;
    let booking = state
        .lifecycle
        .reject(&actor, RejectBooking::new(booking_id))
        .await?;
    Ok(Json(BookingResponse::from(&booking)))
}

/// POST /bookings/{id}/cancel
#[tracing::instrument(skip(state))]
pub async fn cancel<S: BookingStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking_id = parse_booking_id(&id)?;
    let booking = state
        .lifecycle
        .cancel(&actor, CancelBooking::new(booking_id))
        .await?;
    Ok(Json(BookingResponse::from(&booking)))
}

/// POST /bookings/{id}/complete
#[tracing::instrument(skip(state))]
pub async fn complete<S: BookingStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking_id = parse_booking_id(&id)?;
    let booking = state
        .lifecycle
        .complete(&actor, CompleteBooking::new(booking_id))
        .await?;
    Ok(Json(BookingResponse::from(&booking)))
}

/// POST /bookings/{id}/payment: attach a gateway checkout callback.
#[tracing::instrument(skip(state, req))]
pub async fn attach_payment<S: BookingStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<String>,
    Json(req): Json<PaymentCallbackRequest>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking_id = parse_booking_id(&id)?;
    let cmd = AttachPayment::new(
        booking_id,
        PaymentProof::new(req.order_id, req.payment_id, req.signature),
    )
    .with_client_reported_success(req.success);

    let booking = state.lifecycle.attach_payment(&actor, cmd).await?;
    Ok(Json(BookingResponse::from(&booking)))
}

impl ListBookingsParams {
    fn into_query(self) -> Result<BookingQuery, ApiError> {
        let mut query = BookingQuery::new();
        if let Some(status) = self.status {
            query = query.status(status);
        }
        if let Some(id) = self.property_id {
            query = query.property(parse_id(&id, "property_id", PropertyId::parse)?);
        }
        if let Some(id) = self.buyer_id {
            query = query.buyer(parse_id(&id, "buyer_id", UserId::parse)?);
        }
        if let Some(id) = self.seller_id {
            query = query.seller(parse_id(&id, "seller_id", UserId::parse)?);
        }
        if self.active_only.unwrap_or(false) {
            query = query.active_only();
        }
        if let Some(limit) = self.limit {
            query = query.limit(page_bound(limit, "limit")?);
        }
        if let Some(offset) = self.offset {
            query = query.offset(page_bound(offset, "offset")?);
        }
        Ok(query)
    }
}

/// Paging values must fit a signed 64-bit SQL bound.
fn page_bound(value: usize, field: &str) -> Result<usize, ApiError> {
    i64::try_from(value)
        .map(|_| value)
        .map_err(|_| ApiError::BadRequest(format!("Invalid {field}: {value} is too large")))
}

fn parse_id<T>(
    value: &str,
    field: &str,
    parse: fn(&str) -> Result<T, uuid::Error>,
) -> Result<T, ApiError> {
    parse(value).map_err(|e| ApiError::BadRequest(format!("Invalid {field}: {e}")))
}

fn parse_booking_id(id: &str) -> Result<BookingId, ApiError> {
    BookingId::parse(id).map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_params_build_query() {
        let property = PropertyId::new();
        let params = ListBookingsParams {
            status: Some(BookingStatus::Confirmed),
            property_id: Some(property.to_string()),
            active_only: Some(true),
            limit: Some(10),
            ..Default::default()
        };

        let query = params.into_query().unwrap();
        assert_eq!(query.status, Some(BookingStatus::Confirmed));
        assert_eq!(query.property_id, Some(property));
        assert!(query.active_only);
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.offset, None);
    }

    #[test]
    fn test_list_params_reject_oversized_paging() {
        let params = ListBookingsParams {
            limit: Some(usize::MAX),
            ..Default::default()
        };
        assert!(matches!(params.into_query(), Err(ApiError::BadRequest(_))));

        let params = ListBookingsParams {
            offset: Some(i64::MAX as usize + 1),
            ..Default::default()
        };
        assert!(matches!(params.into_query(), Err(ApiError::BadRequest(_))));

        let params = ListBookingsParams {
            limit: Some(i64::MAX as usize),
            ..Default::default()
        };
        assert!(params.into_query().is_ok());
    }

    #[test]
    fn test_list_params_reject_bad_ids() {
        let params = ListBookingsParams {
            buyer_id: Some("not-a-uuid".to_string()),
            ..Default::default()
        };
        assert!(matches!(params.into_query(), Err(ApiError::BadRequest(_))));
    }
}
