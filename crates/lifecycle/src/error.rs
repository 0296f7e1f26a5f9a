//! Lifecycle error types.

use booking_store::StoreError;
use common::{BookingId, PropertyId};
use domain::{AuthorizationError, BookingError, BookingStatus, ValidationError};
use thiserror::Error;

/// Reasons a payment callback was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentVerificationError {
    /// The HMAC over `order_id|payment_id` did not match the signature.
    #[error("Payment signature is invalid for order {order_id} and payment {payment_id}")]
    SignatureMismatch { order_id: String, payment_id: String },

    /// The callback refers to a different gateway order than the booking.
    #[error("Callback order {received} does not match booking order {expected}")]
    OrderMismatch { expected: String, received: String },

    /// The booking was created without a gateway order.
    #[error("Booking {0} has no gateway order to verify against")]
    MissingOrder(BookingId),

    /// A callback field was empty.
    #[error("Payment callback field '{0}' is required")]
    MissingField(&'static str),
}

/// Failures talking to the payment gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The HTTP request could not be completed.
    #[error("Gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The gateway answered with a non-success status.
    #[error("Gateway rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The gateway answered with something we could not use.
    #[error("Invalid gateway response: {0}")]
    InvalidResponse(String),

    /// The gateway is configured unusably.
    #[error("Gateway misconfigured: {0}")]
    Configuration(String),

    /// The gateway refused to create the order.
    #[error("Gateway unavailable: {0}")]
    Unavailable(String),
}

impl GatewayError {
    /// Returns true if the same request may succeed later.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Transport(_) | GatewayError::Unavailable(_) => true,
            GatewayError::Rejected { status, .. } => *status >= 500 || *status == 429,
            GatewayError::InvalidResponse(_) | GatewayError::Configuration(_) => false,
        }
    }
}

/// Failures talking to the property catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The property to update does not exist.
    #[error("Property not found in catalog: {0}")]
    PropertyNotFound(PropertyId),

    /// The catalog could not be reached or refused the request.
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),
}

/// A notification could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Errors that can occur during booking lifecycle operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Malformed input or a request the catalog cannot satisfy.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The actor may not perform this action on this booking.
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    /// The booking's status does not allow the action.
    #[error(transparent)]
    State(#[from] BookingError),

    /// Another writer changed the booking between read and write.
    #[error("Booking {booking_id} was modified concurrently: expected {expected}, found {actual}")]
    Conflict {
        booking_id: BookingId,
        expected: BookingStatus,
        actual: BookingStatus,
    },

    /// The payment callback could not be verified.
    #[error(transparent)]
    PaymentVerification(#[from] PaymentVerificationError),

    /// No booking with this id.
    #[error("Booking not found: {0}")]
    NotFound(BookingId),

    /// Storage infrastructure failure.
    #[error("Booking store error: {0}")]
    Store(StoreError),

    /// Payment gateway infrastructure failure.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Property catalog infrastructure failure.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl From<StoreError> for LifecycleError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict {
                booking_id,
                expected_status,
                actual_status,
                ..
            } => LifecycleError::Conflict {
                booking_id,
                expected: expected_status,
                actual: actual_status,
            },
            StoreError::NotFound(id) => LifecycleError::NotFound(id),
            StoreError::DuplicateActive {
                buyer_id,
                property_id,
                visit_date,
            } => LifecycleError::Validation(ValidationError::DuplicateBooking {
                buyer_id,
                property_id,
                visit_date,
            }),
            other => LifecycleError::Store(other),
        }
    }
}

impl LifecycleError {
    /// Returns a stable name for the error category.
    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleError::Validation(_) => "validation",
            LifecycleError::Authorization(_) => "authorization",
            LifecycleError::State(_) => "state",
            LifecycleError::Conflict { .. } => "conflict",
            LifecycleError::PaymentVerification(_) => "payment_verification",
            LifecycleError::NotFound(_) => "not_found",
            LifecycleError::Store(_) => "store",
            LifecycleError::Gateway(_) => "gateway",
            LifecycleError::Catalog(_) => "catalog",
        }
    }

    /// Returns true if re-reading and retrying the request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            LifecycleError::Conflict { .. } => true,
            LifecycleError::Store(StoreError::Database(_)) => true,
            LifecycleError::Gateway(err) => err.is_retryable(),
            LifecycleError::Catalog(CatalogError::Unavailable(_)) => true,
            _ => false,
        }
    }
}

/// Convenience type alias for lifecycle results.
pub type Result<T> = std::result::Result<T, LifecycleError>;
