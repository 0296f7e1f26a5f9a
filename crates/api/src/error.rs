//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lifecycle::LifecycleError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// No usable identity on the request.
    Unauthorized(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Lifecycle operation failure.
    Lifecycle(LifecycleError),
}

impl ApiError {
    /// Returns the error kind reported in the response body.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "unauthenticated",
            ApiError::BadRequest(_) => "validation",
            ApiError::Lifecycle(err) => err.kind(),
        }
    }

    /// Returns true if the client may retry the same request.
    pub fn retryable(&self) -> bool {
        match self {
            ApiError::Unauthorized(_) | ApiError::BadRequest(_) => false,
            ApiError::Lifecycle(err) => err.is_retryable(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let retryable = self.retryable();
        let (status, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Lifecycle(err) => lifecycle_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message, "kind": kind, "retryable": retryable });
        (status, axum::Json(body)).into_response()
    }
}

fn lifecycle_error_to_response(err: LifecycleError) -> (StatusCode, String) {
    let status = match &err {
        LifecycleError::Validation(_) => StatusCode::BAD_REQUEST,
        LifecycleError::Authorization(_) => StatusCode::FORBIDDEN,
        LifecycleError::NotFound(_) => StatusCode::NOT_FOUND,
        LifecycleError::State(_) | LifecycleError::Conflict { .. } => StatusCode::CONFLICT,
        LifecycleError::PaymentVerification(_) => StatusCode::UNPROCESSABLE_ENTITY,
        LifecycleError::Gateway(_) | LifecycleError::Catalog(_) => StatusCode::BAD_GATEWAY,
        LifecycleError::Store(_) => {
            tracing::error!(error = %err, "booking store failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string())
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        ApiError::Lifecycle(err)
    }
}
