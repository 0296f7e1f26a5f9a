//! Request identity.
//!
//! Handlers take an [`AuthenticatedActor`] argument. It reads the
//! `Authorization: Bearer <token>` header and resolves the token through the
//! state's [`IdentityProvider`] into the `Actor` passed to the lifecycle.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use booking_store::BookingStore;
use domain::Actor;
use tokio::sync::RwLock;

use crate::error::ApiError;
use crate::routes::bookings::AppState;

/// Resolves bearer tokens to actors.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns the actor a token belongs to, or `None` if it is unknown.
    async fn resolve(&self, token: &str) -> Option<Actor>;
}

/// Token table kept in memory. Stands in for the external auth service.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTokenRegistry {
    tokens: Arc<RwLock<HashMap<String, Actor>>>,
}

impl InMemoryTokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates `token` with `actor`, replacing any previous owner.
    pub async fn register(&self, token: impl Into<String>, actor: Actor) {
        self.tokens.write().await.insert(token.into(), actor);
    }

    /// Issues a fresh random token for `actor`.
    pub async fn issue(&self, actor: Actor) -> String {
        let token = uuid::Uuid::new_v4().simple().to_string();
        self.register(token.clone(), actor).await;
        token
    }

    pub async fn revoke(&self, token: &str) {
        self.tokens.write().await.remove(token);
    }
}

#[async_trait]
impl IdentityProvider for InMemoryTokenRegistry {
    async fn resolve(&self, token: &str) -> Option<Actor> {
        self.tokens.read().await.get(token).copied()
    }
}

/// Returns the token from an `Authorization` header value.
fn bearer_token(header: &str) -> Result<&str, ApiError> {
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| {
            ApiError::Unauthorized("Invalid authorization format. Expected 'Bearer <token>'".into())
        })?
        .trim();

    if token.is_empty() {
        return Err(ApiError::Unauthorized("Empty bearer token".into()));
    }
    Ok(token)
}

/// The actor behind the current request.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedActor(pub Actor);

impl<S> FromRequestParts<Arc<AppState<S>>> for AuthenticatedActor
where
    S: BookingStore + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing authorization header".into()))?;
        let token = bearer_token(header)?;

        match state.identity.resolve(token).await {
            Some(actor) => Ok(Self(actor)),
            None => {
                metrics::counter!("http_unauthenticated_requests_total").increment(1);
                tracing::debug!("unknown bearer token");
                Err(ApiError::Unauthorized("Unknown or expired token".into()))
            }
        }
    }
}
