//! Property catalog port and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{PropertyId, UserId};
use domain::Money;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::CatalogError;

/// What the lifecycle needs to know about a listed property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyListing {
    pub id: PropertyId,
    pub seller_id: UserId,
    pub title: String,

    /// Listed price; copied onto bookings at creation.
    pub price: Money,
    pub is_available: bool,
}

impl PropertyListing {
    /// Creates an available listing with a generated id.
    pub fn new(seller_id: UserId, title: impl Into<String>, price: Money) -> Self {
        Self {
            id: PropertyId::new(),
            seller_id,
            title: title.into(),
            price,
            is_available: true,
        }
    }
}

/// Trait for property lookups and availability updates.
#[async_trait]
pub trait PropertyCatalog: Send + Sync {
    /// Looks up a property by id.
    async fn find(&self, id: PropertyId) -> Result<Option<PropertyListing>, CatalogError>;

    /// Marks a property as open or closed for bookings.
    async fn set_availability(&self, id: PropertyId, available: bool) -> Result<(), CatalogError>;
}

#[derive(Debug, Default)]
struct InMemoryCatalogState {
    listings: HashMap<PropertyId, PropertyListing>,
    fail_on_update: bool,
}

/// In-memory property catalog for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPropertyCatalog {
    state: Arc<RwLock<InMemoryCatalogState>>,
}

impl InMemoryPropertyCatalog {
    /// Creates a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a listing.
    pub async fn add(&self, listing: PropertyListing) {
        self.state
            .write()
            .await
            .listings
            .insert(listing.id, listing);
    }

    /// Configures availability updates to fail.
    pub async fn set_fail_on_update(&self, fail: bool) {
        self.state.write().await.fail_on_update = fail;
    }

    /// Returns true if the property exists and is available.
    pub async fn is_available(&self, id: PropertyId) -> bool {
        self.state
            .read()
            .await
            .listings
            .get(&id)
            .is_some_and(|listing| listing.is_available)
    }
}

#[async_trait]
impl PropertyCatalog for InMemoryPropertyCatalog {
    async fn find(&self, id: PropertyId) -> Result<Option<PropertyListing>, CatalogError> {
        Ok(self.state.read().await.listings.get(&id).cloned())
    }

    async fn set_availability(&self, id: PropertyId, available: bool) -> Result<(), CatalogError> {
        let mut state = self.state.write().await;

        if state.fail_on_update {
            return Err(CatalogError::Unavailable(
                "catalog rejected update".to_string(),
            ));
        }

        let listing = state
            .listings
            .get_mut(&id)
            .ok_or(CatalogError::PropertyNotFound(id))?;
        listing.is_available = available;
        Ok(())
    }
}
