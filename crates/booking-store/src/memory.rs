use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use domain::{Booking, BookingParts};
use tokio::sync::RwLock;

use crate::{
    BookingId, BookingQuery, Result, StoreError, Version,
    store::{BookingStore, ExpectedState},
};

/// In-memory booking store implementation for tests and local runs.
///
/// Provides the same guarantees as the PostgreSQL implementation: inserts
/// enforce one active booking per buyer, property and date, and updates are
/// compare-and-swap under a single write lock.
#[derive(Clone, Default)]
pub struct InMemoryBookingStore {
    bookings: Arc<RwLock<HashMap<BookingId, Booking>>>,
}

impl InMemoryBookingStore {
    /// Creates a new empty in-memory booking store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of bookings stored.
    pub async fn booking_count(&self) -> usize {
        self.bookings.read().await.len()
    }

    /// Clears all bookings.
    pub async fn clear(&self) {
        self.bookings.write().await.clear();
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn insert(&self, booking: &Booking) -> Result<Booking> {
        let mut store = self.bookings.write().await;

        if store.contains_key(&booking.id()) {
            return Err(StoreError::AlreadyExists(booking.id()));
        }

        if booking.status().is_active() {
            let duplicate = store.values().any(|existing| {
                existing.status().is_active()
                    && existing.buyer_id() == booking.buyer_id()
                    && existing.property_id() == booking.property_id()
                    && existing.visit_date() == booking.visit_date()
            });
            if duplicate {
                return Err(StoreError::DuplicateActive {
                    buyer_id: booking.buyer_id(),
                    property_id: booking.property_id(),
                    visit_date: booking.visit_date(),
                });
            }
        }

        let mut stored = booking.clone();
        stored.set_version(Version::first());
        store.insert(stored.id(), stored.clone());

        Ok(stored)
    }

    async fn get(&self, id: BookingId) -> Result<Option<Booking>> {
        Ok(self.bookings.read().await.get(&id).cloned())
    }

    async fn compare_and_swap(
        &self,
        expected: ExpectedState,
        booking: &Booking,
    ) -> Result<Booking> {
        let mut store = self.bookings.write().await;

        let current = store
            .get(&booking.id())
            .ok_or(StoreError::NotFound(booking.id()))?;

        if current.status() != expected.status || current.version() != expected.version {
            return Err(StoreError::Conflict {
                booking_id: booking.id(),
                expected_status: expected.status,
                expected_version: expected.version,
                actual_status: current.status(),
                actual_version: current.version(),
            });
        }

        // Only mutable columns move; identity, price and date stay as stored.
        let update = BookingParts::from(booking.clone());
        let mut parts = BookingParts::from(current.clone());
        parts.status = update.status;
        parts.payment_id = update.payment_id;
        parts.payment_signature = update.payment_signature;
        parts.updated_at = update.updated_at;
        parts.last_modified_by = update.last_modified_by;
        parts.version = expected.version.next();

        let stored = Booking::from(parts);
        store.insert(stored.id(), stored.clone());

        Ok(stored)
    }

    async fn query(&self, query: BookingQuery) -> Result<Vec<Booking>> {
        let store = self.bookings.read().await;
        let mut bookings: Vec<_> = store
            .values()
            .filter(|booking| query.matches(booking))
            .cloned()
            .collect();

        bookings.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id()))
        });

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(bookings.into_iter().skip(offset).take(limit).collect())
    }
}
