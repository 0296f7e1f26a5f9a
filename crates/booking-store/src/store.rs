use async_trait::async_trait;
use chrono::NaiveDate;
use common::{PropertyId, UserId};
use domain::{Booking, BookingStatus};

use crate::{BookingId, BookingQuery, Result, StoreError, Version};

/// The state a writer read and expects to still be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedState {
    pub status: BookingStatus,
    pub version: Version,
}

impl ExpectedState {
    pub fn new(status: BookingStatus, version: Version) -> Self {
        Self { status, version }
    }

    /// Captures the state of a booking as loaded.
    pub fn of(booking: &Booking) -> Self {
        Self {
            status: booking.status(),
            version: booking.version(),
        }
    }
}

/// Core trait for booking store implementations.
///
/// Stores persist the current state of each booking. Updates are
/// compare-and-swap on `(status, version)` so two writers that read the same
/// state cannot both succeed. All implementations must be thread-safe.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Stores a new booking and returns it at `Version::first()`.
    ///
    /// Fails with `DuplicateActive` if the buyer already holds an active
    /// booking for the same property and visit date.
    async fn insert(&self, booking: &Booking) -> Result<Booking>;

    /// Retrieves a booking by id.
    async fn get(&self, id: BookingId) -> Result<Option<Booking>>;

    /// Writes the mutable fields of `booking` if the stored status and
    /// version still equal `expected`.
    ///
    /// Only status, payment fields and audit fields are written. Returns the
    /// stored booking at the next version, or `Conflict` if another writer
    /// got there first.
    async fn compare_and_swap(&self, expected: ExpectedState, booking: &Booking)
    -> Result<Booking>;

    /// Retrieves bookings matching a query, newest first.
    async fn query(&self, query: BookingQuery) -> Result<Vec<Booking>>;
}

/// Extension trait providing convenience methods for booking stores.
#[async_trait]
pub trait BookingStoreExt: BookingStore {
    /// Retrieves a booking, failing with `NotFound` if it does not exist.
    async fn get_required(&self, id: BookingId) -> Result<Booking> {
        self.get(id).await?.ok_or(StoreError::NotFound(id))
    }

    /// Finds the buyer's active booking for a property and date, if any.
    async fn find_active(
        &self,
        buyer_id: UserId,
        property_id: PropertyId,
        visit_date: NaiveDate,
    ) -> Result<Option<Booking>> {
        let bookings = self
            .query(
                BookingQuery::for_buyer(buyer_id)
                    .property(property_id)
                    .active_only(),
            )
            .await?;
        Ok(bookings
            .into_iter()
            .find(|booking| booking.visit_date() == visit_date))
    }

    /// Lists the confirmed bookings on a property.
    async fn confirmed_on_property(&self, property_id: PropertyId) -> Result<Vec<Booking>> {
        self.query(
            BookingQuery::new()
                .property(property_id)
                .status(BookingStatus::Confirmed),
        )
        .await
    }

    /// Lists all bookings made by a buyer.
    async fn bookings_for_buyer(&self, buyer_id: UserId) -> Result<Vec<Booking>> {
        self.query(BookingQuery::for_buyer(buyer_id)).await
    }

    /// Lists all bookings on a seller's properties.
    async fn bookings_for_seller(&self, seller_id: UserId) -> Result<Vec<Booking>> {
        self.query(BookingQuery::for_seller(seller_id)).await
    }
}

// Blanket implementation for all BookingStore implementations
impl<T: BookingStore + ?Sized> BookingStoreExt for T {}
