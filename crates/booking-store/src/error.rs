use chrono::NaiveDate;
use domain::BookingStatus;
use thiserror::Error;

use crate::{BookingId, Version};
use common::{PropertyId, UserId};

/// Errors that can occur when interacting with the booking store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The stored booking no longer matches what the writer read.
    #[error(
        "Concurrent update on booking {booking_id}: expected {expected_status}@{expected_version}, found {actual_status}@{actual_version}"
    )]
    Conflict {
        booking_id: BookingId,
        expected_status: BookingStatus,
        expected_version: Version,
        actual_status: BookingStatus,
        actual_version: Version,
    },

    /// The booking was not found in the store.
    #[error("Booking not found: {0}")]
    NotFound(BookingId),

    /// A booking with this id is already stored.
    #[error("Booking already exists: {0}")]
    AlreadyExists(BookingId),

    /// The buyer already holds an active booking for the same property and date.
    #[error(
        "Active booking already exists for buyer {buyer_id} on property {property_id} for {visit_date}"
    )]
    DuplicateActive {
        buyer_id: UserId,
        property_id: PropertyId,
        visit_date: NaiveDate,
    },

    /// A stored row could not be turned back into a booking.
    #[error("Corrupt booking row: {0}")]
    Decode(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Returns true for compare-and-swap losses.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Result type for booking store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
