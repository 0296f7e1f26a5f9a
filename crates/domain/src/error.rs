//! Validation and authorization error types.

use chrono::NaiveDate;
use common::{BookingId, PropertyId, UserId};
use thiserror::Error;

use crate::booking::Money;
use crate::guard::BookingAction;
use crate::identity::Role;

/// Malformed or missing input, or a request the current catalog state cannot satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The visit date was not supplied.
    #[error("Visit date is required")]
    MissingVisitDate,

    /// The property does not exist in the catalog.
    #[error("Property not found: {0}")]
    PropertyNotFound(PropertyId),

    /// The property exists but is not open for bookings.
    #[error("Property is not available for booking: {0}")]
    PropertyUnavailable(PropertyId),

    /// Amounts must be strictly positive.
    #[error("Invalid amount: {amount} (must be greater than 0)")]
    NonPositiveAmount { amount: Money },

    /// The amount is above what the payment gateway accepts.
    #[error("Amount {amount} exceeds maximum allowed amount of {limit}")]
    AmountExceedsLimit { amount: Money, limit: Money },

    /// The currency code is not a three letter ISO code.
    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),

    /// The free-text message is longer than allowed.
    #[error("Message is too long: {actual} characters (max {max})")]
    MessageTooLong { max: usize, actual: usize },

    /// The buyer already has an active booking for this property and date.
    #[error(
        "Buyer {buyer_id} already has an active booking for property {property_id} on {visit_date}"
    )]
    DuplicateBooking {
        buyer_id: UserId,
        property_id: PropertyId,
        visit_date: NaiveDate,
    },
}

/// The actor is not allowed to perform the requested action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizationError {
    /// The actor's role never grants this action.
    #[error("Role {role} may not {action}")]
    RoleNotPermitted { role: Role, action: BookingAction },

    /// The actor has the right role but does not own the booking.
    #[error("User {actor_id} may not {action} booking {booking_id}")]
    NotOwner {
        actor_id: UserId,
        booking_id: BookingId,
        action: BookingAction,
    },

    /// Admins have read access only.
    #[error("Admins have read-only access and may not {action}")]
    AdminReadOnly { action: BookingAction },
}

impl AuthorizationError {
    /// Returns the action that was denied.
    pub fn action(&self) -> BookingAction {
        match self {
            AuthorizationError::RoleNotPermitted { action, .. }
            | AuthorizationError::NotOwner { action, .. }
            | AuthorizationError::AdminReadOnly { action } => *action,
        }
    }
}
