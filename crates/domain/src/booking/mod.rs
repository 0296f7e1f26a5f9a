//! Booking aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod state;
mod value_objects;

pub use aggregate::{Booking, BookingParts};
pub use commands::*;
pub use events::{
    BookingCancelledData, BookingCompletedData, BookingConfirmedData, BookingEvent,
    BookingRejectedData, BookingRequestedData, ConfirmationSource, PaymentAttachedData,
};
pub use state::BookingStatus;
pub use value_objects::{Currency, Money};

use common::BookingId;
use thiserror::Error;

/// Errors raised when a booking decision is not allowed in its current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingError {
    /// The booking is not in a state that allows the action.
    #[error("Invalid state transition: cannot {action} a booking in {current} state")]
    InvalidStateTransition {
        current: BookingStatus,
        action: &'static str,
    },

    /// Completion needs a verified payment.
    #[error("Booking {booking_id} has no verified payment")]
    PaymentMissing { booking_id: BookingId },

    /// A different payment is already attached.
    #[error("Booking {booking_id} already has payment {existing} attached")]
    PaymentAlreadyAttached {
        booking_id: BookingId,
        existing: String,
    },
}
