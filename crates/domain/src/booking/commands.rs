//! Booking commands.
//!
//! Commands carry only what the caller asks for. The acting user is never
//! part of a command; it travels separately as the request's `Actor`.

use chrono::NaiveDate;
use common::{BookingId, PropertyId};
use serde::{Deserialize, Serialize};

/// Command to request a visit/booking for a property.
#[derive(Debug, Clone)]
pub struct CreateBooking {
    /// The booking ID to create.
    pub booking_id: BookingId,

    /// The property being booked.
    pub property_id: PropertyId,

    /// Requested visit date; required.
    pub visit_date: Option<NaiveDate>,

    /// Optional note for the seller.
    pub message: Option<String>,
}

impl CreateBooking {
    /// Creates a new CreateBooking command with a generated booking ID.
    pub fn new(
        property_id: PropertyId,
        visit_date: Option<NaiveDate>,
        message: Option<String>,
    ) -> Self {
        Self {
            booking_id: BookingId::new(),
            property_id,
            visit_date,
            message,
        }
    }
}

/// Command for the owning seller to accept a pending booking.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmBooking {
    pub booking_id: BookingId,
}

impl ConfirmBooking {
    /// Creates a new ConfirmBooking command.
    pub fn new(booking_id: BookingId) -> Self {
        Self { booking_id }
    }
}

/// Command for the owning seller to decline a pending booking.
#[derive(Debug, Clone, Copy)]
pub struct RejectBooking {
    pub booking_id: BookingId,
}

impl RejectBooking {
    /// Creates a new RejectBooking command.
    pub fn new(booking_id: BookingId) -> Self {
        Self { booking_id }
    }
}

/// Command for the buyer or owning seller to withdraw a booking.
#[derive(Debug, Clone, Copy)]
pub struct CancelBooking {
    pub booking_id: BookingId,
}

impl CancelBooking {
    /// Creates a new CancelBooking command.
    pub fn new(booking_id: BookingId) -> Self {
        Self { booking_id }
    }
}

/// Command for the owning seller to finish a paid booking.
#[derive(Debug, Clone, Copy)]
pub struct CompleteBooking {
    pub booking_id: BookingId,
}

impl CompleteBooking {
    /// Creates a new CompleteBooking command.
    pub fn new(booking_id: BookingId) -> Self {
        Self { booking_id }
    }
}

/// The three values a payment gateway callback hands back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentProof {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

impl PaymentProof {
    /// Creates a new payment proof.
    pub fn new(
        order_id: impl Into<String>,
        payment_id: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            payment_id: payment_id.into(),
            signature: signature.into(),
        }
    }
}

/// Command carrying a payment callback for a booking.
#[derive(Debug, Clone)]
pub struct AttachPayment {
    pub booking_id: BookingId,
    pub proof: PaymentProof,

    /// What the client claims the gateway reported. Logged only; the
    /// signature is always re-verified server-side.
    pub client_reported_success: Option<bool>,
}

impl AttachPayment {
    /// Creates a new AttachPayment command.
    pub fn new(booking_id: BookingId, proof: PaymentProof) -> Self {
        Self {
            booking_id,
            proof,
            client_reported_success: None,
        }
    }

    /// Records the client's advisory success flag.
    pub fn with_client_reported_success(mut self, success: Option<bool>) -> Self {
        self.client_reported_success = success;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_booking_generates_id() {
        let property_id = PropertyId::new();
        let first = CreateBooking::new(property_id, None, None);
        let second = CreateBooking::new(property_id, None, None);
        assert_ne!(first.booking_id, second.booking_id);
        assert_eq!(first.property_id, property_id);
    }

    #[test]
    fn test_attach_payment_defaults_to_no_client_flag() {
        let cmd = AttachPayment::new(
            BookingId::new(),
            PaymentProof::new("order_1", "pay_1", "sig"),
        );
        assert_eq!(cmd.client_reported_success, None);

        let cmd = cmd.with_client_reported_success(Some(true));
        assert_eq!(cmd.client_reported_success, Some(true));
        assert_eq!(cmd.proof.payment_id, "pay_1");
    }
}
