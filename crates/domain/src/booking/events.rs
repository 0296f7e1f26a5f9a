//! Booking domain events.

use chrono::{DateTime, NaiveDate, Utc};
use common::{BookingId, PropertyId, UserId};
use serde::{Deserialize, Serialize};

use super::{BookingStatus, Currency, Money};

/// Facts produced by booking decisions.
///
/// Decisions on `Booking` return these; applying them yields the next
/// record state, and the lifecycle layer fans them out to notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum BookingEvent {
    /// A buyer requested a visit.
    BookingRequested(BookingRequestedData),

    /// The booking was accepted, by the seller or by a verified payment.
    BookingConfirmed(BookingConfirmedData),

    /// The seller declined the booking.
    BookingRejected(BookingRejectedData),

    /// The buyer or seller withdrew the booking.
    BookingCancelled(BookingCancelledData),

    /// A verified payment was attached.
    PaymentAttached(PaymentAttachedData),

    /// The seller marked the booking as completed.
    BookingCompleted(BookingCompletedData),
}

impl BookingEvent {
    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            BookingEvent::BookingRequested(_) => "BookingRequested",
            BookingEvent::BookingConfirmed(_) => "BookingConfirmed",
            BookingEvent::BookingRejected(_) => "BookingRejected",
            BookingEvent::BookingCancelled(_) => "BookingCancelled",
            BookingEvent::PaymentAttached(_) => "PaymentAttached",
            BookingEvent::BookingCompleted(_) => "BookingCompleted",
        }
    }

    /// Returns the user the event is attributed to.
    pub fn actor_id(&self) -> UserId {
        match self {
            BookingEvent::BookingRequested(data) => data.buyer_id,
            BookingEvent::BookingConfirmed(data) => data.confirmed_by,
            BookingEvent::BookingRejected(data) => data.rejected_by,
            BookingEvent::BookingCancelled(data) => data.cancelled_by,
            BookingEvent::PaymentAttached(data) => data.attached_by,
            BookingEvent::BookingCompleted(data) => data.completed_by,
        }
    }

    /// Returns when the event happened.
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            BookingEvent::BookingRequested(data) => data.requested_at,
            BookingEvent::BookingConfirmed(data) => data.confirmed_at,
            BookingEvent::BookingRejected(data) => data.rejected_at,
            BookingEvent::BookingCancelled(data) => data.cancelled_at,
            BookingEvent::PaymentAttached(data) => data.attached_at,
            BookingEvent::BookingCompleted(data) => data.completed_at,
        }
    }

    pub(crate) fn confirmed(by: UserId, source: ConfirmationSource) -> Self {
        BookingEvent::BookingConfirmed(BookingConfirmedData {
            confirmed_by: by,
            source,
            confirmed_at: Utc::now(),
        })
    }

    pub(crate) fn rejected(by: UserId) -> Self {
        BookingEvent::BookingRejected(BookingRejectedData {
            rejected_by: by,
            rejected_at: Utc::now(),
        })
    }

    pub(crate) fn cancelled(by: UserId, previous_status: BookingStatus) -> Self {
        BookingEvent::BookingCancelled(BookingCancelledData {
            cancelled_by: by,
            previous_status,
            cancelled_at: Utc::now(),
        })
    }

    pub(crate) fn payment_attached(by: UserId, proof: &super::PaymentProof) -> Self {
        BookingEvent::PaymentAttached(PaymentAttachedData {
            order_id: proof.order_id.clone(),
            payment_id: proof.payment_id.clone(),
            signature: proof.signature.clone(),
            attached_by: by,
            attached_at: Utc::now(),
        })
    }

    pub(crate) fn completed(by: UserId) -> Self {
        BookingEvent::BookingCompleted(BookingCompletedData {
            completed_by: by,
            completed_at: Utc::now(),
        })
    }
}

/// Data for BookingRequested event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRequestedData {
    pub booking_id: BookingId,
    pub property_id: PropertyId,
    pub buyer_id: UserId,
    pub seller_id: UserId,

    /// Listed price of the property at request time.
    pub amount: Money,
    pub currency: Currency,
    pub visit_date: NaiveDate,
    pub message: Option<String>,

    /// Gateway order created for this booking.
    pub transaction_id: Option<String>,
    pub requested_at: DateTime<Utc>,
}

/// What caused a booking to become confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationSource {
    /// The owning seller accepted the request.
    Seller,

    /// A verified payment arrived while the booking was pending.
    Payment,
}

/// Data for BookingConfirmed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingConfirmedData {
    pub confirmed_by: UserId,
    pub source: ConfirmationSource,
    pub confirmed_at: DateTime<Utc>,
}

/// Data for BookingRejected event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRejectedData {
    pub rejected_by: UserId,
    pub rejected_at: DateTime<Utc>,
}

/// Data for BookingCancelled event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingCancelledData {
    pub cancelled_by: UserId,

    /// Status the booking had before cancellation.
    pub previous_status: BookingStatus,
    pub cancelled_at: DateTime<Utc>,
}

/// Data for PaymentAttached event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentAttachedData {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
    pub attached_by: UserId,
    pub attached_at: DateTime<Utc>,
}

/// Data for BookingCompleted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingCompletedData {
    pub completed_by: UserId,
    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_names() {
        let by = UserId::new();
        assert_eq!(
            BookingEvent::confirmed(by, ConfirmationSource::Seller).event_type(),
            "BookingConfirmed"
        );
        assert_eq!(BookingEvent::rejected(by).event_type(), "BookingRejected");
        assert_eq!(
            BookingEvent::cancelled(by, BookingStatus::Pending).event_type(),
            "BookingCancelled"
        );
        assert_eq!(BookingEvent::completed(by).event_type(), "BookingCompleted");
    }

    #[test]
    fn test_actor_attribution() {
        let by = UserId::new();
        assert_eq!(BookingEvent::rejected(by).actor_id(), by);
        assert_eq!(
            BookingEvent::cancelled(by, BookingStatus::Confirmed).actor_id(),
            by
        );
    }

    #[test]
    fn test_serialization_is_tagged() {
        let event = BookingEvent::completed(UserId::new());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "BookingCompleted");
        assert!(json["data"]["completed_by"].is_string());

        let back: BookingEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
