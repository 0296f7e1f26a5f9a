//! Booking record and its transition decisions.

use chrono::{DateTime, NaiveDate, Utc};
use common::{BookingId, PropertyId, UserId, Version};
use serde::{Deserialize, Serialize};

use super::{
    BookingError, BookingEvent, BookingRequestedData, BookingStatus, ConfirmationSource, Currency,
    Money, PaymentProof,
};

/// Booking aggregate root.
///
/// A buyer's request to visit a property, carried from creation through
/// seller decision, payment and completion. Decision methods take `&self`
/// and return the events to apply; they never mutate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    id: BookingId,
    property_id: PropertyId,
    buyer_id: UserId,

    /// Owner of the property at request time.
    seller_id: UserId,
    status: BookingStatus,

    /// Listed price at request time. Never changes after creation.
    amount: Money,
    currency: Currency,
    visit_date: NaiveDate,
    message: Option<String>,

    /// Gateway order id created for this booking.
    transaction_id: Option<String>,
    payment_id: Option<String>,
    payment_signature: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_modified_by: Option<UserId>,

    /// Store version for compare-and-swap.
    #[serde(default)]
    version: Version,
}

/// Plain field bag used by storage backends to rebuild a `Booking`.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingParts {
    pub id: BookingId,
    pub property_id: PropertyId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub status: BookingStatus,
    pub amount: Money,
    pub currency: Currency,
    pub visit_date: NaiveDate,
    pub message: Option<String>,
    pub transaction_id: Option<String>,
    pub payment_id: Option<String>,
    pub payment_signature: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_modified_by: Option<UserId>,
    pub version: Version,
}

impl From<BookingParts> for Booking {
    fn from(parts: BookingParts) -> Self {
        Self {
            id: parts.id,
            property_id: parts.property_id,
            buyer_id: parts.buyer_id,
            seller_id: parts.seller_id,
            status: parts.status,
            amount: parts.amount,
            currency: parts.currency,
            visit_date: parts.visit_date,
            message: parts.message,
            transaction_id: parts.transaction_id,
            payment_id: parts.payment_id,
            payment_signature: parts.payment_signature,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
            last_modified_by: parts.last_modified_by,
            version: parts.version,
        }
    }
}

impl From<Booking> for BookingParts {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id,
            property_id: booking.property_id,
            buyer_id: booking.buyer_id,
            seller_id: booking.seller_id,
            status: booking.status,
            amount: booking.amount,
            currency: booking.currency,
            visit_date: booking.visit_date,
            message: booking.message,
            transaction_id: booking.transaction_id,
            payment_id: booking.payment_id,
            payment_signature: booking.payment_signature,
            created_at: booking.created_at,
            updated_at: booking.updated_at,
            last_modified_by: booking.last_modified_by,
            version: booking.version,
        }
    }
}

// Query methods
impl Booking {
    /// Builds a new, not yet stored, pending booking from its request event.
    pub fn requested(data: &BookingRequestedData) -> Self {
        Self {
            id: data.booking_id,
            property_id: data.property_id,
            buyer_id: data.buyer_id,
            seller_id: data.seller_id,
            status: BookingStatus::Pending,
            amount: data.amount,
            currency: data.currency.clone(),
            visit_date: data.visit_date,
            message: data.message.clone(),
            transaction_id: data.transaction_id.clone(),
            payment_id: None,
            payment_signature: None,
            created_at: data.requested_at,
            updated_at: data.requested_at,
            last_modified_by: Some(data.buyer_id),
            version: Version::initial(),
        }
    }

    pub fn id(&self) -> BookingId {
        self.id
    }

    pub fn property_id(&self) -> PropertyId {
        self.property_id
    }

    pub fn buyer_id(&self) -> UserId {
        self.buyer_id
    }

    pub fn seller_id(&self) -> UserId {
        self.seller_id
    }

    pub fn status(&self) -> BookingStatus {
        self.status
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn visit_date(&self) -> NaiveDate {
        self.visit_date
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction_id.as_deref()
    }

    pub fn payment_id(&self) -> Option<&str> {
        self.payment_id.as_deref()
    }

    pub fn payment_signature(&self) -> Option<&str> {
        self.payment_signature.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn last_modified_by(&self) -> Option<UserId> {
        self.last_modified_by
    }

    /// Returns the store version this copy was read at.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Sets the store version. Called by storage after a successful write.
    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    /// Returns true if a verified payment is attached.
    pub fn is_paid(&self) -> bool {
        self.payment_id.is_some()
    }

    /// Returns true if the booking is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// Decision methods (return events)
impl Booking {
    /// Seller accepts the request.
    pub fn confirm(&self, by: UserId) -> Result<Vec<BookingEvent>, BookingError> {
        if !self.status.can_confirm() {
            return Err(self.invalid("confirm"));
        }

        Ok(vec![BookingEvent::confirmed(by, ConfirmationSource::Seller)])
    }

    /// Seller declines the request.
    pub fn reject(&self, by: UserId) -> Result<Vec<BookingEvent>, BookingError> {
        if !self.status.can_reject() {
            return Err(self.invalid("reject"));
        }

        Ok(vec![BookingEvent::rejected(by)])
    }

    /// Buyer or seller withdraws the booking.
    ///
    /// Cancelling an already cancelled booking is a no-op.
    pub fn cancel(&self, by: UserId) -> Result<Vec<BookingEvent>, BookingError> {
        if self.status == BookingStatus::Cancelled {
            return Ok(vec![]);
        }

        if !self.status.can_cancel() {
            return Err(self.invalid("cancel"));
        }

        Ok(vec![BookingEvent::cancelled(by, self.status)])
    }

    /// Attaches a payment whose signature the caller has already verified.
    ///
    /// A pending booking becomes confirmed. Re-delivering the payment that is
    /// already attached is a no-op, including after completion.
    pub fn attach_payment(
        &self,
        proof: &PaymentProof,
        by: UserId,
    ) -> Result<Vec<BookingEvent>, BookingError> {
        if let Some(existing) = self.payment_id.as_deref() {
            if existing == proof.payment_id {
                return Ok(vec![]);
            }
            return Err(BookingError::PaymentAlreadyAttached {
                booking_id: self.id,
                existing: existing.to_string(),
            });
        }

        if !self.status.accepts_payment() {
            return Err(self.invalid("attach payment"));
        }

        let mut events = vec![BookingEvent::payment_attached(by, proof)];
        if self.status == BookingStatus::Pending {
            events.push(BookingEvent::confirmed(by, ConfirmationSource::Payment));
        }
        Ok(events)
    }

    /// Seller finishes a confirmed, paid booking.
    pub fn complete(&self, by: UserId) -> Result<Vec<BookingEvent>, BookingError> {
        if !self.status.can_complete() {
            return Err(self.invalid("complete"));
        }

        if !self.is_paid() {
            return Err(BookingError::PaymentMissing {
                booking_id: self.id,
            });
        }

        Ok(vec![BookingEvent::completed(by)])
    }

    fn invalid(&self, action: &'static str) -> BookingError {
        BookingError::InvalidStateTransition {
            current: self.status,
            action,
        }
    }
}

// Apply event helpers
impl Booking {
    /// Applies an event, updating status, payment and audit fields.
    pub fn apply(&mut self, event: BookingEvent) {
        self.updated_at = event.occurred_at();
        self.last_modified_by = Some(event.actor_id());

        match event {
            BookingEvent::BookingRequested(data) => {
                let version = self.version;
                *self = Self::requested(&data);
                self.version = version;
            }
            BookingEvent::BookingConfirmed(_) => {
                self.status = BookingStatus::Confirmed;
            }
            BookingEvent::BookingRejected(_) => {
                self.status = BookingStatus::Rejected;
            }
            BookingEvent::BookingCancelled(_) => {
                self.status = BookingStatus::Cancelled;
            }
            BookingEvent::PaymentAttached(data) => {
                self.payment_id = Some(data.payment_id);
                self.payment_signature = Some(data.signature);
            }
            BookingEvent::BookingCompleted(_) => {
                self.status = BookingStatus::Completed;
            }
        }
    }

    /// Applies multiple events in sequence.
    pub fn apply_events(&mut self, events: impl IntoIterator<Item = BookingEvent>) {
        for event in events {
            self.apply(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> Booking {
        Booking::requested(&BookingRequestedData {
            booking_id: BookingId::new(),
            property_id: PropertyId::new(),
            buyer_id: UserId::new(),
            seller_id: UserId::new(),
            amount: Money::from_major(5000),
            currency: Currency::inr(),
            visit_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            message: Some("Weekend visit".to_string()),
            transaction_id: Some("order_abc".to_string()),
            requested_at: Utc::now(),
        })
    }

    fn proof(payment_id: &str) -> PaymentProof {
        PaymentProof::new("order_abc", payment_id, "sig")
    }

    #[test]
    fn test_requested_booking_is_pending_and_unstored() {
        let booking = pending();
        assert_eq!(booking.status(), BookingStatus::Pending);
        assert_eq!(booking.version(), Version::initial());
        assert_eq!(booking.amount(), Money::from_major(5000));
        assert!(!booking.is_paid());
        assert_eq!(booking.last_modified_by(), Some(booking.buyer_id()));
    }

    #[test]
    fn test_confirm_pending() {
        let mut booking = pending();
        let seller = booking.seller_id();
        booking.apply_events(booking.confirm(seller).unwrap());
        assert_eq!(booking.status(), BookingStatus::Confirmed);
        assert_eq!(booking.last_modified_by(), Some(seller));
    }

    #[test]
    fn test_reject_pending() {
        let mut booking = pending();
        booking.apply_events(booking.reject(booking.seller_id()).unwrap());
        assert_eq!(booking.status(), BookingStatus::Rejected);
        assert!(booking.is_terminal());
    }

    #[test]
    fn test_confirm_twice_fails() {
        let mut booking = pending();
        booking.apply_events(booking.confirm(booking.seller_id()).unwrap());
        let result = booking.confirm(booking.seller_id());
        assert!(matches!(
            result,
            Err(BookingError::InvalidStateTransition {
                current: BookingStatus::Confirmed,
                action: "confirm"
            })
        ));
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut booking = pending();
        booking.apply_events(booking.cancel(booking.buyer_id()).unwrap());
        assert_eq!(booking.status(), BookingStatus::Cancelled);

        let events = booking.cancel(booking.buyer_id()).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_cancel_records_previous_status() {
        let mut booking = pending();
        booking.apply_events(booking.confirm(booking.seller_id()).unwrap());
        let events = booking.cancel(booking.buyer_id()).unwrap();
        match &events[..] {
            [BookingEvent::BookingCancelled(data)] => {
                assert_eq!(data.previous_status, BookingStatus::Confirmed);
            }
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[test]
    fn test_payment_on_pending_confirms() {
        let mut booking = pending();
        let events = booking
            .attach_payment(&proof("pay_1"), booking.buyer_id())
            .unwrap();
        assert_eq!(events.len(), 2);
        booking.apply_events(events);
        assert_eq!(booking.status(), BookingStatus::Confirmed);
        assert_eq!(booking.payment_id(), Some("pay_1"));
        assert_eq!(booking.payment_signature(), Some("sig"));
    }

    #[test]
    fn test_payment_on_confirmed_keeps_status() {
        let mut booking = pending();
        booking.apply_events(booking.confirm(booking.seller_id()).unwrap());
        let events = booking
            .attach_payment(&proof("pay_1"), booking.buyer_id())
            .unwrap();
        assert_eq!(events.len(), 1);
        booking.apply_events(events);
        assert_eq!(booking.status(), BookingStatus::Confirmed);
        assert!(booking.is_paid());
    }

    #[test]
    fn test_same_payment_twice_is_noop() {
        let mut booking = pending();
        booking.apply_events(
            booking
                .attach_payment(&proof("pay_1"), booking.buyer_id())
                .unwrap(),
        );
        let events = booking
            .attach_payment(&proof("pay_1"), booking.buyer_id())
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_different_payment_is_rejected() {
        let mut booking = pending();
        booking.apply_events(
            booking
                .attach_payment(&proof("pay_1"), booking.buyer_id())
                .unwrap(),
        );
        let result = booking.attach_payment(&proof("pay_2"), booking.buyer_id());
        assert!(matches!(
            result,
            Err(BookingError::PaymentAlreadyAttached { ref existing, .. }) if existing == "pay_1"
        ));
    }

    #[test]
    fn test_payment_on_cancelled_fails() {
        let mut booking = pending();
        booking.apply_events(booking.cancel(booking.buyer_id()).unwrap());
        let result = booking.attach_payment(&proof("pay_1"), booking.buyer_id());
        assert!(matches!(
            result,
            Err(BookingError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_complete_requires_payment() {
        let mut booking = pending();
        booking.apply_events(booking.confirm(booking.seller_id()).unwrap());
        let result = booking.complete(booking.seller_id());
        assert!(matches!(result, Err(BookingError::PaymentMissing { .. })));
    }

    #[test]
    fn test_complete_pending_fails_on_status_first() {
        let booking = pending();
        let result = booking.complete(booking.seller_id());
        assert!(matches!(
            result,
            Err(BookingError::InvalidStateTransition {
                current: BookingStatus::Pending,
                ..
            })
        ));
    }

    #[test]
    fn test_full_lifecycle() {
        let mut booking = pending();
        let seller = booking.seller_id();
        let buyer = booking.buyer_id();

        booking.apply_events(booking.confirm(seller).unwrap());
        booking.apply_events(booking.attach_payment(&proof("pay_1"), buyer).unwrap());
        booking.apply_events(booking.complete(seller).unwrap());

        assert_eq!(booking.status(), BookingStatus::Completed);
        assert_eq!(booking.payment_id(), Some("pay_1"));
        assert_eq!(booking.amount(), Money::from_major(5000));

        assert!(booking.cancel(buyer).is_err());
        assert!(
            booking
                .attach_payment(&proof("pay_1"), buyer)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_parts_roundtrip_preserves_everything() {
        let mut booking = pending();
        booking.set_version(Version::new(3));
        let parts = BookingParts::from(booking.clone());
        assert_eq!(Booking::from(parts), booking);
    }
}
