//! Booking lifecycle manager.

use std::future::Future;
use std::time::Instant;

use booking_store::{BookingQuery, BookingStore, BookingStoreExt, ExpectedState};
use chrono::Utc;
use common::BookingId;
use domain::{
    Actor, AttachPayment, AuthorizationGuard, Booking, BookingAction, BookingError, BookingEvent,
    BookingRequestedData, BookingStatus, CancelBooking, CompleteBooking, ConfirmBooking,
    CreateBooking, Currency, Money, RejectBooking, ValidationError,
};

use crate::error::{LifecycleError, PaymentVerificationError, Result};
use crate::services::{BookingNotification, Notifier, PaymentGateway, PropertyCatalog};

/// Limits applied when creating bookings.
#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    /// Currency gateway orders are created in.
    pub currency: Currency,

    /// Largest amount the gateway accepts.
    pub max_amount: Money,

    /// Longest buyer message, in characters.
    pub max_message_len: usize,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            currency: Currency::inr(),
            max_amount: Money::from_major(100_000),
            max_message_len: 1000,
        }
    }
}

/// Runs every booking operation: load, authorize, decide, compare-and-swap,
/// then side effects.
///
/// The acting identity is passed into each call. Mutations are committed with
/// a compare-and-swap on the status and version that were read, so a
/// concurrent writer makes the slower call fail with `Conflict` rather than
/// overwrite. Catalog updates and notifications run only after a successful
/// write and never fail the request.
pub struct BookingLifecycleManager<S, C, P, N>
where
    S: BookingStore,
    C: PropertyCatalog,
    P: PaymentGateway,
    N: Notifier,
{
    store: S,
    catalog: C,
    gateway: P,
    notifier: N,
    guard: AuthorizationGuard,
    settings: LifecycleSettings,
}

impl<S, C, P, N> BookingLifecycleManager<S, C, P, N>
where
    S: BookingStore,
    C: PropertyCatalog,
    P: PaymentGateway,
    N: Notifier,
{
    /// Creates a new lifecycle manager with default settings.
    pub fn new(store: S, catalog: C, gateway: P, notifier: N) -> Self {
        Self {
            store,
            catalog,
            gateway,
            notifier,
            guard: AuthorizationGuard::new(),
            settings: LifecycleSettings::default(),
        }
    }

    /// Replaces the creation limits.
    pub fn with_settings(mut self, settings: LifecycleSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn gateway(&self) -> &P {
        &self.gateway
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn settings(&self) -> &LifecycleSettings {
        &self.settings
    }

    /// Creates a pending booking for the listed price of a property.
    ///
    /// Only buyers may create bookings. A gateway order for the amount is
    /// created up front and its id stored as the booking's transaction id.
    #[tracing::instrument(skip(self))]
    pub async fn create(&self, actor: &Actor, cmd: CreateBooking) -> Result<Booking> {
        observe("create", self.create_inner(actor, cmd)).await
    }

    async fn create_inner(&self, actor: &Actor, cmd: CreateBooking) -> Result<Booking> {
        self.guard.authorize_create(actor)?;

        let visit_date = cmd.visit_date.ok_or(ValidationError::MissingVisitDate)?;
        let message = self.validate_message(cmd.message)?;

        let listing = self
            .catalog
            .find(cmd.property_id)
            .await?
            .ok_or(ValidationError::PropertyNotFound(cmd.property_id))?;
        if !listing.is_available {
            return Err(ValidationError::PropertyUnavailable(cmd.property_id).into());
        }

        let amount = listing.price;
        if !amount.is_positive() {
            return Err(ValidationError::NonPositiveAmount { amount }.into());
        }
        if amount > self.settings.max_amount {
            return Err(ValidationError::AmountExceedsLimit {
                amount,
                limit: self.settings.max_amount,
            }
            .into());
        }

        // Checked again atomically on insert; this avoids a wasted gateway order.
        if self
            .store
            .find_active(actor.id, cmd.property_id, visit_date)
            .await?
            .is_some()
        {
            return Err(ValidationError::DuplicateBooking {
                buyer_id: actor.id,
                property_id: cmd.property_id,
                visit_date,
            }
            .into());
        }

        let order = self
            .gateway
            .create_order(
                amount,
                &self.settings.currency,
                &format!("booking_{}", cmd.booking_id),
            )
            .await?;

        let data = BookingRequestedData {
            booking_id: cmd.booking_id,
            property_id: listing.id,
            buyer_id: actor.id,
            seller_id: listing.seller_id,
            amount,
            currency: order.currency,
            visit_date,
            message,
            transaction_id: Some(order.order_id),
            requested_at: Utc::now(),
        };
        let booking = self.store.insert(&Booking::requested(&data)).await?;

        metrics::counter!("booking_transitions_total", "event" => "BookingRequested")
            .increment(1);
        tracing::info!(
            booking_id = %booking.id(),
            property_id = %booking.property_id(),
            amount = %booking.amount(),
            "booking requested"
        );

        self.notify(&booking, &[BookingEvent::BookingRequested(data)])
            .await;

        Ok(booking)
    }

    /// Seller accepts a pending booking.
    #[tracing::instrument(skip(self))]
    pub async fn confirm(&self, actor: &Actor, cmd: ConfirmBooking) -> Result<Booking> {
        observe(
            "confirm",
            self.transition(actor, cmd.booking_id, BookingAction::Confirm, |b| {
                b.confirm(actor.id)
            }),
        )
        .await
    }

    /// Seller declines a pending booking.
    #[tracing::instrument(skip(self))]
    pub async fn reject(&self, actor: &Actor, cmd: RejectBooking) -> Result<Booking> {
        observe(
            "reject",
            self.transition(actor, cmd.booking_id, BookingAction::Reject, |b| {
                b.reject(actor.id)
            }),
        )
        .await
    }

    /// Buyer or owning seller cancels a booking. Idempotent once cancelled.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, actor: &Actor, cmd: CancelBooking) -> Result<Booking> {
        observe(
            "cancel",
            self.transition(actor, cmd.booking_id, BookingAction::Cancel, |b| {
                b.cancel(actor.id)
            }),
        )
        .await
    }

    /// Seller finishes a confirmed, paid booking.
    #[tracing::instrument(skip(self))]
    pub async fn complete(&self, actor: &Actor, cmd: CompleteBooking) -> Result<Booking> {
        observe(
            "complete",
            self.transition(actor, cmd.booking_id, BookingAction::Complete, |b| {
                b.complete(actor.id)
            }),
        )
        .await
    }

    /// Verifies a gateway callback and attaches the payment.
    ///
    /// The callback's order id must be the booking's transaction id and the
    /// signature must verify; both are checked before the booking's status is
    /// looked at. The client's own success flag is only logged.
    #[tracing::instrument(skip(self, cmd), fields(booking_id = %cmd.booking_id))]
    pub async fn attach_payment(&self, actor: &Actor, cmd: AttachPayment) -> Result<Booking> {
        observe("attach_payment", self.attach_payment_inner(actor, cmd)).await
    }

    async fn attach_payment_inner(&self, actor: &Actor, cmd: AttachPayment) -> Result<Booking> {
        let current = self.load(cmd.booking_id).await?;
        self.guard
            .authorize(actor, BookingAction::AttachPayment, &current)?;

        let proof = &cmd.proof;
        for (field, value) in [
            ("order_id", &proof.order_id),
            ("payment_id", &proof.payment_id),
            ("signature", &proof.signature),
        ] {
            if value.trim().is_empty() {
                return Err(PaymentVerificationError::MissingField(field).into());
            }
        }

        let expected_order = current
            .transaction_id()
            .ok_or(PaymentVerificationError::MissingOrder(current.id()))?;
        if expected_order != proof.order_id {
            metrics::counter!("payment_verifications_total", "outcome" => "order_mismatch")
                .increment(1);
            tracing::warn!(
                booking_id = %current.id(),
                received = %proof.order_id,
                "payment callback for a different order"
            );
            return Err(PaymentVerificationError::OrderMismatch {
                expected: expected_order.to_string(),
                received: proof.order_id.clone(),
            }
            .into());
        }

        if let Some(reported) = cmd.client_reported_success {
            tracing::debug!(client_reported_success = reported, "advisory client flag");
        }

        if !self
            .gateway
            .verify_callback(&proof.order_id, &proof.payment_id, &proof.signature)
        {
            metrics::counter!("payment_verifications_total", "outcome" => "rejected").increment(1);
            tracing::warn!(
                booking_id = %current.id(),
                payment_id = %proof.payment_id,
                "payment signature rejected"
            );
            return Err(PaymentVerificationError::SignatureMismatch {
                order_id: proof.order_id.clone(),
                payment_id: proof.payment_id.clone(),
            }
            .into());
        }
        metrics::counter!("payment_verifications_total", "outcome" => "verified").increment(1);

        let events = current.attach_payment(proof, actor.id)?;
        self.ensure_property_free(&current, &events).await?;
        self.commit(current, events).await
    }

    /// Returns a booking the actor may view.
    #[tracing::instrument(skip(self))]
    pub async fn get_booking(&self, actor: &Actor, booking_id: BookingId) -> Result<Booking> {
        observe("get_booking", async {
            let booking = self.load(booking_id).await?;
            self.guard.authorize(actor, BookingAction::View, &booking)?;
            Ok::<_, LifecycleError>(booking)
        })
        .await
    }

    /// Returns the actor's own bookings, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn buyer_bookings(&self, actor: &Actor) -> Result<Vec<Booking>> {
        observe("buyer_bookings", async {
            self.guard
                .authorize_listing(actor, BookingAction::ListOwn)?;
            Ok::<_, LifecycleError>(self.store.bookings_for_buyer(actor.id).await?)
        })
        .await
    }

    /// Returns bookings on the acting seller's properties, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn seller_bookings(&self, actor: &Actor) -> Result<Vec<Booking>> {
        observe("seller_bookings", async {
            self.guard
                .authorize_listing(actor, BookingAction::ListSeller)?;
            Ok::<_, LifecycleError>(self.store.bookings_for_seller(actor.id).await?)
        })
        .await
    }

    /// Returns bookings matching `query`. Admins only.
    #[tracing::instrument(skip(self))]
    pub async fn all_bookings(&self, actor: &Actor, query: BookingQuery) -> Result<Vec<Booking>> {
        observe("all_bookings", async {
            self.guard
                .authorize_listing(actor, BookingAction::ListAll)?;
            Ok::<_, LifecycleError>(self.store.query(query).await?)
        })
        .await
    }

    async fn load(&self, booking_id: BookingId) -> Result<Booking> {
        self.store
            .get(booking_id)
            .await?
            .ok_or(LifecycleError::NotFound(booking_id))
    }

    fn validate_message(&self, message: Option<String>) -> Result<Option<String>> {
        let Some(message) = message else {
            return Ok(None);
        };
        let message = message.trim();
        if message.is_empty() {
            return Ok(None);
        }

        let actual = message.chars().count();
        if actual > self.settings.max_message_len {
            return Err(ValidationError::MessageTooLong {
                max: self.settings.max_message_len,
                actual,
            }
            .into());
        }
        Ok(Some(message.to_string()))
    }

    async fn transition<F>(
        &self,
        actor: &Actor,
        booking_id: BookingId,
        action: BookingAction,
        decide: F,
    ) -> Result<Booking>
    where
        F: FnOnce(&Booking) -> std::result::Result<Vec<BookingEvent>, BookingError> + Send,
    {
        let current = self.load(booking_id).await?;
        self.guard.authorize(actor, action, &current)?;
        let events = decide(&current)?;
        self.ensure_property_free(&current, &events).await?;
        self.commit(current, events).await
    }

    /// Refuses to confirm a booking while another booking on the same
    /// property is confirmed.
    async fn ensure_property_free(&self, current: &Booking, events: &[BookingEvent]) -> Result<()> {
        let confirms = current.status() == BookingStatus::Pending
            && events
                .iter()
                .any(|event| matches!(event, BookingEvent::BookingConfirmed(_)));
        if !confirms {
            return Ok(());
        }

        let taken = self
            .store
            .confirmed_on_property(current.property_id())
            .await?
            .iter()
            .any(|other| other.id() != current.id());
        if taken {
            return Err(ValidationError::PropertyUnavailable(current.property_id()).into());
        }
        Ok(())
    }

    /// Writes the decided events with compare-and-swap, then runs side effects.
    async fn commit(&self, current: Booking, events: Vec<BookingEvent>) -> Result<Booking> {
        if events.is_empty() {
            tracing::debug!(booking_id = %current.id(), status = %current.status(), "no change");
            return Ok(current);
        }

        let expected = ExpectedState::of(&current);
        let previous = current.status();
        let mut next = current;
        next.apply_events(events.iter().cloned());

        let stored = self.store.compare_and_swap(expected, &next).await?;

        for event in &events {
            metrics::counter!("booking_transitions_total", "event" => event.event_type())
                .increment(1);
        }
        tracing::info!(
            booking_id = %stored.id(),
            from = %previous,
            to = %stored.status(),
            version = %stored.version(),
            "booking updated"
        );

        self.sync_availability(previous, &stored).await;
        self.notify(&stored, &events).await;

        Ok(stored)
    }

    async fn sync_availability(&self, previous: BookingStatus, booking: &Booking) {
        let available = match (previous, booking.status()) {
            (BookingStatus::Pending, BookingStatus::Confirmed) => false,
            (BookingStatus::Confirmed, BookingStatus::Cancelled | BookingStatus::Rejected) => true,
            _ => return,
        };

        if available {
            match self
                .store
                .confirmed_on_property(booking.property_id())
                .await
            {
                Ok(others) if others.iter().any(|other| other.id() != booking.id()) => {
                    tracing::debug!(
                        property_id = %booking.property_id(),
                        "property still has a confirmed booking"
                    );
                    return;
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(
                        booking_id = %booking.id(),
                        property_id = %booking.property_id(),
                        error = %err,
                        "failed to check other confirmed bookings"
                    );
                    return;
                }
            }
        }

        if let Err(err) = self
            .catalog
            .set_availability(booking.property_id(), available)
            .await
        {
            tracing::warn!(
                booking_id = %booking.id(),
                property_id = %booking.property_id(),
                available,
                error = %err,
                "failed to update property availability"
            );
        }
    }

    async fn notify(&self, booking: &Booking, events: &[BookingEvent]) {
        for event in events {
            let notification = BookingNotification::new(booking, event);
            if let Err(err) = self.notifier.notify(&notification).await {
                tracing::warn!(
                    booking_id = %booking.id(),
                    event_type = event.event_type(),
                    error = %err,
                    "failed to deliver booking notification"
                );
            }
        }
    }
}

/// Records duration and error metrics around one operation.
async fn observe<T>(operation: &'static str, fut: impl Future<Output = Result<T>>) -> Result<T> {
    let start = Instant::now();
    let result = fut.await;

    metrics::histogram!("booking_operation_duration_seconds", "operation" => operation)
        .record(start.elapsed().as_secs_f64());

    if let Err(err) = &result {
        metrics::counter!("booking_operation_errors_total", "kind" => err.kind()).increment(1);
        if matches!(err, LifecycleError::Conflict { .. }) {
            metrics::counter!("booking_conflicts_total").increment(1);
        }
        tracing::warn!(operation, kind = err.kind(), error = %err, "booking operation failed");
    }

    result
}
