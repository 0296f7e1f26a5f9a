//! Booking notifications.
//!
//! Every committed booking event is turned into a `BookingNotification` for
//! the buyer and the seller. Delivery is best effort.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BookingId, PropertyId, UserId};
use domain::{Booking, BookingEvent, BookingStatus};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::NotifyError;

/// A message about one booking event, addressed to both parties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingNotification {
    pub booking_id: BookingId,
    pub property_id: PropertyId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub event_type: String,
    pub status: BookingStatus,
    pub occurred_at: DateTime<Utc>,
}

impl BookingNotification {
    /// Builds the notification for `event` as committed on `booking`.
    pub fn new(booking: &Booking, event: &BookingEvent) -> Self {
        Self {
            booking_id: booking.id(),
            property_id: booking.property_id(),
            buyer_id: booking.buyer_id(),
            seller_id: booking.seller_id(),
            event_type: event.event_type().to_string(),
            status: booking.status(),
            occurred_at: event.occurred_at(),
        }
    }

    /// Users who should receive this notification.
    pub fn recipients(&self) -> [UserId; 2] {
        [self.buyer_id, self.seller_id]
    }

    /// One-line subject for the message.
    pub fn subject(&self) -> String {
        match self.event_type.as_str() {
            "BookingRequested" => format!("New booking request {}", self.booking_id),
            _ => format!("Booking {} is now {}", self.booking_id, self.status),
        }
    }
}

/// Trait for delivering booking notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &BookingNotification) -> Result<(), NotifyError>;
}

/// Notifier that writes every notification to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, notification: &BookingNotification) -> Result<(), NotifyError> {
        tracing::info!(
            booking_id = %notification.booking_id,
            recipients = ?notification.recipients(),
            event_type = %notification.event_type,
            status = %notification.status,
            subject = %notification.subject(),
            "booking notification"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryNotifierState {
    sent: Vec<BookingNotification>,
    fail: bool,
}

/// Notifier that records notifications, for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    state: Arc<RwLock<InMemoryNotifierState>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every delivery fail.
    pub async fn set_fail(&self, fail: bool) {
        self.state.write().await.fail = fail;
    }

    /// Returns everything delivered so far.
    pub async fn sent(&self) -> Vec<BookingNotification> {
        self.state.read().await.sent.clone()
    }

    /// Returns the event types delivered for one booking, in order.
    pub async fn event_types_for(&self, booking_id: BookingId) -> Vec<String> {
        self.state
            .read()
            .await
            .sent
            .iter()
            .filter(|n| n.booking_id == booking_id)
            .map(|n| n.event_type.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn notify(&self, notification: &BookingNotification) -> Result<(), NotifyError> {
        let mut state = self.state.write().await;
        if state.fail {
            return Err(NotifyError("mailbox unavailable".to_string()));
        }
        state.sent.push(notification.clone());
        Ok(())
    }
}
