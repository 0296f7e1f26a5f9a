//! Booking lifecycle orchestration.
//!
//! `BookingLifecycleManager` runs every booking operation against its
//! collaborators:
//! 1. Load the booking and authorize the actor
//! 2. Ask the `Booking` state machine for events
//! 3. Commit with compare-and-swap on the status and version read
//! 4. Update property availability and send notifications
//!
//! Failures in step 4 are logged and never fail a committed request.

pub mod error;
pub mod manager;
pub mod services;

pub use error::{
    CatalogError, GatewayError, LifecycleError, NotifyError, PaymentVerificationError, Result,
};
pub use manager::{BookingLifecycleManager, LifecycleSettings};
pub use services::{
    BookingNotification, GatewayOrder, InMemoryNotifier, InMemoryPaymentGateway,
    InMemoryPropertyCatalog, Notifier, PaymentGateway, PropertyCatalog, PropertyListing,
    RazorpayGateway, SignatureVerifier, TracingNotifier,
};
