//! External collaborator ports and their adapters.

pub mod catalog;
pub mod notification;
pub mod payment;

pub use catalog::{InMemoryPropertyCatalog, PropertyCatalog, PropertyListing};
pub use notification::{BookingNotification, InMemoryNotifier, Notifier, TracingNotifier};
pub use payment::{
    GatewayOrder, InMemoryPaymentGateway, PaymentGateway, RazorpayGateway, SignatureVerifier,
};
