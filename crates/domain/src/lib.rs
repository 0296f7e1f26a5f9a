//! Domain layer for the property booking service.
//!
//! This crate provides the pure booking lifecycle rules:
//! - `Booking` record with the state machine that decides transitions
//! - `BookingEvent` facts produced by those decisions
//! - `Actor`/`Role` request identity and the `AuthorizationGuard`
//! - Validation and authorization error types

pub mod booking;
pub mod error;
pub mod guard;
pub mod identity;

pub use booking::{
    AttachPayment, Booking, BookingCancelledData, BookingCompletedData, BookingConfirmedData,
    BookingError, BookingEvent, BookingParts, BookingRejectedData, BookingRequestedData,
    BookingStatus, CancelBooking, CompleteBooking, ConfirmBooking, ConfirmationSource,
    CreateBooking, Currency, Money, PaymentAttachedData, PaymentProof, RejectBooking,
};
pub use common::{BookingId, PropertyId, UserId, Version};
pub use error::{AuthorizationError, ValidationError};
pub use guard::{
    AdminPolicy, AuthorizationGuard, BookingAction, BuyerPolicy, Grant, RolePolicy, SellerPolicy,
};
pub use identity::{Actor, Role};
