//! Shared types used across the booking workspace.

mod types;

pub use types::{BookingId, PropertyId, UserId, Version};
