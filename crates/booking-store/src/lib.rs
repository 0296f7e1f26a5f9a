pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use common::{BookingId, Version};
pub use error::{Result, StoreError};
pub use memory::InMemoryBookingStore;
pub use postgres::PostgresBookingStore;
pub use query::BookingQuery;
pub use store::{BookingStore, BookingStoreExt, ExpectedState};
