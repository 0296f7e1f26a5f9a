//! Demo data for local runs.

use booking_store::BookingStore;
use common::PropertyId;
use domain::{Actor, Money, UserId};
use lifecycle::PropertyListing;

use crate::identity::InMemoryTokenRegistry;
use crate::routes::bookings::AppState;

pub const DEMO_BUYER_TOKEN: &str = "demo-buyer";
pub const DEMO_SELLER_TOKEN: &str = "demo-seller";
pub const DEMO_ADMIN_TOKEN: &str = "demo-admin";

/// Registers one user per role and a few listings owned by the demo seller.
///
/// Returns the ids of the seeded properties.
pub async fn seed_demo_data<S: BookingStore>(
    state: &AppState<S>,
    tokens: &InMemoryTokenRegistry,
) -> Vec<PropertyId> {
    let seller = Actor::seller(UserId::new());
    tokens.register(DEMO_BUYER_TOKEN, Actor::buyer(UserId::new())).await;
    tokens.register(DEMO_SELLER_TOKEN, seller).await;
    tokens.register(DEMO_ADMIN_TOKEN, Actor::admin(UserId::new())).await;

    let listings = [
        ("2BHK apartment, Indiranagar", 25_000),
        ("Sea-facing villa, Alibaug", 90_000),
        ("Studio near metro, Powai", 8_500),
    ];

    let mut ids = Vec::with_capacity(listings.len());
    for (title, price) in listings {
        let listing = PropertyListing::new(seller.id, title, Money::from_major(price));
        ids.push(listing.id);
        state.lifecycle.catalog().add(listing).await;
    }

    tracing::info!(
        buyer_token = DEMO_BUYER_TOKEN,
        seller_token = DEMO_SELLER_TOKEN,
        admin_token = DEMO_ADMIN_TOKEN,
        properties = ?ids,
        "seeded demo data"
    );
    ids
}
