use domain::{Booking, BookingStatus};
use common::{PropertyId, UserId};

/// Builder for constructing booking queries.
///
/// Results are always ordered newest first by creation time.
#[derive(Debug, Clone, Default)]
pub struct BookingQuery {
    /// Filter by buyer.
    pub buyer_id: Option<UserId>,

    /// Filter by owning seller.
    pub seller_id: Option<UserId>,

    /// Filter by property.
    pub property_id: Option<PropertyId>,

    /// Filter by exact status.
    pub status: Option<BookingStatus>,

    /// Only bookings that are not cancelled or rejected.
    pub active_only: bool,

    /// Maximum number of bookings to return.
    pub limit: Option<usize>,

    /// Number of bookings to skip.
    pub offset: Option<usize>,
}

impl BookingQuery {
    /// Creates a new query matching every booking.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for one buyer's bookings.
    pub fn for_buyer(buyer_id: UserId) -> Self {
        Self {
            buyer_id: Some(buyer_id),
            ..Default::default()
        }
    }

    /// Creates a query for bookings on one seller's properties.
    pub fn for_seller(seller_id: UserId) -> Self {
        Self {
            seller_id: Some(seller_id),
            ..Default::default()
        }
    }

    pub fn buyer(mut self, buyer_id: UserId) -> Self {
        self.buyer_id = Some(buyer_id);
        self
    }

    pub fn seller(mut self, seller_id: UserId) -> Self {
        self.seller_id = Some(seller_id);
        self
    }

    pub fn property(mut self, property_id: PropertyId) -> Self {
        self.property_id = Some(property_id);
        self
    }

    pub fn status(mut self, status: BookingStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Excludes cancelled and rejected bookings.
    pub fn active_only(mut self) -> Self {
        self.active_only = true;
        self
    }

    /// Limits the number of bookings returned.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips this many bookings before returning results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if the booking passes every filter. Paging is not applied.
    pub fn matches(&self, booking: &Booking) -> bool {
        if let Some(id) = self.buyer_id
            && booking.buyer_id() != id
        {
            return false;
        }
        if let Some(id) = self.seller_id
            && booking.seller_id() != id
        {
            return false;
        }
        if let Some(id) = self.property_id
            && booking.property_id() != id
        {
            return false;
        }
        if let Some(status) = self.status
            && booking.status() != status
        {
            return false;
        }
        !self.active_only || booking.status().is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_for_buyer() {
        let id = UserId::new();
        let query = BookingQuery::for_buyer(id);

        assert_eq!(query.buyer_id, Some(id));
        assert!(query.seller_id.is_none());
        assert!(!query.active_only);
    }

    #[test]
    fn query_builder_chain() {
        let seller = UserId::new();
        let property = PropertyId::new();
        let query = BookingQuery::for_seller(seller)
            .property(property)
            .status(BookingStatus::Confirmed)
            .active_only()
            .limit(20)
            .offset(40);

        assert_eq!(query.seller_id, Some(seller));
        assert_eq!(query.property_id, Some(property));
        assert_eq!(query.status, Some(BookingStatus::Confirmed));
        assert!(query.active_only);
        assert_eq!(query.limit, Some(20));
        assert_eq!(query.offset, Some(40));
    }
}
