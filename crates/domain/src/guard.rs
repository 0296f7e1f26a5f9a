//! Role-based authorization for booking actions.
//!
//! Each role has a `RolePolicy` that says, per action, whether it is granted
//! for any booking, only for bookings the actor is party to, or never.

use crate::booking::Booking;
use crate::error::AuthorizationError;
use crate::identity::{Actor, Role};

/// Things an actor can try to do with bookings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookingAction {
    Create,
    View,
    Confirm,
    Reject,
    Cancel,
    AttachPayment,
    Complete,
    ListOwn,
    ListSeller,
    ListAll,
}

impl BookingAction {
    /// Returns a short human-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingAction::Create => "create a booking",
            BookingAction::View => "view",
            BookingAction::Confirm => "confirm",
            BookingAction::Reject => "reject",
            BookingAction::Cancel => "cancel",
            BookingAction::AttachPayment => "attach payment to",
            BookingAction::Complete => "complete",
            BookingAction::ListOwn => "list own bookings",
            BookingAction::ListSeller => "list seller bookings",
            BookingAction::ListAll => "list all bookings",
        }
    }

    /// Returns true if the action changes a booking.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            BookingAction::Create
                | BookingAction::Confirm
                | BookingAction::Reject
                | BookingAction::Cancel
                | BookingAction::AttachPayment
                | BookingAction::Complete
        )
    }
}

impl std::fmt::Display for BookingAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How far a role's permission for an action reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// Allowed on every booking.
    Any,
    /// Allowed only where the actor is the relevant party.
    Own,
    /// Never allowed.
    Denied,
}

/// Per-role authorization rules.
pub trait RolePolicy: Send + Sync {
    /// The role this policy describes.
    fn role(&self) -> Role;

    /// Returns how far the role's permission for `action` reaches.
    fn grant(&self, action: BookingAction) -> Grant;

    /// Returns true if `actor` is the party this role acts as on `booking`.
    fn owns(&self, actor: &Actor, booking: &Booking) -> bool;

    /// The error reported when `grant` is `Denied`.
    fn denial(&self, action: BookingAction) -> AuthorizationError {
        AuthorizationError::RoleNotPermitted {
            role: self.role(),
            action,
        }
    }
}

/// Buyers create bookings and manage their own.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuyerPolicy;

impl RolePolicy for BuyerPolicy {
    fn role(&self) -> Role {
        Role::Buyer
    }

    fn grant(&self, action: BookingAction) -> Grant {
        match action {
            BookingAction::Create => Grant::Any,
            BookingAction::View
            | BookingAction::Cancel
            | BookingAction::AttachPayment
            | BookingAction::ListOwn => Grant::Own,
            _ => Grant::Denied,
        }
    }

    fn owns(&self, actor: &Actor, booking: &Booking) -> bool {
        booking.buyer_id() == actor.id
    }
}

/// Sellers decide on and finish bookings for properties they own.
#[derive(Debug, Clone, Copy, Default)]
pub struct SellerPolicy;

impl RolePolicy for SellerPolicy {
    fn role(&self) -> Role {
        Role::Seller
    }

    fn grant(&self, action: BookingAction) -> Grant {
        match action {
            BookingAction::View
            | BookingAction::Confirm
            | BookingAction::Reject
            | BookingAction::Cancel
            | BookingAction::Complete
            | BookingAction::ListOwn
            | BookingAction::ListSeller => Grant::Own,
            _ => Grant::Denied,
        }
    }

    fn owns(&self, actor: &Actor, booking: &Booking) -> bool {
        booking.seller_id() == actor.id
    }
}

/// Admins can read everything and change nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdminPolicy;

impl RolePolicy for AdminPolicy {
    fn role(&self) -> Role {
        Role::Admin
    }

    fn grant(&self, action: BookingAction) -> Grant {
        match action {
            BookingAction::View | BookingAction::ListAll => Grant::Any,
            _ => Grant::Denied,
        }
    }

    fn owns(&self, _actor: &Actor, _booking: &Booking) -> bool {
        false
    }

    fn denial(&self, action: BookingAction) -> AuthorizationError {
        if action.is_mutation() {
            AuthorizationError::AdminReadOnly { action }
        } else {
            AuthorizationError::RoleNotPermitted {
                role: Role::Admin,
                action,
            }
        }
    }
}

/// Checks actors against the policy for their role.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationGuard;

impl AuthorizationGuard {
    pub fn new() -> Self {
        Self
    }

    /// Returns the policy for a role.
    pub fn policy(role: Role) -> &'static dyn RolePolicy {
        match role {
            Role::Buyer => &BuyerPolicy,
            Role::Seller => &SellerPolicy,
            Role::Admin => &AdminPolicy,
        }
    }

    /// Checks that the actor may create bookings.
    pub fn authorize_create(&self, actor: &Actor) -> Result<(), AuthorizationError> {
        let policy = Self::policy(actor.role);
        match policy.grant(BookingAction::Create) {
            Grant::Any => Ok(()),
            Grant::Own | Grant::Denied => Err(policy.denial(BookingAction::Create)),
        }
    }

    /// Checks that the actor may perform `action` on this booking.
    pub fn authorize(
        &self,
        actor: &Actor,
        action: BookingAction,
        booking: &Booking,
    ) -> Result<(), AuthorizationError> {
        let policy = Self::policy(actor.role);
        match policy.grant(action) {
            Grant::Any => Ok(()),
            Grant::Own if policy.owns(actor, booking) => Ok(()),
            Grant::Own => Err(AuthorizationError::NotOwner {
                actor_id: actor.id,
                booking_id: booking.id(),
                action,
            }),
            Grant::Denied => Err(policy.denial(action)),
        }
    }

    /// Checks a listing action. `Own` grants are fine here; the caller scopes
    /// the query to the actor.
    pub fn authorize_listing(
        &self,
        actor: &Actor,
        action: BookingAction,
    ) -> Result<(), AuthorizationError> {
        let policy = Self::policy(actor.role);
        match policy.grant(action) {
            Grant::Any | Grant::Own => Ok(()),
            Grant::Denied => Err(policy.denial(action)),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use common::{BookingId, PropertyId, UserId};

    use super::*;
    use crate::booking::{BookingRequestedData, Currency, Money};

    fn booking_between(buyer: UserId, seller: UserId) -> Booking {
        Booking::requested(&BookingRequestedData {
            booking_id: BookingId::new(),
            property_id: PropertyId::new(),
            buyer_id: buyer,
            seller_id: seller,
            amount: Money::from_major(100),
            currency: Currency::inr(),
            visit_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            message: None,
            transaction_id: None,
            requested_at: Utc::now(),
        })
    }

    #[test]
    fn test_only_buyers_create() {
        let guard = AuthorizationGuard::new();
        assert!(guard.authorize_create(&Actor::buyer(UserId::new())).is_ok());
        assert!(matches!(
            guard.authorize_create(&Actor::seller(UserId::new())),
            Err(AuthorizationError::RoleNotPermitted {
                role: Role::Seller,
                ..
            })
        ));
        assert!(matches!(
            guard.authorize_create(&Actor::admin(UserId::new())),
            Err(AuthorizationError::AdminReadOnly { .. })
        ));
    }

    #[test]
    fn test_seller_decisions_require_ownership() {
        let guard = AuthorizationGuard::new();
        let owner = Actor::seller(UserId::new());
        let other = Actor::seller(UserId::new());
        let booking = booking_between(UserId::new(), owner.id);

        for action in [
            BookingAction::Confirm,
            BookingAction::Reject,
            BookingAction::Complete,
            BookingAction::Cancel,
        ] {
            assert!(guard.authorize(&owner, action, &booking).is_ok());
            assert!(matches!(
                guard.authorize(&other, action, &booking),
                Err(AuthorizationError::NotOwner { .. })
            ));
        }
    }

    #[test]
    fn test_buyer_cannot_decide() {
        let guard = AuthorizationGuard::new();
        let buyer = Actor::buyer(UserId::new());
        let booking = booking_between(buyer.id, UserId::new());

        let err = guard
            .authorize(&buyer, BookingAction::Confirm, &booking)
            .unwrap_err();
        assert_eq!(err.action(), BookingAction::Confirm);
        assert!(matches!(err, AuthorizationError::RoleNotPermitted { .. }));
    }

    #[test]
    fn test_buyer_actions_on_own_booking() {
        let guard = AuthorizationGuard::new();
        let buyer = Actor::buyer(UserId::new());
        let stranger = Actor::buyer(UserId::new());
        let booking = booking_between(buyer.id, UserId::new());

        for action in [
            BookingAction::View,
            BookingAction::Cancel,
            BookingAction::AttachPayment,
        ] {
            assert!(guard.authorize(&buyer, action, &booking).is_ok());
            assert!(guard.authorize(&stranger, action, &booking).is_err());
        }
    }

    #[test]
    fn test_seller_role_with_buyer_id_is_not_owner() {
        let guard = AuthorizationGuard::new();
        let id = UserId::new();
        let booking = booking_between(id, UserId::new());

        let result = guard.authorize(&Actor::seller(id), BookingAction::Cancel, &booking);
        assert!(matches!(result, Err(AuthorizationError::NotOwner { .. })));
    }

    #[test]
    fn test_admin_reads_but_never_writes() {
        let guard = AuthorizationGuard::new();
        let admin = Actor::admin(UserId::new());
        let booking = booking_between(UserId::new(), UserId::new());

        assert!(guard.authorize(&admin, BookingAction::View, &booking).is_ok());
        assert!(
            guard
                .authorize_listing(&admin, BookingAction::ListAll)
                .is_ok()
        );

        for action in [
            BookingAction::Confirm,
            BookingAction::Reject,
            BookingAction::Cancel,
            BookingAction::AttachPayment,
            BookingAction::Complete,
        ] {
            assert_eq!(
                guard.authorize(&admin, action, &booking),
                Err(AuthorizationError::AdminReadOnly { action })
            );
        }
    }

    #[test]
    fn test_listing_permissions() {
        let guard = AuthorizationGuard::new();
        let buyer = Actor::buyer(UserId::new());
        let seller = Actor::seller(UserId::new());

        assert!(guard.authorize_listing(&buyer, BookingAction::ListOwn).is_ok());
        assert!(
            guard
                .authorize_listing(&buyer, BookingAction::ListSeller)
                .is_err()
        );
        assert!(guard.authorize_listing(&buyer, BookingAction::ListAll).is_err());
        assert!(
            guard
                .authorize_listing(&seller, BookingAction::ListSeller)
                .is_ok()
        );
        assert!(guard.authorize_listing(&seller, BookingAction::ListAll).is_err());
    }
}
