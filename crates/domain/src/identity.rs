//! Request-scoped identity.
//!
//! Every lifecycle operation receives the resolved `Actor` explicitly. Nothing
//! in the core reads identity from ambient state or from request bodies.

use std::str::FromStr;

use common::UserId;
use serde::{Deserialize, Serialize};

/// Marketplace role of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Browses and books properties.
    Buyer,

    /// Lists properties and manages bookings on them.
    Seller,

    /// Moderates listings; read-only over bookings.
    Admin,
}

impl Role {
    /// Returns the role name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Buyer => "BUYER",
            Role::Seller => "SELLER",
            Role::Admin => "ADMIN",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUYER" => Ok(Role::Buyer),
            "SELLER" => Ok(Role::Seller),
            "ADMIN" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// The authenticated user behind the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    /// Creates an actor from an id and role.
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    /// Creates a buyer actor.
    pub fn buyer(id: UserId) -> Self {
        Self::new(id, Role::Buyer)
    }

    /// Creates a seller actor.
    pub fn seller(id: UserId) -> Self {
        Self::new(id, Role::Seller)
    }

    /// Creates an admin actor.
    pub fn admin(id: UserId) -> Self {
        Self::new(id, Role::Admin)
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.role, self.id)
    }
}
