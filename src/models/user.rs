use chrono::{DateTime, Utc};
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AppError;

/// A user's permission tier.
///
/// Backed by the `user_role` Postgres enum. Unknown values fail to decode
/// instead of being defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSql, FromSql)]
#[postgres(name = "user_role")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[postgres(name = "SUPER_ADMIN")]
    SuperAdmin,
    #[postgres(name = "ADMIN")]
    Admin,
    #[postgres(name = "TECHNICIAN")]
    Technician,
    #[postgres(name = "CUSTOMER")]
    Customer,
}

impl Role {
    /// The canonical wire representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::Admin => "ADMIN",
            Role::Technician => "TECHNICIAN",
            Role::Customer => "CUSTOMER",
        }
    }

    /// Whether this role grants access to the admin back-office.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUPER_ADMIN" => Ok(Role::SuperAdmin),
            "ADMIN" => Ok(Role::Admin),
            "TECHNICIAN" => Ok(Role::Technician),
            "CUSTOMER" => Ok(Role::Customer),
            other => Err(AppError::Validation(format!("Unknown role: {}", other))),
        }
    }
}

/// Represents a user in the system.
#[derive(Clone, Debug)]
pub struct User {
    /// The unique identifier for the user.
    pub id: Uuid,
    /// The user's email address.
    pub email: String,
    /// The user's first name.
    pub first_name: String,
    /// The user's last name.
    pub last_name: String,
    /// The user's hashed password.
    pub password: String,
    /// The user's permission tier.
    pub role: Role,
    /// Whether the user is active.
    pub is_active: bool,
    /// Whether the user's email address has been verified.
    pub is_verified: bool,
    /// The timestamp when the user was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// The public view of a user, safe to return to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPublic {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

impl From<&User> for UserPublic {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_canonical_names() {
        for role in [Role::SuperAdmin, Role::Admin, Role::Technician, Role::Customer] {
            assert_eq!(Role::from_str(role.as_str()).unwrap(), role);
        }
    }

    #[test]
    fn unknown_role_is_rejected_not_defaulted() {
        assert!(Role::from_str("MANAGER").is_err());
        assert!(Role::from_str("customer").is_err());
        assert!(Role::from_str("").is_err());
    }

    #[test]
    fn only_admin_tiers_reach_the_back_office() {
        assert!(Role::SuperAdmin.is_admin());
        assert!(Role::Admin.is_admin());
        assert!(!Role::Technician.is_admin());
        assert!(!Role::Customer.is_admin());
    }

    #[test]
    fn role_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&Role::SuperAdmin).unwrap();
        assert_eq!(json, r#""SUPER_ADMIN""#);
        let back: Role = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Role::SuperAdmin);
    }
}
