//! Authentication identity types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-wide user role.
///
/// Distinct from per-application member roles: this governs what a user may
/// do against the server itself (registering applications is owner-only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Owner,
    #[default]
    Member,
}

impl UserRole {
    pub fn is_owner(&self) -> bool {
        matches!(self, UserRole::Owner)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::Owner => write!(f, "owner"),
            UserRole::Member => write!(f, "member"),
        }
    }
}

/// Authenticated identity (read model over the users table)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuthIdentity {
    pub public_key: String,
    pub username: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&UserRole::Owner).unwrap(), "\"owner\"");
        assert_eq!(
            serde_json::to_string(&UserRole::Member).unwrap(),
            "\"member\""
        );
    }

    #[test]
    fn test_is_owner() {
        assert!(UserRole::Owner.is_owner());
        assert!(!UserRole::Member.is_owner());
    }
}
