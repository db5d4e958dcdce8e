//! Domain entities for the accounts domain

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use statesync_auth::{AuthIdentity, UserRole};
use statesync_common::{Error, Result};

/// User account, unique by public key and by username.
///
/// Created once (bootstrap or invitation join); the role may later be
/// promoted but accounts are never destroyed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub public_key: String,
    pub username: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn identity(&self) -> AuthIdentity {
        AuthIdentity {
            public_key: self.public_key.clone(),
            username: self.username.clone(),
            role: self.role,
            created_at: self.created_at,
        }
    }
}

/// Validated input for creating a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub public_key: String,
    pub username: String,
    pub role: UserRole,
}

impl NewUser {
    pub fn new(public_key: String, username: String, role: UserRole) -> Result<Self> {
        if public_key.trim().is_empty() {
            return Err(Error::Validation("Public key must not be empty".to_string()));
        }
        if username.trim().is_empty() || username.len() > 50 {
            return Err(Error::Validation(
                "Username must be 1-50 characters".to_string(),
            ));
        }
        Ok(Self {
            public_key,
            username,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_rejects_empty_public_key() {
        assert!(NewUser::new("".to_string(), "ada".to_string(), UserRole::Member).is_err());
        assert!(NewUser::new("  ".to_string(), "ada".to_string(), UserRole::Member).is_err());
    }

    #[test]
    fn test_new_user_rejects_bad_username() {
        assert!(NewUser::new("PK".to_string(), "".to_string(), UserRole::Member).is_err());
        assert!(NewUser::new("PK".to_string(), "x".repeat(51), UserRole::Member).is_err());
    }

    #[test]
    fn test_new_user_accepts_valid_input() {
        let user = NewUser::new("PK".to_string(), "ada".to_string(), UserRole::Owner).unwrap();
        assert_eq!(user.username, "ada");
        assert!(user.role.is_owner());
    }
}
