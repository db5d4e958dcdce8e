//! Authenticated request context

use crate::claims::SessionClaims;
use crate::types::AuthIdentity;

/// Context attached to a request once authentication succeeds.
///
/// `user` is the current users-table row (role promotions apply
/// immediately); `claims` is what the token asserted at mint time.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: AuthIdentity,
    pub claims: SessionClaims,
}

impl AuthContext {
    pub fn new(user: AuthIdentity, claims: SessionClaims) -> Self {
        Self { user, claims }
    }
}
