//! Session token claims

use serde::{Deserialize, Serialize};

use crate::types::UserRole;

/// Claims carried by a Statesync session token.
///
/// Self-contained: everything downstream handlers need to re-resolve the
/// user is in here, so no session table exists server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    /// Public key of the authenticated user
    pub public_key: String,
    /// Username at mint time
    pub username: String,
    /// Server-wide role at mint time
    pub role: UserRole,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Not before (Unix seconds)
    pub nbf: i64,
    /// Expires at (Unix seconds)
    pub exp: i64,
}
