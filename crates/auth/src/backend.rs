//! Concrete authentication backend
//!
//! Wraps `PgPool` + the server's verification key and owns the auth-specific
//! SQL. Uses runtime `sqlx::query_as` (not macros) consistent with the rest
//! of the repositories.

use jsonwebtoken::DecodingKey;
use sqlx::PgPool;
use std::sync::Arc;

use statesync_keys::ServerKeys;

use crate::context::AuthContext;
use crate::error::AuthError;
use crate::jwt::validate_session_token;
use crate::types::AuthIdentity;

/// Concrete authentication backend.
///
/// Domain states expose this via `FromRef`:
/// ```ignore
/// impl FromRef<MyDomainState> for AuthBackend {
///     fn from_ref(state: &MyDomainState) -> Self {
///         state.auth.clone()
///     }
/// }
/// ```
#[derive(Clone)]
pub struct AuthBackend {
    pool: PgPool,
    keys: Arc<ServerKeys>,
}

impl AuthBackend {
    pub fn new(pool: PgPool, keys: Arc<ServerKeys>) -> Self {
        Self { pool, keys }
    }

    /// Server verification key (used by tests and the ws handshake).
    pub fn decoding_key(&self) -> &DecodingKey {
        self.keys.decoding_key()
    }

    /// Find a user by public key. Absence is `None`, not an error.
    pub async fn find_user(&self, public_key: &str) -> Result<Option<AuthIdentity>, AuthError> {
        let user: Option<AuthIdentity> = sqlx::query_as(
            r#"
            SELECT public_key, username, role, created_at
            FROM users
            WHERE public_key = $1
            "#,
        )
        .bind(public_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to load user");
            AuthError::UserLoadError
        })?;

        Ok(user)
    }

    /// Authenticate a bearer session token: verify signature + expiry, then
    /// resolve the user the token speaks for.
    pub async fn authenticate_session(&self, token: &str) -> Result<AuthContext, AuthError> {
        let claims = validate_session_token(token, self.keys.decoding_key())?;

        let user = self
            .find_user(&claims.public_key)
            .await?
            .ok_or(AuthError::UnknownUser)?;

        Ok(AuthContext::new(user, claims))
    }
}
