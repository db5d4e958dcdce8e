//! Session token minting, validation, and header extraction

use axum::http::HeaderValue;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use statesync_keys::{KeyError, ServerKeys};

use crate::claims::SessionClaims;
use crate::error::AuthError;
use crate::types::AuthIdentity;

/// Mint a session token for an authenticated user.
///
/// Returns the signed token together with its expiry (Unix seconds).
pub fn mint_session_token(
    keys: &ServerKeys,
    user: &AuthIdentity,
    ttl_hours: i64,
) -> Result<(String, i64), KeyError> {
    let now = Utc::now();
    let exp = now + Duration::hours(ttl_hours);
    let claims = SessionClaims {
        public_key: user.public_key.clone(),
        username: user.username.clone(),
        role: user.role,
        iat: now.timestamp(),
        nbf: now.timestamp(),
        exp: exp.timestamp(),
    };
    let token = keys.sign_claims(&claims)?;
    Ok((token, exp.timestamp()))
}

/// Validate a session token against the server public key.
///
/// Signature, `exp`, and `nbf` are all enforced here; user resolution is the
/// backend's job.
pub(crate) fn validate_session_token(
    token: &str,
    decoding_key: &DecodingKey,
) -> Result<SessionClaims, AuthError> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.validate_nbf = true;

    let token_data = decode::<SessionClaims>(token, decoding_key, &validation).map_err(|e| {
        tracing::debug!(error = %e, "Session token validation failed");
        AuthError::InvalidToken
    })?;

    Ok(token_data.claims)
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(header: &HeaderValue) -> Result<String, AuthError> {
    let header_str = header
        .to_str()
        .map_err(|_| AuthError::InvalidAuthorizationFormat)?;

    if let Some(token) = header_str.strip_prefix("Bearer ") {
        Ok(token.to_string())
    } else {
        Err(AuthError::InvalidAuthorizationFormat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserRole;
    use axum::http::HeaderValue;

    fn test_keys() -> ServerKeys {
        ServerKeys::derive("test master password", "http://localhost:4545").unwrap()
    }

    fn test_user() -> AuthIdentity {
        AuthIdentity {
            public_key: "-----BEGIN PUBLIC KEY-----\ntest\n-----END PUBLIC KEY-----\n".to_string(),
            username: "ada".to_string(),
            role: UserRole::Owner,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_extract_bearer_token() {
        let header = HeaderValue::from_static("Bearer abc123");
        assert_eq!(extract_bearer_token(&header).unwrap(), "abc123");

        let header = HeaderValue::from_static("abc123");
        assert!(extract_bearer_token(&header).is_err());

        let header = HeaderValue::from_static("Basic abc123");
        assert!(extract_bearer_token(&header).is_err());
    }

    #[test]
    fn test_mint_and_validate_roundtrip() {
        let keys = test_keys();
        let user = test_user();

        let (token, expires_at) = mint_session_token(&keys, &user, 24).unwrap();
        assert!(expires_at > Utc::now().timestamp());

        let claims = validate_session_token(&token, keys.decoding_key()).unwrap();
        assert_eq!(claims.public_key, user.public_key);
        assert_eq!(claims.username, "ada");
        assert_eq!(claims.role, UserRole::Owner);
    }

    #[test]
    fn test_validate_rejects_foreign_signature() {
        let keys = test_keys();
        let other = ServerKeys::derive("another password", "http://localhost:4545").unwrap();
        let user = test_user();

        let (token, _) = mint_session_token(&other, &user, 24).unwrap();
        assert!(validate_session_token(&token, keys.decoding_key()).is_err());
    }

    #[test]
    fn test_validate_rejects_garbage() {
        let keys = test_keys();
        assert!(validate_session_token("not-a-token", keys.decoding_key()).is_err());
    }
}
