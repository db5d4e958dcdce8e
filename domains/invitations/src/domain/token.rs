//! Invite token claims and verification

use chrono::Utc;
use jsonwebtoken::{decode, Algorithm, Validation};
use serde::{Deserialize, Serialize};

use statesync_applications::MemberRole;
use statesync_common::{Error, Result};
use statesync_keys::ServerKeys;

/// Claims carried by an invitation token. No `exp` means unbounded
/// lifetime — the `maxUses` policy then governs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteTokenClaims {
    pub invite_id: String,
    pub application_id: String,
    pub role: MemberRole,
    pub issuer_url: String,
    pub iat: i64,
    pub nbf: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl InviteTokenClaims {
    /// Expired right now? A token is invalid at or after its `exp` (so
    /// `expiresInHours = 0` mints one expired at issue); tokens without
    /// `exp` never expire.
    pub fn is_expired(&self) -> bool {
        self.exp
            .map(|exp| Utc::now().timestamp() >= exp)
            .unwrap_or(false)
    }
}

/// Mint a signed invite token. `expires_in_hours = 0` is allowed and mints
/// a token already expired at issue — useful for exercising client expiry
/// handling.
pub fn mint_invite_token(
    keys: &ServerKeys,
    invite_id: &str,
    application_id: &str,
    role: MemberRole,
    issuer_url: &str,
    expires_in_hours: Option<i64>,
) -> Result<(String, Option<i64>)> {
    let now = Utc::now().timestamp();
    let exp = expires_in_hours.map(|hours| now + hours * 3600);

    let claims = InviteTokenClaims {
        invite_id: invite_id.to_string(),
        application_id: application_id.to_string(),
        role,
        issuer_url: issuer_url.to_string(),
        iat: now,
        nbf: now,
        exp,
    };

    let token = keys
        .sign_claims(&claims)
        .map_err(|e| Error::Crypto(format!("Failed to sign invite token: {}", e)))?;
    Ok((token, exp))
}

/// Verify an invite token's signature and shape. Expiry is NOT enforced
/// here — callers surface it as a distinct state rather than a parse error.
pub fn verify_invite_token(keys: &ServerKeys, token: &str) -> Result<InviteTokenClaims> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.validate_exp = false;
    validation.validate_nbf = true;
    validation.required_spec_claims.clear();

    let data = decode::<InviteTokenClaims>(token, keys.decoding_key(), &validation)
        .map_err(|_| Error::Validation("Invalid invitation token".to_string()))?;

    Ok(data.claims)
}
