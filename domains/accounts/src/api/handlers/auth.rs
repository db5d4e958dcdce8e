//! Challenge-response login handlers
//!
//! Implements:
//! - GET /users/challenge?publicKey= — issue a login challenge
//! - POST /users/auth — exchange a signed challenge for a session token

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use statesync_auth::mint_session_token;
use statesync_common::{truncate_key, Error, Result};

use crate::api::middleware::AccountsState;
use crate::domain::assertions::{peek_assertion, verify_assertion_signature};

/// Query parameters for challenge issuance
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeQuery {
    pub public_key: String,
}

/// Response for challenge issuance
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    pub challenge: String,
    /// Unix seconds
    pub expires_at: i64,
    pub server_public_key: String,
}

/// Request body for login
#[derive(Debug, Deserialize)]
pub struct AuthenticateRequest {
    /// RS256 assertion signed with the client's private key
    pub assertion: String,
}

/// Response for successful login
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub token: String,
    /// Unix seconds
    pub expires_at: i64,
}

/// Issue a login challenge
///
/// **GET /users/challenge?publicKey=PK**
///
/// Unknown keys get a 404 so clients can distinguish "register first" from
/// "sign and retry".
pub async fn challenge(
    State(state): State<AccountsState>,
    Query(query): Query<ChallengeQuery>,
) -> Result<Json<ChallengeResponse>> {
    let user = state
        .repos
        .users
        .get_by_public_key(&query.public_key)
        .await?
        .ok_or_else(|| Error::NotFound("Unknown user".to_string()))?;

    let entry = state.challenges.issue(&user.public_key);

    tracing::debug!(
        public_key = %truncate_key(&user.public_key),
        "Issued login challenge"
    );

    Ok(Json(ChallengeResponse {
        challenge: entry.nonce,
        expires_at: entry.expires_at.timestamp(),
        server_public_key: state.keys.public_key_pem().to_string(),
    }))
}

/// Exchange a signed challenge for a session token
///
/// **POST /users/auth**
///
/// Verification runs in a fixed order, each step a distinct failure:
/// envelope parse, assertion freshness, user resolution, signature,
/// challenge lookup, challenge equality, challenge expiry. A mismatched
/// challenge keeps the stored entry (the client may retry with the right
/// one); success and observed expiry both consume it.
pub async fn authenticate(
    State(state): State<AccountsState>,
    Json(request): Json<AuthenticateRequest>,
) -> Result<Json<SessionResponse>> {
    // (a) parse the signature envelope
    let claims = peek_assertion(&request.assertion)?;
    let asserted_challenge = claims
        .challenge
        .ok_or_else(|| Error::Validation("Malformed assertion".to_string()))?;

    // (b) assertion freshness
    let now = Utc::now();
    if now.timestamp() - claims.iat > state.config.challenge_ttl_sec {
        return Err(Error::Unauthorized("Assertion expired".to_string()));
    }

    // (c) resolve the user
    let user = state
        .repos
        .users
        .get_by_public_key(&claims.public_key)
        .await?
        .ok_or_else(|| Error::Unauthorized("Unknown user".to_string()))?;

    // (d) signature against the STORED key, not the asserted one
    if !verify_assertion_signature(&request.assertion, &user.public_key) {
        return Err(Error::Unauthorized("Invalid signature".to_string()));
    }

    // (e) outstanding challenge
    let stored = state
        .challenges
        .lookup(&user.public_key)
        .ok_or_else(|| Error::Unauthorized("No outstanding challenge".to_string()))?;

    // (f) challenge equality — mismatch does NOT consume the entry
    if stored.nonce != asserted_challenge {
        return Err(Error::Unauthorized("Challenge mismatch".to_string()));
    }

    // (g) challenge expiry — observed expiry consumes the entry
    if stored.is_expired(now) {
        state.challenges.remove(&user.public_key);
        return Err(Error::Expired("Challenge expired".to_string()));
    }

    state.challenges.remove(&user.public_key);

    let (token, expires_at) = mint_session_token(
        &state.keys,
        &user.identity(),
        state.config.jwt_expiration_hours,
    )
    .map_err(|e| Error::Crypto(format!("Failed to mint session token: {}", e)))?;

    tracing::info!(
        public_key = %truncate_key(&user.public_key),
        username = %user.username,
        "Login succeeded"
    );

    Ok(Json(SessionResponse { token, expires_at }))
}
