//! Owner bootstrap and account introspection handlers
//!
//! Implements:
//! - POST /users/owners/register — one-time owner bootstrap, master-password protected
//! - GET /users/me — return the authenticated account

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use statesync_auth::{AuthUser, UserRole};
use statesync_common::{truncate_key, Error, Result};

use crate::api::middleware::AccountsState;
use crate::domain::assertions::{peek_assertion, verify_assertion_signature};
use crate::domain::entities::{NewUser, User};

/// Header carrying the sealed owner-registration envelope
pub const REGISTRATION_HEADER: &str = "x-registration-token";

/// Response for successful owner bootstrap
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerRegisteredResponse {
    pub message: String,
    pub public_key: String,
}

/// Response shape for account reads
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub public_key: String,
    pub username: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            public_key: user.public_key,
            username: user.username,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

// The bootstrap path reports every failure identically: the caller either
// holds the master secret and a well-formed assertion, or learns nothing.
fn opaque() -> Error {
    Error::Validation("Invalid registration request".to_string())
}

/// Register (or promote) the server owner
///
/// **POST /users/owners/register**
///
/// The request carries a doubly-wrapped credential: an outer envelope sealed
/// with the master password whose plaintext is an inner assertion signed by
/// the claimed public key. The outer layer proves possession of the master
/// secret; the inner signature binds the act to the declared key.
pub async fn register_owner(
    State(state): State<AccountsState>,
    headers: axum::http::HeaderMap,
) -> Result<(StatusCode, Json<OwnerRegisteredResponse>)> {
    let envelope = headers
        .get(REGISTRATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::Unauthorized("Missing registration header".to_string()))?;

    let inner = statesync_keys::unseal(envelope, &state.config.master_password)
        .map_err(|_| opaque())?;
    let assertion = String::from_utf8(inner).map_err(|_| opaque())?;

    let claims = peek_assertion(&assertion).map_err(|_| opaque())?;

    let age = Utc::now().timestamp() - claims.iat;
    if age > state.config.registration_token_ttl_sec {
        return Err(opaque());
    }

    if !verify_assertion_signature(&assertion, &claims.public_key) {
        return Err(opaque());
    }

    let username = claims.username.filter(|u| !u.trim().is_empty()).ok_or_else(opaque)?;

    let user = match state
        .repos
        .users
        .get_by_public_key(&claims.public_key)
        .await?
    {
        Some(existing) => state
            .repos
            .users
            .update_role(&existing.public_key, UserRole::Owner)
            .await?
            .ok_or_else(|| Error::Internal("Owner promotion lost the user row".to_string()))?,
        None => {
            let new_user = NewUser::new(claims.public_key.clone(), username, UserRole::Owner)
                .map_err(|_| opaque())?;
            state.repos.users.create(&new_user).await.map_err(|e| match e {
                // Username/key collisions stay opaque like every other failure
                Error::Conflict(_) => opaque(),
                other => other,
            })?
        }
    };

    state.repos.setup.mark_owner_registered().await?;

    tracing::info!(
        public_key = %truncate_key(&user.public_key),
        "Owner registered"
    );

    Ok((
        StatusCode::CREATED,
        Json(OwnerRegisteredResponse {
            message: "Owner registered".to_string(),
            public_key: user.public_key,
        }),
    ))
}

/// Return the authenticated account
///
/// **GET /users/me**
pub async fn me(
    AuthUser(auth_context): AuthUser,
    State(state): State<AccountsState>,
) -> Result<Json<UserResponse>> {
    let user = state
        .repos
        .users
        .get_by_public_key(&auth_context.user.public_key)
        .await?
        .ok_or_else(|| Error::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse::from(user)))
}
