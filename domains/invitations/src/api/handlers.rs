//! Invitation API handlers
//!
//! Authenticated, application-owner surface:
//! - POST /applications/{id}/invites — mint a signed invite token
//! - GET /applications/{id}/invites — list invitations
//! - DELETE /applications/{appId}/invites/{inviteId} — revoke (hard delete)
//!
//! Unauthenticated token surface:
//! - GET /invites/{token}/info — inspect
//! - POST /invites/check — structured usability verdict for a specific key
//! - POST /invites/{token}/join — consume: mints a user if needed and
//!   produces the `member_added` event

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use statesync_accounts::NewUser;
use statesync_applications::{Member, MemberRole};
use statesync_auth::{AuthUser, UserRole};
use statesync_common::{truncate_key, Error, Result};
use statesync_events::SubmittedEvent;

use crate::api::middleware::InvitationsState;
use crate::domain::entities::Invitation;
use crate::domain::token::{mint_invite_token, verify_invite_token, InviteTokenClaims};

const MAX_EXPIRES_IN_HOURS: i64 = 48;

/// Request for creating an invitation
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInviteRequest {
    /// Role granted on join; `owner` is never grantable
    pub role: MemberRole,
    #[serde(default)]
    pub max_uses: Option<i32>,
    /// 0..=48; 0 mints a token already expired at issue
    #[serde(default)]
    pub expires_in_hours: Option<i64>,
}

/// Response for a freshly minted invitation
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInviteResponse {
    pub invite_id: String,
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    pub url: String,
    pub deep_link: String,
}

/// Response shape for invitation listings
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationResponse {
    pub id: String,
    pub application_id: String,
    pub created_by_public_key: String,
    pub role: MemberRole,
    pub max_uses: Option<i32>,
    pub used_count: i32,
    pub created_at: DateTime<Utc>,
}

impl From<Invitation> for InvitationResponse {
    fn from(invitation: Invitation) -> Self {
        Self {
            id: invitation.id,
            application_id: invitation.application_id,
            created_by_public_key: invitation.created_by_public_key,
            role: invitation.granted_role,
            max_uses: invitation.max_uses,
            used_count: invitation.used_count,
            created_at: invitation.created_at,
        }
    }
}

/// Response for `GET /invites/{token}/info`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteInfoResponse {
    pub application_name: String,
    pub creator_username: String,
    pub role: MemberRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    pub is_expired: bool,
    pub is_valid: bool,
}

/// Request for `POST /invites/check`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInviteRequest {
    pub token: String,
    pub user_public_key: String,
}

/// Structured usability verdict
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInviteResponse {
    pub valid: bool,
    pub already_used: bool,
    pub is_member: bool,
    pub is_expired: bool,
    pub max_uses_reached: bool,
    pub application_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<MemberRole>,
    pub message: String,
}

/// Request for `POST /invites/{token}/join`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub public_key: String,
    pub username: String,
}

/// Response for a join
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    pub application_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_id: Option<String>,
    pub is_new_member: bool,
}

/// Require the caller to be the owner of the given application.
async fn require_app_owner(
    state: &InvitationsState,
    application_id: &str,
    public_key: &str,
) -> Result<Member> {
    if state.apps.applications.get(application_id).await?.is_none() {
        return Err(Error::NotFound("Application not found".to_string()));
    }

    let member = state
        .apps
        .members
        .get_by_public_key(application_id, public_key)
        .await?
        .ok_or_else(|| Error::Forbidden("Not a member of this application".to_string()))?;

    if !member.role.is_owner() {
        return Err(Error::Forbidden(
            "Only the application owner can manage invitations".to_string(),
        ));
    }
    Ok(member)
}

/// Create an invitation
///
/// **POST /applications/{id}/invites**
pub async fn create_invite(
    AuthUser(auth_context): AuthUser,
    State(state): State<InvitationsState>,
    Path(application_id): Path<String>,
    Json(request): Json<CreateInviteRequest>,
) -> Result<(StatusCode, Json<CreateInviteResponse>)> {
    require_app_owner(&state, &application_id, &auth_context.user.public_key).await?;

    if request.role.is_owner() {
        return Err(Error::Validation(
            "Invitations cannot grant the owner role".to_string(),
        ));
    }
    if let Some(max_uses) = request.max_uses {
        if max_uses < 1 {
            return Err(Error::Validation("maxUses must be at least 1".to_string()));
        }
    }
    if let Some(hours) = request.expires_in_hours {
        if !(0..=MAX_EXPIRES_IN_HOURS).contains(&hours) {
            return Err(Error::Validation(format!(
                "expiresInHours must be within 0-{}",
                MAX_EXPIRES_IN_HOURS
            )));
        }
    }

    let invitation = state
        .invitations
        .create(
            &application_id,
            &auth_context.user.public_key,
            request.role,
            request.max_uses,
        )
        .await?;

    let (token, expires_at) = mint_invite_token(
        &state.keys,
        &invitation.id,
        &application_id,
        request.role,
        &state.external_url,
        request.expires_in_hours,
    )?;

    tracing::info!(
        application_id = %application_id,
        invite_id = %invitation.id,
        role = %request.role,
        "Invitation created"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateInviteResponse {
            url: format!("{}/invite/{}", state.external_url, token),
            deep_link: format!("statesync://invite?token={}", token),
            invite_id: invitation.id,
            token,
            expires_at,
        }),
    ))
}

/// List an application's invitations
///
/// **GET /applications/{id}/invites**
pub async fn list_invites(
    AuthUser(auth_context): AuthUser,
    State(state): State<InvitationsState>,
    Path(application_id): Path<String>,
) -> Result<Json<Vec<InvitationResponse>>> {
    require_app_owner(&state, &application_id, &auth_context.user.public_key).await?;

    let invitations = state.invitations.list_by_application(&application_id).await?;
    Ok(Json(
        invitations.into_iter().map(InvitationResponse::from).collect(),
    ))
}

/// Revoke an invitation
///
/// **DELETE /applications/{appId}/invites/{inviteId}**
pub async fn revoke_invite(
    AuthUser(auth_context): AuthUser,
    State(state): State<InvitationsState>,
    Path((application_id, invite_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    require_app_owner(&state, &application_id, &auth_context.user.public_key).await?;

    let deleted = state.invitations.delete(&application_id, &invite_id).await?;
    if !deleted {
        return Err(Error::NotFound("Invitation not found".to_string()));
    }

    tracing::info!(
        application_id = %application_id,
        invite_id = %invite_id,
        "Invitation revoked"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Inspect an invite token
///
/// **GET /invites/{token}/info** (unauthenticated)
///
/// A revoked invitation still answers 200, but with `isValid=false` and no
/// application name — the token holder learns nothing beyond "dead".
pub async fn invite_info(
    State(state): State<InvitationsState>,
    Path(token): Path<String>,
) -> Result<Json<InviteInfoResponse>> {
    let claims = verify_invite_token(&state.keys, &token)?;
    let expired = claims.is_expired();

    let Some(invitation) = state.invitations.get(&claims.invite_id).await? else {
        return Ok(Json(InviteInfoResponse {
            application_name: String::new(),
            creator_username: String::new(),
            role: claims.role,
            expires_at: claims.exp,
            is_expired: expired,
            is_valid: false,
        }));
    };

    let application_name = state
        .apps
        .applications
        .get(&invitation.application_id)
        .await?
        .map(|app| app.name)
        .unwrap_or_default();

    let creator_username = state
        .users
        .get_by_public_key(&invitation.created_by_public_key)
        .await?
        .map(|user| user.username)
        .unwrap_or_default();

    Ok(Json(InviteInfoResponse {
        application_name,
        creator_username,
        role: invitation.granted_role,
        expires_at: claims.exp,
        is_expired: expired,
        is_valid: invitation.is_valid(expired),
    }))
}

/// Check whether a specific key can use an invite
///
/// **POST /invites/check** (unauthenticated)
///
/// Rejoin — previously used but currently not a member — is valid.
pub async fn check_invite(
    State(state): State<InvitationsState>,
    Json(request): Json<CheckInviteRequest>,
) -> Result<Json<CheckInviteResponse>> {
    let claims = verify_invite_token(&state.keys, &request.token)?;
    let expired = claims.is_expired();

    let Some(invitation) = state.invitations.get(&claims.invite_id).await? else {
        return Ok(Json(CheckInviteResponse {
            valid: false,
            already_used: false,
            is_member: false,
            is_expired: expired,
            max_uses_reached: false,
            application_name: String::new(),
            role: None,
            message: "Invitation has been revoked".to_string(),
        }));
    };

    let application_name = state
        .apps
        .applications
        .get(&invitation.application_id)
        .await?
        .map(|app| app.name)
        .unwrap_or_default();

    let already_used = state
        .invitations
        .has_used(&invitation.id, &request.user_public_key)
        .await?;
    let is_member = state
        .apps
        .members
        .is_member(&invitation.application_id, &request.user_public_key)
        .await?;
    let max_uses_reached = invitation.is_exhausted();

    let (valid, message) = if is_member {
        (false, "Already a member of this application".to_string())
    } else if expired {
        (false, "Invitation has expired".to_string())
    } else if already_used {
        // Rejoin: used before, not currently a member
        (true, "Rejoining is allowed".to_string())
    } else if max_uses_reached {
        (false, "Invitation has no uses left".to_string())
    } else {
        (true, "Invitation can be used".to_string())
    };

    Ok(Json(CheckInviteResponse {
        valid,
        already_used,
        is_member,
        is_expired: expired,
        max_uses_reached,
        application_name,
        role: Some(invitation.granted_role),
        message,
    }))
}

/// Join via an invite token
///
/// **POST /invites/{token}/join** (unauthenticated, mints a user)
pub async fn join(
    State(state): State<InvitationsState>,
    Path(token): Path<String>,
    Json(request): Json<JoinRequest>,
) -> Result<Json<JoinResponse>> {
    // 1. Verify the token and load the invitation; expiry and exhaustion
    //    are terminal answers
    let claims: InviteTokenClaims = verify_invite_token(&state.keys, &token)
        .map_err(|_| Error::NotFound("Unknown invitation".to_string()))?;

    let invitation = state
        .invitations
        .get(&claims.invite_id)
        .await?
        .ok_or_else(|| Error::NotFound("Unknown invitation".to_string()))?;

    if claims.is_expired() {
        return Err(Error::Expired("Invitation has expired".to_string()));
    }
    if invitation.is_exhausted() {
        return Err(Error::Exhausted("Invitation has no uses left".to_string()));
    }

    // 2. Mint the user if this key has never been seen
    if request.public_key.trim().is_empty() {
        return Err(Error::Validation("publicKey must not be empty".to_string()));
    }
    let user = match state.users.get_by_public_key(&request.public_key).await? {
        Some(user) => user,
        None => {
            let new_user = NewUser::new(
                request.public_key.clone(),
                request.username.clone(),
                UserRole::Member,
            )?;
            state.users.create(&new_user).await?
        }
    };

    // 3. Already a member: idempotent success, no second event, no use burned
    if let Some(member) = state
        .apps
        .members
        .get_by_public_key(&invitation.application_id, &user.public_key)
        .await?
    {
        return Ok(Json(JoinResponse {
            application_id: invitation.application_id,
            member_id: Some(member.id),
            is_new_member: false,
        }));
    }

    // 4. Produce the member_added event; its projection inserts the row
    let submitted = SubmittedEvent {
        id: Uuid::new_v4().to_string(),
        event_type: "member_added".to_string(),
        creator_public_key: user.public_key.clone(),
        version: 1,
        data: serde_json::from_value(json!({
            "applicationId": invitation.application_id,
            "memberPublicKey": user.public_key,
            "memberName": user.username,
            "role": invitation.granted_role,
            "inviteId": invitation.id,
            "version": 1,
        }))
        .expect("literal object is a map"),
    };

    state
        .pipeline
        .produce(submitted)
        .await
        .map_err(|e| Error::Internal(format!("Failed to produce member_added: {}", e)))?;

    // 5. Record the consumption in its own transaction, after the append
    state
        .invitations
        .record_use(&invitation.id, &user.public_key)
        .await?;

    let member_id = state
        .apps
        .members
        .get_by_public_key(&invitation.application_id, &user.public_key)
        .await?
        .map(|member| member.id);

    tracing::info!(
        application_id = %invitation.application_id,
        invite_id = %invitation.id,
        user = %truncate_key(&user.public_key),
        "Member joined via invitation"
    );

    Ok(Json(JoinResponse {
        application_id: invitation.application_id,
        member_id,
        is_new_member: true,
    }))
}
