//! Membership roster API handlers
//!
//! Implements:
//! - GET /applications/{id}/members — roster ordered by role then name

use axum::{
    extract::{Path, State},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::Serialize;

use statesync_auth::AuthUser;
use statesync_common::Result;

use crate::api::handlers::applications::require_member;
use crate::api::middleware::ApplicationsState;
use crate::domain::entities::{Member, MemberRole};

/// Response shape for roster entries
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberResponse {
    pub id: String,
    pub application_id: String,
    pub public_key: String,
    pub name: String,
    pub role: MemberRole,
    /// Base64-encoded avatar bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Member> for MemberResponse {
    fn from(member: Member) -> Self {
        Self {
            id: member.id,
            application_id: member.application_id,
            public_key: member.public_key,
            name: member.name,
            role: member.role,
            avatar: member.avatar.map(|bytes| STANDARD.encode(bytes)),
            created_at: member.created_at,
        }
    }
}

/// List the roster
///
/// **GET /applications/{id}/members**
///
/// Any member of the application can read the roster.
pub async fn list_members(
    AuthUser(auth_context): AuthUser,
    State(state): State<ApplicationsState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<MemberResponse>>> {
    require_member(&state, &id, &auth_context.user.public_key).await?;

    let members = state.repos.members.list_by_application(&id).await?;

    Ok(Json(members.into_iter().map(MemberResponse::from).collect()))
}
