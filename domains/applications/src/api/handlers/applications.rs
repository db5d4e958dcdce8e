//! Application management API handlers
//!
//! Implements:
//! - POST /applications/register — register a tenant with its initial roster
//! - GET /applications — list the caller's applications
//! - GET /applications/{id} — full read (tree + roster)
//! - GET /applications/{id}/state — cheap freshness probe
//! - DELETE /applications/{id} — cascade delete, application-owner only

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use statesync_auth::{AuthUser, OwnerUser};
use statesync_common::{Error, Result};

use crate::api::middleware::ApplicationsState;
use crate::domain::entities::{
    Application, ApplicationFull, Member, MemberRole, NewApplication, NewMember,
};

/// Member input for application registration
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInput {
    pub id: String,
    pub name: String,
    pub role: MemberRole,
    pub public_key: String,
    /// Base64-encoded avatar bytes
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Request for registering an application
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterApplicationRequest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    pub members: Vec<MemberInput>,
}

/// Response shape for application reads
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationResponse {
    pub id: String,
    pub name: String,
    pub icon: Option<String>,
    pub server_key_fingerprint: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Application> for ApplicationResponse {
    fn from(app: Application) -> Self {
        Self {
            id: app.id,
            name: app.name,
            icon: app.icon,
            server_key_fingerprint: app.server_key_fingerprint,
            created_at: app.created_at,
            updated_at: app.updated_at,
        }
    }
}

/// Response shape for the state probe
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationStateResponse {
    pub id: String,
    pub name: String,
    pub updated_at: DateTime<Utc>,
}

fn decode_avatar(avatar: Option<String>) -> Result<Option<Vec<u8>>> {
    avatar
        .map(|a| {
            STANDARD
                .decode(a)
                .map_err(|_| Error::Validation("Avatar must be valid base64".to_string()))
        })
        .transpose()
}

/// Resolve the application and require the caller to be on its roster.
pub(crate) async fn require_member(
    state: &ApplicationsState,
    application_id: &str,
    public_key: &str,
) -> Result<Member> {
    if state.repos.applications.get(application_id).await?.is_none() {
        return Err(Error::NotFound("Application not found".to_string()));
    }

    state
        .repos
        .members
        .get_by_public_key(application_id, public_key)
        .await?
        .ok_or_else(|| Error::Forbidden("Not a member of this application".to_string()))
}

/// Register an application
///
/// **POST /applications/register**
///
/// Server-owner only. The request must carry exactly one roster member with
/// role `owner`; anything else is a validation error before any write.
pub async fn register_application(
    OwnerUser(_auth_context): OwnerUser,
    State(state): State<ApplicationsState>,
    Json(request): Json<RegisterApplicationRequest>,
) -> Result<(StatusCode, Json<ApplicationResponse>)> {
    let members = request
        .members
        .into_iter()
        .map(|m| {
            Ok(NewMember {
                id: m.id,
                public_key: m.public_key,
                name: m.name,
                role: m.role,
                avatar: decode_avatar(m.avatar)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let new_app = NewApplication::new(request.id, request.name, request.icon, members)?;
    let application = state
        .repos
        .applications
        .register(&new_app, &state.server_key_fingerprint)
        .await?;

    tracing::info!(application_id = %application.id, "Application registered");

    Ok((
        StatusCode::CREATED,
        Json(ApplicationResponse::from(application)),
    ))
}

/// List the caller's applications
///
/// **GET /applications**
pub async fn list_applications(
    AuthUser(auth_context): AuthUser,
    State(state): State<ApplicationsState>,
) -> Result<Json<Vec<ApplicationResponse>>> {
    let applications = state
        .repos
        .applications
        .list_for_user(&auth_context.user.public_key)
        .await?;

    Ok(Json(
        applications
            .into_iter()
            .map(ApplicationResponse::from)
            .collect(),
    ))
}

/// Full read of an application
///
/// **GET /applications/{id}**
pub async fn get_application(
    AuthUser(auth_context): AuthUser,
    State(state): State<ApplicationsState>,
    Path(id): Path<String>,
) -> Result<Json<ApplicationFull>> {
    require_member(&state, &id, &auth_context.user.public_key).await?;

    let full = state
        .repos
        .applications
        .get_full(&id)
        .await?
        .ok_or_else(|| Error::NotFound("Application not found".to_string()))?;

    Ok(Json(full))
}

/// Freshness probe
///
/// **GET /applications/{id}/state**
pub async fn get_application_state(
    AuthUser(auth_context): AuthUser,
    State(state): State<ApplicationsState>,
    Path(id): Path<String>,
) -> Result<Json<ApplicationStateResponse>> {
    require_member(&state, &id, &auth_context.user.public_key).await?;

    let application = state
        .repos
        .applications
        .get(&id)
        .await?
        .ok_or_else(|| Error::NotFound("Application not found".to_string()))?;

    Ok(Json(ApplicationStateResponse {
        id: application.id,
        name: application.name,
        updated_at: application.updated_at,
    }))
}

/// Delete an application
///
/// **DELETE /applications/{id}**
///
/// Restricted to the application's owner. The row and everything it owns go
/// in one atomic unit; events stay behind for the retention sweeper.
pub async fn delete_application(
    AuthUser(auth_context): AuthUser,
    State(state): State<ApplicationsState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let member = require_member(&state, &id, &auth_context.user.public_key).await?;

    if !member.role.is_owner() {
        return Err(Error::Forbidden(
            "Only the application owner can delete it".to_string(),
        ));
    }

    state.repos.applications.delete(&id).await?;

    tracing::info!(application_id = %id, "Application deleted");
    Ok(StatusCode::OK)
}
