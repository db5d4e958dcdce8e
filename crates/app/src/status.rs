//! Health probe and operator status endpoint

use std::sync::Arc;

use axum::{extract::FromRef, extract::State, routing::get, Json, Router};
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;

use statesync_accounts::repository::{SetupRepository, UserRepository};
use statesync_applications::ApplicationRepository;
use statesync_auth::{AuthBackend, AuthUser};
use statesync_common::Result;
use statesync_events::EventLogRepository;
use statesync_realtime::Hub;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// State for the status surface
#[derive(Clone)]
pub struct StatusState {
    pub pool: PgPool,
    pub auth: AuthBackend,
    pub users: UserRepository,
    pub setup: SetupRepository,
    pub applications: ApplicationRepository,
    pub event_log: EventLogRepository,
    pub hub: Arc<Hub>,
}

impl FromRef<StatusState> for AuthBackend {
    fn from_ref(state: &StatusState) -> Self {
        state.auth.clone()
    }
}

/// Response for `GET /status`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub health: String,
    pub version: String,
    pub storage_used_bytes: i64,
    pub user_count: i64,
    pub application_count: i64,
    pub event_count: i64,
    pub connection_count: usize,
    pub owner_registered: bool,
}

/// Liveness probe
///
/// **GET /health** — unauthenticated
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": VERSION }))
}

/// Operator status
///
/// **GET /status** — session required
pub async fn server_status(
    AuthUser(_auth_context): AuthUser,
    State(state): State<StatusState>,
) -> Result<Json<StatusResponse>> {
    let storage_used_bytes: i64 =
        sqlx::query_scalar("SELECT pg_database_size(current_database())")
            .fetch_one(&state.pool)
            .await?;

    Ok(Json(StatusResponse {
        health: "ok".to_string(),
        version: VERSION.to_string(),
        storage_used_bytes,
        user_count: state.users.count().await?,
        application_count: state.applications.count().await?,
        event_count: state.event_log.count().await?,
        connection_count: state.hub.connection_count().await,
        owner_registered: state.setup.owner_registered_at().await?.is_some(),
    }))
}

/// Create the status routes
pub fn routes() -> Router<StatusState> {
    Router::new().route("/status", get(server_status))
}
