//! Event log API handlers
//!
//! Implements:
//! - GET /events?since=&limit= — cursor read over the caller's applications
//! - POST /events — submit an event through the pipeline

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use statesync_auth::AuthUser;
use statesync_common::Result;

use crate::api::middleware::EventsState;
use crate::domain::event::{Event, SubmittedEvent};
use crate::pipeline::PipelineError;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 500;

/// Query parameters for the cursor read
#[derive(Debug, Deserialize, Default)]
pub struct EventsQuery {
    /// Event id of the last event the client has; absent means "from the top"
    pub since: Option<String>,
    pub limit: Option<i64>,
}

/// Response for the cursor read
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsResponse {
    pub events: Vec<Event>,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_resync_required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Request body for event submission
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitEventRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default = "default_version")]
    pub version: i64,
    pub data: Map<String, Value>,
}

fn default_version() -> i64 {
    1
}

/// Response for an accepted event
#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub accepted: bool,
    pub event: Event,
    pub sequence: i64,
    pub timestamp: i64,
}

/// Rejection wrapper carrying the `{accepted:false, error, reason}` shape
pub struct EventRejection(pub PipelineError);

impl IntoResponse for EventRejection {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        let body = Json(json!({
            "accepted": false,
            "error": self.0.to_string(),
            "reason": self.0.reason(),
        }));
        (status, body).into_response()
    }
}

pub(crate) fn clamp_limit(requested: Option<i64>) -> i64 {
    requested.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// Cursor read
///
/// **GET /events?since=&limit=**
///
/// Events strictly after the cursor, scoped to the caller's applications,
/// application-first so each tenant's log arrives contiguous and gapless.
pub async fn list_events(
    AuthUser(auth_context): AuthUser,
    State(state): State<EventsState>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<EventsResponse>> {
    let limit = clamp_limit(query.limit);

    let page = state
        .pipeline
        .log()
        .list_since(
            &auth_context.user.public_key,
            query.since.as_deref(),
            limit,
        )
        .await?;

    if page.full_resync_required {
        return Ok(Json(EventsResponse {
            events: Vec::new(),
            has_more: false,
            full_resync_required: Some(true),
            reason: Some("cursor expired or gap".to_string()),
        }));
    }

    Ok(Json(EventsResponse {
        events: page.events,
        has_more: page.has_more,
        full_resync_required: None,
        reason: None,
    }))
}

/// Submit an event
///
/// **POST /events**
///
/// The creator is the session identity; whatever the payload claims about
/// its author is ignored.
pub async fn submit_event(
    AuthUser(auth_context): AuthUser,
    State(state): State<EventsState>,
    Json(request): Json<SubmitEventRequest>,
) -> std::result::Result<Json<AcceptedResponse>, EventRejection> {
    let submitted = SubmittedEvent {
        id: request.id,
        event_type: request.event_type,
        creator_public_key: auth_context.user.public_key.clone(),
        version: request.version,
        data: request.data,
    };

    let event = state
        .pipeline
        .accept(submitted)
        .await
        .map_err(EventRejection)?;

    Ok(Json(AcceptedResponse {
        accepted: true,
        sequence: event.sequence_number,
        timestamp: event.created_at,
        event,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_clamping() {
        assert_eq!(clamp_limit(None), 100);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(-5)), 1);
        assert_eq!(clamp_limit(Some(250)), 250);
        assert_eq!(clamp_limit(Some(9000)), 500);
    }

    #[test]
    fn test_rejection_shape() {
        let rejection = EventRejection(PipelineError::Unauthorized("nope".to_string()));
        let response = rejection.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_submit_request_parses_wire_shape() {
        let body = r#"{
            "id": "evt-1",
            "type": "application_data_changed",
            "version": 1,
            "data": {"applicationId": "app-1"}
        }"#;
        let request: SubmitEventRequest = serde_json::from_str(body).unwrap();
        assert_eq!(request.event_type, "application_data_changed");
        assert_eq!(request.version, 1);
    }

    #[test]
    fn test_submit_request_defaults_version() {
        let body = r#"{"id": "evt-1", "type": "x", "data": {}}"#;
        let request: SubmitEventRequest = serde_json::from_str(body).unwrap();
        assert_eq!(request.version, 1);
    }
}
