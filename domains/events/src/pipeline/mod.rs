//! The event pipeline: validate → authorize → sequence → persist → project → publish

pub mod authorize;
pub mod project;
pub mod sink;

use std::sync::Arc;

use thiserror::Error;

use statesync_applications::ApplicationsRepositories;
use statesync_common::Error as CommonError;

use crate::domain::event::{Event, SubmittedEvent};
use crate::domain::payload::EventPayload;
use crate::repository::EventLogRepository;

pub use project::Projector;
pub use sink::{EventSink, NoopSink};

/// Rejection reasons surfaced to clients on `POST /events`
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Internal(String),
}

impl PipelineError {
    /// Machine-readable rejection tag
    pub fn reason(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "validation_failed",
            PipelineError::Unauthorized(_) => "unauthorized",
            PipelineError::Internal(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> axum::http::StatusCode {
        match self {
            PipelineError::Validation(_) => axum::http::StatusCode::BAD_REQUEST,
            PipelineError::Unauthorized(_) => axum::http::StatusCode::FORBIDDEN,
            PipelineError::Internal(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CommonError> for PipelineError {
    fn from(err: CommonError) -> Self {
        match err {
            CommonError::Validation(msg) | CommonError::Conflict(msg) => {
                PipelineError::Validation(msg)
            }
            CommonError::Forbidden(msg) | CommonError::Unauthorized(msg) => {
                PipelineError::Unauthorized(msg)
            }
            // An application that does not resolve is reported like a
            // membership failure so the endpoint cannot be used to probe
            // which tenants exist.
            CommonError::NotFound(msg) => PipelineError::Unauthorized(msg),
            other => PipelineError::Internal(other.to_string()),
        }
    }
}

/// The single writer of collaborative state.
///
/// Application/membership/component mutations happen exclusively as event
/// projections inside this pipeline; the applications domain is otherwise
/// read-only plus the registration invariant check.
#[derive(Clone)]
pub struct EventPipeline {
    log: EventLogRepository,
    apps: ApplicationsRepositories,
    projector: Projector,
    sink: Arc<dyn EventSink>,
}

impl EventPipeline {
    pub fn new(
        log: EventLogRepository,
        apps: ApplicationsRepositories,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            projector: Projector::new(apps.clone()),
            log,
            apps,
            sink,
        }
    }

    pub fn log(&self) -> &EventLogRepository {
        &self.log
    }

    /// Accept a client-submitted event: the full five stages.
    pub async fn accept(&self, submitted: SubmittedEvent) -> Result<Event, PipelineError> {
        self.run(submitted, true).await
    }

    /// Accept a server-produced event. The caller has already proved the
    /// right to act (notably the invitation join path), so the
    /// authorization stage is skipped; everything else is identical.
    pub async fn produce(&self, submitted: SubmittedEvent) -> Result<Event, PipelineError> {
        self.run(submitted, false).await
    }

    async fn run(
        &self,
        submitted: SubmittedEvent,
        authorize: bool,
    ) -> Result<Event, PipelineError> {
        // Stage 1: validation
        let payload = validate(&submitted)?;
        let application_id = payload.application_id().to_string();

        // Stage 2: authorization
        if authorize {
            authorize::authorize(&self.apps, &submitted, &payload).await?;
        }

        // Stage 3: sequencing & persistence — failure here fails the request
        let event = self
            .log
            .append(&submitted, &application_id)
            .await
            .map_err(PipelineError::from)?;

        // Stage 4: projection — failures are logged, never surfaced; the
        // authoritative log already records the intent
        if let Err(e) = self.projector.apply(&event, &payload).await {
            tracing::error!(
                event_id = %event.id,
                event_type = %event.event_type,
                application_id = %event.application_id,
                error = %e,
                "Event projection failed; log retains the event"
            );
        }

        // Stage 5: publish — best-effort buffering, must not block the response
        self.sink.publish(&event).await;

        Ok(event)
    }
}

/// Stage 1: envelope checks plus typed payload parsing.
fn validate(submitted: &SubmittedEvent) -> Result<EventPayload, PipelineError> {
    if submitted.id.trim().is_empty() {
        return Err(PipelineError::Validation(
            "Event id must not be empty".to_string(),
        ));
    }
    if submitted.event_type.trim().is_empty() {
        return Err(PipelineError::Validation(
            "Event type must not be empty".to_string(),
        ));
    }
    if submitted.creator_public_key.trim().is_empty() {
        return Err(PipelineError::Validation(
            "Event creator must not be empty".to_string(),
        ));
    }
    if submitted.version <= 0 {
        return Err(PipelineError::Validation(
            "Event version must be positive".to_string(),
        ));
    }

    EventPayload::parse(&submitted.event_type, &submitted.data).map_err(PipelineError::from)
}

#[cfg(test)]
fn data_map(pairs: Vec<(&str, serde_json::Value)>) -> serde_json::Map<String, serde_json::Value> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};

    fn submitted(event_type: &str, data: Map<String, Value>) -> SubmittedEvent {
        SubmittedEvent {
            id: "evt-1".to_string(),
            event_type: event_type.to_string(),
            creator_public_key: "PK".to_string(),
            version: 1,
            data,
        }
    }

    #[test]
    fn test_validate_rejects_empty_envelope_fields() {
        let data = data_map(vec![("applicationId", json!("app-1"))]);

        let mut no_id = submitted("application_data_changed", data.clone());
        no_id.id = String::new();
        assert!(validate(&no_id).is_err());

        let mut no_creator = submitted("application_data_changed", data.clone());
        no_creator.creator_public_key = "  ".to_string();
        assert!(validate(&no_creator).is_err());

        let mut bad_version = submitted("application_data_changed", data);
        bad_version.version = 0;
        assert!(validate(&bad_version).is_err());
    }

    #[test]
    fn test_validate_parses_known_type() {
        let data = data_map(vec![("applicationId", json!("app-1"))]);
        let payload = validate(&submitted("application_data_changed", data)).unwrap();
        assert_eq!(payload.application_id(), "app-1");
    }

    #[test]
    fn test_validate_rejects_unknown_type() {
        let data = data_map(vec![("applicationId", json!("app-1"))]);
        let err = validate(&submitted("mystery", data)).unwrap_err();
        assert_eq!(err.reason(), "validation_failed");
    }

    #[test]
    fn test_pipeline_error_reasons() {
        assert_eq!(
            PipelineError::Validation("x".into()).reason(),
            "validation_failed"
        );
        assert_eq!(
            PipelineError::Unauthorized("x".into()).reason(),
            "unauthorized"
        );
        assert_eq!(PipelineError::Internal("x".into()).reason(), "internal_error");
    }

    #[test]
    fn test_not_found_maps_to_unauthorized() {
        let err = PipelineError::from(CommonError::NotFound("application".into()));
        assert_eq!(err.reason(), "unauthorized");
    }
}
