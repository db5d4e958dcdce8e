//! Events domain: the authoritative per-application event log
//!
//! Everything that mutates collaborative state flows through here:
//! validation, authorization, sequencing, durable persistence, projection
//! onto application state, and hand-off to the subscription hub.

pub mod api;
pub mod domain;
pub mod pipeline;
pub mod repository;
pub mod sweeper;

// Re-export domain types at the crate root for convenience
pub use domain::event::{Event, SubmittedEvent};
pub use domain::payload::{EditModeChange, EditModeChangeType, EventPayload, FieldChange};

// Re-export pipeline types
pub use pipeline::{EventPipeline, EventSink, NoopSink, PipelineError};

// Re-export repository types
pub use repository::{EventLogRepository, EventPage};

// Re-export sweeper
pub use sweeper::RetentionSweeper;

// Re-export API types
pub use api::routes;
pub use api::EventsState;
