//! Stage 5: the publishing seam
//!
//! The pipeline hands accepted events to whatever implements [`EventSink`];
//! in production that is the subscription hub, wired in by the composition
//! root. The indirection keeps this crate free of any realtime dependency.

use async_trait::async_trait;

use crate::domain::event::Event;

/// Receiver of accepted events. Implementations must only buffer —
/// publishing may never block the response path.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: &Event);
}

/// Sink that drops everything; used in tests and before hub wiring.
pub struct NoopSink;

#[async_trait]
impl EventSink for NoopSink {
    async fn publish(&self, _event: &Event) {}
}
