//! Stream protocol frames
//!
//! JSON text frames, discriminated by `type`. Inbound frames are what
//! clients may send; everything else the reader answers with an `error`
//! frame and carries on.

use serde::{Deserialize, Serialize};

use statesync_events::Event;

/// Client → server frames
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum InboundFrame {
    Subscribe { application_id: String },
    Unsubscribe { application_id: String },
    Ping,
}

/// Server → client frames
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum OutboundFrame {
    Connected { user_public_key: String },
    Events { events: Vec<Event> },
    Pong,
    Error { error: String },
}
