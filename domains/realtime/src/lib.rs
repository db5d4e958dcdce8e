//! Realtime domain: the subscription hub and the `/ws` stream
//!
//! Accepted events fan out from here to every live subscriber of the
//! event's application, except the connection owned by its originator.
//! Slow subscribers are dropped rather than allowed to stall the pipeline;
//! they recover through the cursor read.

pub mod connection;
pub mod handler;
pub mod hub;
pub mod protocol;

pub use handler::{routes, RealtimeState};
pub use hub::{Hub, HubSink};
pub use protocol::{InboundFrame, OutboundFrame};
