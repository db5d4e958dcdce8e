//! Route definitions for the events domain API

use axum::{
    routing::get,
    Router,
};

use super::handlers;
use super::middleware::EventsState;

/// Create all events domain API routes
pub fn routes() -> Router<EventsState> {
    Router::new().route(
        "/events",
        get(handlers::list_events).post(handlers::submit_event),
    )
}
