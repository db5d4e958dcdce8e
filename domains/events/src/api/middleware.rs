//! Events domain state and auth backend integration

use axum::extract::FromRef;
use std::sync::Arc;

use statesync_auth::AuthBackend;

use crate::pipeline::EventPipeline;

/// Application state for the events domain
#[derive(Clone)]
pub struct EventsState {
    pub pipeline: Arc<EventPipeline>,
    pub auth: AuthBackend,
}

impl FromRef<EventsState> for AuthBackend {
    fn from_ref(state: &EventsState) -> Self {
        state.auth.clone()
    }
}
