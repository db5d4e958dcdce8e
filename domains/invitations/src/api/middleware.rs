//! Invitations domain state and auth backend integration

use axum::extract::FromRef;
use std::sync::Arc;

use statesync_accounts::UserRepository;
use statesync_applications::ApplicationsRepositories;
use statesync_auth::AuthBackend;
use statesync_events::EventPipeline;
use statesync_keys::ServerKeys;

use crate::repository::InvitationRepository;

/// Application state for the invitations domain
#[derive(Clone)]
pub struct InvitationsState {
    pub invitations: InvitationRepository,
    pub apps: ApplicationsRepositories,
    pub users: UserRepository,
    pub pipeline: Arc<EventPipeline>,
    pub keys: Arc<ServerKeys>,
    pub auth: AuthBackend,
    /// Public base URL used to build shareable invite links
    pub external_url: String,
}

impl FromRef<InvitationsState> for AuthBackend {
    fn from_ref(state: &InvitationsState) -> Self {
        state.auth.clone()
    }
}
