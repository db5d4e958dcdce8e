//! Applications domain state and auth backend integration

use axum::extract::FromRef;

use statesync_auth::AuthBackend;

use crate::repository::ApplicationsRepositories;

/// Application state for the applications domain
#[derive(Clone)]
pub struct ApplicationsState {
    pub repos: ApplicationsRepositories,
    pub auth: AuthBackend,
    /// Fingerprint of the server key, stamped onto new applications
    pub server_key_fingerprint: String,
}

impl FromRef<ApplicationsState> for AuthBackend {
    fn from_ref(state: &ApplicationsState) -> Self {
        state.auth.clone()
    }
}
