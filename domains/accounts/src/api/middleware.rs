//! Accounts domain state and auth backend integration

use axum::extract::FromRef;
use std::sync::Arc;

use statesync_auth::AuthBackend;
use statesync_keys::ServerKeys;

use crate::domain::challenges::ChallengeStore;
use crate::repository::AccountsRepositories;

/// Knobs the accounts handlers need from the environment
#[derive(Clone)]
pub struct AccountsConfig {
    pub master_password: String,
    pub jwt_expiration_hours: i64,
    pub challenge_ttl_sec: i64,
    pub registration_token_ttl_sec: i64,
}

/// Application state for the accounts domain
#[derive(Clone)]
pub struct AccountsState {
    pub repos: AccountsRepositories,
    pub auth: AuthBackend,
    pub keys: Arc<ServerKeys>,
    pub challenges: Arc<ChallengeStore>,
    pub config: AccountsConfig,
}

impl FromRef<AccountsState> for AuthBackend {
    fn from_ref(state: &AccountsState) -> Self {
        state.auth.clone()
    }
}
