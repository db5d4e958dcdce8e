//! Route definitions for the accounts domain API

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{auth, users};
use super::middleware::AccountsState;

/// Create all accounts domain API routes
pub fn routes() -> Router<AccountsState> {
    Router::new()
        .route("/users/owners/register", post(users::register_owner))
        .route("/users/challenge", get(auth::challenge))
        .route("/users/auth", post(auth::authenticate))
        .route("/users/me", get(users::me))
}
