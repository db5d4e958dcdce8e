//! Route definitions for the invitations domain API

use axum::{
    routing::{delete, get, post},
    Router,
};

use super::handlers;
use super::middleware::InvitationsState;

/// Create all invitations domain API routes
pub fn routes() -> Router<InvitationsState> {
    Router::new()
        .route(
            "/applications/{id}/invites",
            get(handlers::list_invites).post(handlers::create_invite),
        )
        .route(
            "/applications/{app_id}/invites/{invite_id}",
            delete(handlers::revoke_invite),
        )
        .route("/invites/{token}/info", get(handlers::invite_info))
        .route("/invites/check", post(handlers::check_invite))
        .route("/invites/{token}/join", post(handlers::join))
}
