//! Route definitions for the applications domain API

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{applications, members};
use super::middleware::ApplicationsState;

/// Create all applications domain API routes
pub fn routes() -> Router<ApplicationsState> {
    Router::new()
        .route(
            "/applications/register",
            post(applications::register_application),
        )
        .route("/applications", get(applications::list_applications))
        .route(
            "/applications/{id}",
            get(applications::get_application).delete(applications::delete_application),
        )
        .route(
            "/applications/{id}/state",
            get(applications::get_application_state),
        )
        .route("/applications/{id}/members", get(members::list_members))
}
