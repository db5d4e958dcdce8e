//! API layer for the invitations domain

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use middleware::InvitationsState;
pub use routes::routes;
