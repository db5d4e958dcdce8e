//! API layer for the applications domain

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use middleware::ApplicationsState;
pub use routes::routes;
