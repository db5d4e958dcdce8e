//! API layer for the accounts domain

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use middleware::{AccountsConfig, AccountsState};
pub use routes::routes;
