//! API handlers for the accounts domain

pub mod auth;
pub mod users;
