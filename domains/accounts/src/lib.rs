//! Accounts domain: user directory and challenge-response authentication

pub mod api;
pub mod domain;
pub mod repository;

// Re-export domain types at the crate root for convenience
pub use domain::assertions::{peek_assertion, verify_assertion_signature, AssertionClaims};
pub use domain::challenges::{ChallengeEntry, ChallengeStore};
pub use domain::entities::{NewUser, User};

// Re-export repository types
pub use repository::{AccountsRepositories, UserRepository};

// Re-export API types
pub use api::routes;
pub use api::AccountsState;
