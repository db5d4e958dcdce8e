//! Session authentication for Statesync
//!
//! Session tokens are self-contained RS256 JWTs signed by the server key;
//! the server keeps no session table. Every protected request passes through
//! [`AuthUser`], which checks the signature and expiry, resolves the user by
//! public key, and attaches the identity to the handler.

pub mod backend;
pub mod claims;
pub mod context;
pub mod error;
pub mod extractors;
pub mod jwt;
pub mod types;

pub use backend::AuthBackend;
pub use claims::SessionClaims;
pub use context::AuthContext;
pub use error::AuthError;
pub use extractors::{AuthUser, OwnerUser};
pub use jwt::mint_session_token;
pub use types::{AuthIdentity, UserRole};
