//! Server key material for Statesync
//!
//! This crate owns every secret-derived artifact the server holds:
//! - The deterministic RSA signing keypair derived from the master password
//!   and the deployment's external URL
//! - RS256 signing and verification of server-issued tokens
//! - Symmetric envelopes protected by the master password (owner bootstrap,
//!   sealed keypair storage)
//!
//! Keys are derived once at boot and immutable afterwards.

pub mod envelope;
pub mod error;
pub mod material;

pub use envelope::{seal, unseal};
pub use error::KeyError;
pub use material::ServerKeys;
