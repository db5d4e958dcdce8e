//! Shared utilities, configuration, and error handling for Statesync
//!
//! This crate provides common functionality used across the Statesync server:
//! - Configuration management following 12-factor principles
//! - Error types and handling
//! - Database error mapping shared by the domain repositories

pub mod config;
pub mod db;
pub mod error;

pub use config::Config;
pub use db::RepositoryError;
pub use error::{Error, Result};

/// Truncate a public key for log output.
///
/// Raw key material must never reach the logs; a short prefix is enough to
/// correlate a user across log lines.
pub fn truncate_key(public_key: &str) -> String {
    const VISIBLE: usize = 12;
    match public_key.char_indices().nth(VISIBLE) {
        Some((idx, _)) => format!("{}…", &public_key[..idx]),
        None => public_key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_key_long() {
        let key = "MIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8A";
        let truncated = truncate_key(key);
        assert!(truncated.starts_with("MIIBIjANBgkq"));
        assert!(truncated.len() < key.len());
    }

    #[test]
    fn test_truncate_key_short() {
        assert_eq!(truncate_key("abc"), "abc");
    }
}
