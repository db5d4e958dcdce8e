//! Key material error types

use thiserror::Error;

/// Errors raised while deriving, encoding, or using server key material
#[derive(Debug, Error)]
pub enum KeyError {
    /// Both derivation inputs must be non-empty; same inputs must always
    /// yield the same keypair, so there is no fallback for a missing one.
    #[error("Key derivation requires a non-empty master password and external URL")]
    EmptyDerivationInput,

    #[error("RSA key generation failed: {0}")]
    Generation(#[from] rsa::Error),

    #[error("Key encoding failed: {0}")]
    Encoding(String),

    #[error("Token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("Envelope is not valid base64url or is truncated")]
    EnvelopeFormat,

    #[error("Envelope decryption failed")]
    EnvelopeOpen,
}
