//! Client-signed assertions
//!
//! Bootstrap and login both submit an RS256 JWT signed with the *client's*
//! private key. The claims name the public key the signature must verify
//! against, so parsing (untrusted) and signature verification (against a
//! specific key) are separate steps — the caller decides which key to trust
//! per the flow it is running.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use statesync_common::{Error, Result};

/// Claims a client asserts about itself
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionClaims {
    /// PEM public key the signature must verify against
    pub public_key: String,
    /// Requested username (owner bootstrap only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Echoed challenge nonce (login only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
    /// Issued at (Unix seconds); freshness window enforced by the caller
    pub iat: i64,
}

/// Parse the claims out of an assertion WITHOUT verifying the signature.
///
/// The result is untrusted until [`verify_assertion_signature`] passes
/// against a key the caller has decided to trust.
pub fn peek_assertion(token: &str) -> Result<AssertionClaims> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_sig), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(Error::Validation("Malformed assertion".to_string()));
    };

    let raw = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| Error::Validation("Malformed assertion".to_string()))?;

    serde_json::from_slice(&raw).map_err(|_| Error::Validation("Malformed assertion".to_string()))
}

/// Verify an assertion's RS256 signature against a specific public key PEM.
pub fn verify_assertion_signature(token: &str, public_key_pem: &str) -> bool {
    let Ok(decoding_key) = DecodingKey::from_rsa_pem(public_key_pem.as_bytes()) else {
        return false;
    };

    // Assertions carry no exp; freshness is the iat window checked upstream.
    let mut validation = Validation::new(Algorithm::RS256);
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    decode::<AssertionClaims>(token, &decoding_key, &validation).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
    use rsa::RsaPrivateKey;

    fn client_keypair() -> (String, String) {
        // Small key keeps the test fast; production clients send 2048-bit
        let private = RsaPrivateKey::new(&mut rand::thread_rng(), 2048).unwrap();
        let private_pem = private.to_pkcs8_pem(LineEnding::LF).unwrap().to_string();
        let public_pem = private
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .unwrap();
        (private_pem, public_pem)
    }

    fn sign_assertion(private_pem: &str, claims: &AssertionClaims) -> String {
        encode(
            &Header::new(Algorithm::RS256),
            claims,
            &EncodingKey::from_rsa_pem(private_pem.as_bytes()).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_peek_rejects_garbage() {
        assert!(peek_assertion("nonsense").is_err());
        assert!(peek_assertion("a.b").is_err());
        assert!(peek_assertion("a.!!!.c").is_err());
    }

    #[test]
    fn test_peek_and_verify_roundtrip() {
        let (private_pem, public_pem) = client_keypair();
        let claims = AssertionClaims {
            public_key: public_pem.clone(),
            username: None,
            challenge: Some("nonce".to_string()),
            iat: chrono::Utc::now().timestamp(),
        };
        let token = sign_assertion(&private_pem, &claims);

        let peeked = peek_assertion(&token).unwrap();
        assert_eq!(peeked.public_key, public_pem);
        assert_eq!(peeked.challenge.as_deref(), Some("nonce"));

        assert!(verify_assertion_signature(&token, &public_pem));
    }

    #[test]
    fn test_verify_rejects_wrong_key() {
        let (private_pem, public_pem) = client_keypair();
        let (_, other_public) = client_keypair();
        let claims = AssertionClaims {
            public_key: public_pem,
            username: None,
            challenge: None,
            iat: 0,
        };
        let token = sign_assertion(&private_pem, &claims);
        assert!(!verify_assertion_signature(&token, &other_public));
    }

    #[test]
    fn test_verify_rejects_invalid_pem() {
        let (private_pem, public_pem) = client_keypair();
        let claims = AssertionClaims {
            public_key: public_pem,
            username: None,
            challenge: None,
            iat: 0,
        };
        let token = sign_assertion(&private_pem, &claims);
        assert!(!verify_assertion_signature(&token, "not a pem"));
    }
}
