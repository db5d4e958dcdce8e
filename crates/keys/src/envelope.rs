//! Master-password symmetric envelopes
//!
//! A sealed envelope is `base64url(nonce || ciphertext)` under
//! ChaCha20-Poly1305, keyed by the SHA-256 of the master password. The owner
//! bootstrap request arrives wrapped in one of these (possession of the
//! master secret is the only thing the outer layer proves), and the server's
//! keypair is stored at rest inside another.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::KeyError;

const NONCE_LEN: usize = 12;

fn cipher_for(password: &str) -> ChaCha20Poly1305 {
    let key = Sha256::digest(password.as_bytes());
    // SHA-256 output is exactly the 32-byte key the cipher wants
    ChaCha20Poly1305::new_from_slice(&key).expect("SHA-256 digest is a valid cipher key")
}

/// Seal plaintext under the master password.
pub fn seal(plaintext: &[u8], password: &str) -> Result<String, KeyError> {
    let cipher = cipher_for(password);

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| KeyError::EnvelopeOpen)?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);
    Ok(URL_SAFE_NO_PAD.encode(sealed))
}

/// Open an envelope produced by [`seal`]. Fails if the password is wrong or
/// the payload was tampered with.
pub fn unseal(sealed: &str, password: &str) -> Result<Vec<u8>, KeyError> {
    let raw = URL_SAFE_NO_PAD
        .decode(sealed.trim())
        .map_err(|_| KeyError::EnvelopeFormat)?;
    if raw.len() <= NONCE_LEN {
        return Err(KeyError::EnvelopeFormat);
    }

    let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
    let cipher = cipher_for(password);
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| KeyError::EnvelopeOpen)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_unseal_roundtrip() {
        let sealed = seal(b"secret keypair", "master").unwrap();
        let opened = unseal(&sealed, "master").unwrap();
        assert_eq!(opened, b"secret keypair");
    }

    #[test]
    fn test_wrong_password_fails() {
        let sealed = seal(b"secret", "master").unwrap();
        assert!(matches!(
            unseal(&sealed, "not-master"),
            Err(KeyError::EnvelopeOpen)
        ));
    }

    #[test]
    fn test_garbage_input_is_format_error() {
        assert!(matches!(
            unseal("!!!not-base64!!!", "master"),
            Err(KeyError::EnvelopeFormat)
        ));
        assert!(matches!(unseal("AAAA", "master"), Err(KeyError::EnvelopeFormat)));
    }

    #[test]
    fn test_nonce_makes_envelopes_distinct() {
        let a = seal(b"same plaintext", "master").unwrap();
        let b = seal(b"same plaintext", "master").unwrap();
        assert_ne!(a, b);
    }
}
