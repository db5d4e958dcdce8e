//! Shared helpers for integration tests
#![allow(dead_code)] // not every test binary uses every helper

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::RsaPrivateKey;
use serde_json::json;

pub const MASTER_PASSWORD: &str = "integration master password";
pub const EXTERNAL_URL: &str = "http://localhost:4545";

/// A client-side identity: an RSA keypair that signs assertions the way a
/// real client would.
pub struct TestClient {
    private_pem: String,
    pub public_pem: String,
}

impl TestClient {
    pub fn generate() -> Self {
        let private = RsaPrivateKey::new(&mut rand::thread_rng(), 2048)
            .expect("client key generation");
        let private_pem = private
            .to_pkcs8_pem(LineEnding::LF)
            .expect("private pem")
            .to_string();
        let public_pem = private
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .expect("public pem");
        Self {
            private_pem,
            public_pem,
        }
    }

    fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_rsa_pem(self.private_pem.as_bytes()).expect("encoding key")
    }

    /// Sign a login assertion echoing a challenge nonce.
    pub fn login_assertion(&self, challenge: &str, iat: i64) -> String {
        let claims = json!({
            "publicKey": self.public_pem,
            "challenge": challenge,
            "iat": iat,
        });
        encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key())
            .expect("assertion signing")
    }

    /// Sign an owner-bootstrap assertion naming a username.
    pub fn bootstrap_assertion(&self, username: &str, iat: i64) -> String {
        let claims = json!({
            "publicKey": self.public_pem,
            "username": username,
            "iat": iat,
        });
        encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key())
            .expect("assertion signing")
    }
}

/// Build the sealed owner-registration envelope a bootstrap request carries.
pub fn registration_envelope(master_password: &str, client: &TestClient, username: &str) -> String {
    let assertion = client.bootstrap_assertion(username, chrono::Utc::now().timestamp());
    statesync_keys::seal(assertion.as_bytes(), master_password).expect("seal envelope")
}
