//! Deterministic server keypair derivation and signing
//!
//! The keypair is a pure function of `(master_password, external_url)`: the
//! two inputs are hashed into initial keying material, expanded through
//! HKDF-SHA256 into a 32-byte seed, and the seeded ChaCha20 stream cipher
//! acts as the CSPRNG driving RSA-2048 generation. The OS entropy pool is
//! never consulted, so the same deployment always boots with the same keys
//! and a different external URL yields a different keypair.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header};
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::KeyError;

/// Domain separation string for the HKDF expand step
const HKDF_INFO: &[u8] = b"statesync server key v1";

/// RSA modulus size for the server signing key
const RSA_BITS: usize = 2048;

/// The server's asymmetric key material, derived once at boot.
#[derive(Clone)]
pub struct ServerKeys {
    private: RsaPrivateKey,
    public: RsaPublicKey,
    private_key_pem: String,
    public_key_pem: String,
    fingerprint: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl ServerKeys {
    /// Derive the deterministic server keypair from the master secret and
    /// the deployment's public URL.
    pub fn derive(master_password: &str, external_url: &str) -> Result<Self, KeyError> {
        if master_password.is_empty() || external_url.is_empty() {
            return Err(KeyError::EmptyDerivationInput);
        }

        let mut hasher = Sha256::new();
        hasher.update(master_password.as_bytes());
        hasher.update(external_url.as_bytes());
        let ikm = hasher.finalize();

        let hk = hkdf::Hkdf::<Sha256>::new(None, &ikm);
        let mut seed = [0u8; 32];
        hk.expand(HKDF_INFO, &mut seed)
            .map_err(|e| KeyError::Encoding(format!("HKDF expand failed: {}", e)))?;

        let mut rng = ChaCha20Rng::from_seed(seed);
        let private = RsaPrivateKey::new(&mut rng, RSA_BITS)?;
        let public = RsaPublicKey::from(&private);

        let private_key_pem = private
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| KeyError::Encoding(format!("private key PEM: {}", e)))?
            .to_string();
        let public_key_pem = public
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| KeyError::Encoding(format!("public key PEM: {}", e)))?;

        let fingerprint = format!("sha256:{}", hex::encode(Sha256::digest(&public_key_pem)));

        let encoding_key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())?;
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())?;

        Ok(Self {
            private,
            public,
            private_key_pem,
            public_key_pem,
            fingerprint,
            encoding_key,
            decoding_key,
        })
    }

    /// Sign arbitrary bytes with the server key (PKCS#1 v1.5 over SHA-256).
    pub fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, KeyError> {
        let digest = Sha256::digest(payload);
        Ok(self.private.sign(Pkcs1v15Sign::new::<Sha256>(), &digest)?)
    }

    /// Verify a signature produced by [`ServerKeys::sign`].
    pub fn verify(&self, payload: &[u8], signature: &[u8]) -> bool {
        let digest = Sha256::digest(payload);
        self.public
            .verify(Pkcs1v15Sign::new::<Sha256>(), &digest, signature)
            .is_ok()
    }

    /// Mint an RS256 token over the given claims.
    pub fn sign_claims<T: Serialize>(&self, claims: &T) -> Result<String, KeyError> {
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::RS256),
            claims,
            &self.encoding_key,
        )?)
    }

    /// The public half in PEM form, handed to clients for pinning.
    pub fn public_key_pem(&self) -> &str {
        &self.public_key_pem
    }

    /// The private half in PEM form. Only ever written into a sealed
    /// envelope; never logged, never sent over the wire.
    pub fn private_key_pem(&self) -> &str {
        &self.private_key_pem
    }

    /// `sha256:<hex>` fingerprint of the public PEM.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Verification key for tokens signed by this server.
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

// Private key material must not leak through debug formatting.
impl std::fmt::Debug for ServerKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerKeys")
            .field("fingerprint", &self.fingerprint)
            .finish_non_exhaustive()
    }
}
