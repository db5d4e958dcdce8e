//! Cross-crate authentication flow: key material, envelopes, assertions,
//! and session tokens working together the way the handlers drive them.

mod common;

use common::{registration_envelope, TestClient, EXTERNAL_URL, MASTER_PASSWORD};

use chrono::Utc;
use statesync_accounts::{peek_assertion, verify_assertion_signature, ChallengeStore};
use statesync_auth::{mint_session_token, AuthIdentity, UserRole};
use statesync_keys::{unseal, ServerKeys};

fn server_keys() -> ServerKeys {
    ServerKeys::derive(MASTER_PASSWORD, EXTERNAL_URL).unwrap()
}

#[test]
fn test_deterministic_keys_across_boots() {
    // Two "boots" of the same deployment agree byte-for-byte
    let first_boot = server_keys();
    let second_boot = server_keys();
    assert_eq!(first_boot.public_key_pem(), second_boot.public_key_pem());
    assert_eq!(first_boot.fingerprint(), second_boot.fingerprint());

    // A different deployment URL is a different identity
    let other_deployment = ServerKeys::derive(MASTER_PASSWORD, "https://prod.example.com").unwrap();
    assert_ne!(first_boot.public_key_pem(), other_deployment.public_key_pem());
}

#[test]
fn test_owner_bootstrap_envelope_flow() {
    let client = TestClient::generate();
    let envelope = registration_envelope(MASTER_PASSWORD, &client, "ada");

    // Server side: unseal with the master secret, then bind to the key
    let inner = unseal(&envelope, MASTER_PASSWORD).unwrap();
    let assertion = String::from_utf8(inner).unwrap();

    let claims = peek_assertion(&assertion).unwrap();
    assert_eq!(claims.username.as_deref(), Some("ada"));
    assert_eq!(claims.public_key, client.public_pem);
    assert!(Utc::now().timestamp() - claims.iat <= 10);

    assert!(verify_assertion_signature(&assertion, &claims.public_key));
}

#[test]
fn test_owner_bootstrap_envelope_rejects_wrong_master_password() {
    let client = TestClient::generate();
    let envelope = registration_envelope(MASTER_PASSWORD, &client, "ada");
    assert!(unseal(&envelope, "wrong password").is_err());
}

#[test]
fn test_bootstrap_signature_must_match_asserted_key() {
    let client = TestClient::generate();
    let impostor = TestClient::generate();
    let assertion = client.bootstrap_assertion("ada", Utc::now().timestamp());

    // Signature verifies against the signer's key, not anyone else's
    assert!(verify_assertion_signature(&assertion, &client.public_pem));
    assert!(!verify_assertion_signature(&assertion, &impostor.public_pem));
}

#[test]
fn test_challenge_login_flow() {
    let keys = server_keys();
    let client = TestClient::generate();
    let challenges = ChallengeStore::new(300);

    // Server issues a challenge for this key
    let issued = challenges.issue(&client.public_pem);

    // Client signs it back
    let assertion = client.login_assertion(&issued.nonce, Utc::now().timestamp());
    let claims = peek_assertion(&assertion).unwrap();
    assert!(verify_assertion_signature(&assertion, &client.public_pem));

    // Challenge matches and is fresh
    let stored = challenges.lookup(&client.public_pem).unwrap();
    assert_eq!(Some(stored.nonce.as_str()), claims.challenge.as_deref());
    assert!(!stored.is_expired(Utc::now()));

    // Consumed on success
    challenges.remove(&client.public_pem);
    assert!(challenges.lookup(&client.public_pem).is_none());

    // Session token round-trips against the server key
    let identity = AuthIdentity {
        public_key: client.public_pem.clone(),
        username: "ada".to_string(),
        role: UserRole::Owner,
        created_at: Utc::now(),
    };
    let (token, expires_at) = mint_session_token(&keys, &identity, 24).unwrap();
    assert!(expires_at > Utc::now().timestamp());
    assert!(!token.is_empty());
}

#[test]
fn test_challenge_mismatch_does_not_consume_entry() {
    let client = TestClient::generate();
    let challenges = ChallengeStore::new(300);
    let issued = challenges.issue(&client.public_pem);

    // A stale or fabricated nonce mismatches; the stored entry survives so
    // the client can retry with the right one
    let assertion = client.login_assertion("not-the-nonce", Utc::now().timestamp());
    let claims = peek_assertion(&assertion).unwrap();
    let stored = challenges.lookup(&client.public_pem).unwrap();
    assert_ne!(Some(stored.nonce.as_str()), claims.challenge.as_deref());

    assert!(challenges.lookup(&client.public_pem).is_some());
    assert_eq!(
        challenges.lookup(&client.public_pem).unwrap().nonce,
        issued.nonce
    );
}
