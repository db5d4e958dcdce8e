//! Ephemeral login challenges
//!
//! One outstanding challenge per public key. The map is process-local state:
//! a restart drops all pending logins, which only costs clients one extra
//! round-trip. All operations are O(1) under a single mutex; expired entries
//! are dropped when touched and the whole map is swept on each insert.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use std::collections::HashMap;
use std::sync::Mutex;

const NONCE_BYTES: usize = 32;

/// A stored challenge awaiting a signed response
#[derive(Debug, Clone, PartialEq)]
pub struct ChallengeEntry {
    pub nonce: String,
    pub expires_at: DateTime<Utc>,
}

impl ChallengeEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Shared challenge map, keyed by public key
pub struct ChallengeStore {
    ttl: Duration,
    entries: Mutex<HashMap<String, ChallengeEntry>>,
}

impl ChallengeStore {
    pub fn new(ttl_sec: i64) -> Self {
        Self {
            ttl: Duration::seconds(ttl_sec),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a fresh challenge for a public key, replacing any outstanding
    /// one. Expired entries across the whole map are swept here so the map
    /// cannot grow unbounded on abandoned logins.
    pub fn issue(&self, public_key: &str) -> ChallengeEntry {
        let mut nonce_bytes = [0u8; NONCE_BYTES];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);

        let entry = ChallengeEntry {
            nonce: URL_SAFE_NO_PAD.encode(nonce_bytes),
            expires_at: Utc::now() + self.ttl,
        };

        let mut entries = self.entries.lock().expect("challenge store poisoned");
        let now = Utc::now();
        entries.retain(|_, e| !e.is_expired(now));
        entries.insert(public_key.to_string(), entry.clone());
        entry
    }

    /// Look up the outstanding challenge for a public key without consuming
    /// it. Expired entries are still returned so the caller can distinguish
    /// "expired" from "never issued".
    pub fn lookup(&self, public_key: &str) -> Option<ChallengeEntry> {
        let entries = self.entries.lock().expect("challenge store poisoned");
        entries.get(public_key).cloned()
    }

    /// Remove the challenge for a public key (on success or observed expiry).
    pub fn remove(&self, public_key: &str) {
        let mut entries = self.entries.lock().expect("challenge store poisoned");
        entries.remove(public_key);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_lookup() {
        let store = ChallengeStore::new(300);
        let issued = store.issue("PK-A");
        assert!(!issued.nonce.is_empty());

        let found = store.lookup("PK-A").unwrap();
        assert_eq!(found, issued);
        assert!(store.lookup("PK-B").is_none());
    }

    #[test]
    fn test_issue_replaces_outstanding_challenge() {
        let store = ChallengeStore::new(300);
        let first = store.issue("PK-A");
        let second = store.issue("PK-A");
        assert_ne!(first.nonce, second.nonce);
        assert_eq!(store.lookup("PK-A").unwrap(), second);
    }

    #[test]
    fn test_remove_consumes_entry() {
        let store = ChallengeStore::new(300);
        store.issue("PK-A");
        store.remove("PK-A");
        assert!(store.lookup("PK-A").is_none());
    }

    #[test]
    fn test_expired_entries_swept_on_insert() {
        let store = ChallengeStore::new(-1); // already expired on issue
        store.issue("PK-A");
        store.issue("PK-B");
        // The sweep runs before inserting PK-B, dropping PK-A
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_expired_entry_still_returned_by_lookup() {
        let store = ChallengeStore::new(-1);
        store.issue("PK-A");
        let entry = store.lookup("PK-A").unwrap();
        assert!(entry.is_expired(Utc::now()));
    }
}
