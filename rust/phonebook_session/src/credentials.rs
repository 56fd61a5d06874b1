//! Credential store contract and the bundled in-memory implementation.

use std::path::Path;

use ahash::AHashMap;
use parking_lot::RwLock;
use phonebook_core::{RoleId, Uid};
use serde::{Deserialize, Serialize};

use crate::error::Result;

const PASSWORD_CONTEXT: &str = "phonebook password digest v1";

/// Profile data copied into a new session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub uid: Uid,
    pub username: String,
    pub display_name: String,
    pub rid: RoleId,
    #[serde(default)]
    pub image: Option<String>,
}

/// Verifies sign-in credentials and returns account profiles.
///
/// Called outside any arbiter, so implementations may block on I/O.
pub trait CredentialStore: Send + Sync {
    fn verify(&self, username: &str, secret: &str) -> Option<Uid>;
    fn profile(&self, uid: Uid) -> Option<Account>;
}

/// One entry of an accounts seed file.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountSeed {
    #[serde(flatten)]
    pub account: Account,
    pub password: String,
}

struct Stored {
    account: Account,
    digest: blake3::Hash,
}

/// Accounts held in memory with BLAKE3 password digests.
#[derive(Default)]
pub struct MemoryCredentialStore {
    by_uid: RwLock<AHashMap<Uid, Stored>>,
    by_username: RwLock<AHashMap<String, Uid>>,
}

fn digest(username: &str, secret: &str) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new_derive_key(PASSWORD_CONTEXT);
    hasher.update(username.as_bytes());
    hasher.update(&[0]);
    hasher.update(secret.as_bytes());
    hasher.finalize()
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON array of [`AccountSeed`].
    pub fn from_json(json: &str) -> Result<Self> {
        let seeds: Vec<AccountSeed> = serde_json::from_str(json)?;
        let store = Self::new();
        for s in seeds {
            store.insert(s.account, &s.password);
        }
        Ok(store)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let store = Self::from_json(&std::fs::read_to_string(path)?)?;
        tracing::info!(path = %path.display(), count = store.len(), "accounts loaded");
        Ok(store)
    }

    /// Add or replace an account. Usernames are matched case-insensitively.
    pub fn insert(&self, account: Account, password: &str) {
        let key = account.username.to_lowercase();
        let stored = Stored {
            digest: digest(&key, password),
            account,
        };
        let uid = stored.account.uid;
        let mut by_uid = self.by_uid.write();
        let mut by_username = self.by_username.write();
        if let Some(prev) = by_uid.insert(uid, stored) {
            by_username.remove(&prev.account.username.to_lowercase());
        }
        by_username.insert(key, uid);
    }

    pub fn len(&self) -> usize {
        self.by_uid.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_uid.read().is_empty()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn verify(&self, username: &str, secret: &str) -> Option<Uid> {
        let key = username.trim().to_lowercase();
        let uid = *self.by_username.read().get(&key)?;
        let by_uid = self.by_uid.read();
        let stored = by_uid.get(&uid)?;
        // blake3::Hash equality is constant time.
        (stored.digest == digest(&key, secret)).then_some(uid)
    }

    fn profile(&self, uid: Uid) -> Option<Account> {
        self.by_uid.read().get(&uid).map(|s| s.account.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(uid: Uid, username: &str) -> Account {
        Account {
            uid,
            username: username.into(),
            display_name: username.to_uppercase(),
            rid: 1,
            image: None,
        }
    }

    #[test]
    fn test_verify() {
        let store = MemoryCredentialStore::new();
        store.insert(account(4, "bthorne"), "s3cret");

        assert_eq!(store.verify("bthorne", "s3cret"), Some(4));
        assert_eq!(store.verify("BThorne", "s3cret"), Some(4));
        assert_eq!(store.verify("bthorne", "wrong"), None);
        assert_eq!(store.verify("nobody", "s3cret"), None);
        assert_eq!(store.profile(4).unwrap().display_name, "BTHORNE");
    }

    #[test]
    fn test_rename_drops_old_username() {
        let store = MemoryCredentialStore::new();
        store.insert(account(4, "old"), "pw");
        store.insert(account(4, "new"), "pw");

        assert_eq!(store.verify("old", "pw"), None);
        assert_eq!(store.verify("new", "pw"), Some(4));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_from_json() {
        let store = MemoryCredentialStore::from_json(
            r#"[{"uid": 1, "username": "admin", "display_name": "Admin", "rid": 1,
                 "image": "/images/1.png", "password": "changeme"}]"#,
        )
        .unwrap();
        assert_eq!(store.verify("admin", "changeme"), Some(1));
        assert_eq!(store.profile(1).unwrap().image.as_deref(), Some("/images/1.png"));
    }
}
