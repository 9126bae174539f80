//! Persistent credential storage.
//!
//! This module provides:
//! - `CredentialStore`: the async key-value contract the token manager persists through
//! - `FileStore`: JSON files under an app directory
//! - `KeyringStore`: OS keychain via keyring
//! - `MemoryStore`: in-process map for tests and ephemeral sessions
//!
//! All implementations are fail-silent: a storage fault degrades to "absent"
//! for reads and "best effort, ignored" for writes, never to an error the
//! caller has to handle. An unreadable store means the user re-authenticates;
//! it must not crash the application.

pub mod file;
pub mod keyring;

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

pub use self::file::FileStore;
pub use self::keyring::KeyringStore;

/// Async key-value storage for a single namespaced credential record.
///
/// Implementations never return errors; faults are logged and swallowed.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Read the value for `key`, or `None` if absent or unreadable.
    async fn get(&self, key: &str) -> Option<String>;

    /// Write `value` under `key`. Best effort; failures are ignored.
    async fn set(&self, key: &str, value: &str);

    /// Remove `key`. Best effort; removing an absent key is not a fault.
    async fn remove(&self, key: &str);
}

/// In-process store backed by a map. No durability; useful for tests and
/// sessions that should not outlive the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    async fn set(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    async fn remove(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }
}
