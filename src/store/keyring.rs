//! OS keychain credential store.

use async_trait::async_trait;
use keyring::Entry;
use tracing::warn;

use super::CredentialStore;

/// Stores records in the platform keychain (macOS Keychain, Windows
/// Credential Manager, Secret Service) under a fixed service name, one entry
/// per key.
///
/// Keychain access can fail outside a desktop session (locked keyring,
/// headless CI); per the `CredentialStore` contract those faults degrade to
/// an absent record.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Option<Entry> {
        match Entry::new(&self.service, key) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(service = %self.service, key, error = %e, "Failed to open keyring entry");
                None
            }
        }
    }
}

#[async_trait]
impl CredentialStore for KeyringStore {
    async fn get(&self, key: &str) -> Option<String> {
        let entry = self.entry(key)?;
        match entry.get_password() {
            Ok(value) => Some(value),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                warn!(key, error = %e, "Failed to read keyring entry");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str) {
        if let Some(entry) = self.entry(key) {
            if let Err(e) = entry.set_password(value) {
                warn!(key, error = %e, "Failed to write keyring entry");
            }
        }
    }

    async fn remove(&self, key: &str) {
        if let Some(entry) = self.entry(key) {
            match entry.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => {}
                Err(e) => {
                    warn!(key, error = %e, "Failed to delete keyring entry");
                }
            }
        }
    }
}
