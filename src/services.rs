//! Shared service bundle.
//!
//! One `Services` value is constructed at app startup and handed to every
//! consumer, replacing lazily-initialized module-level clients. There is no
//! "not yet initialized" failure mode: if construction succeeds, every
//! handle inside is usable.

use std::sync::Arc;

use anyhow::Result;

use crate::api::ApiClient;
use crate::auth::{AuthService, TokenManager};
use crate::config::Config;
use crate::store::{CredentialStore, FileStore};

/// The app's shared client stack: one token manager, one API client, one
/// auth service, all wired together. Clone is cheap; all members are handles.
#[derive(Clone)]
pub struct Services {
    pub tokens: TokenManager,
    pub api: ApiClient,
    pub auth: AuthService,
}

impl Services {
    /// Build against the default file-backed credential store.
    pub fn new(config: &Config) -> Result<Self> {
        let dir = config.credential_dir()?;
        Self::with_store(config, Arc::new(FileStore::new(dir)))
    }

    /// Build with an explicit credential store (keyring, in-memory, ...).
    pub fn with_store(config: &Config, store: Arc<dyn CredentialStore>) -> Result<Self> {
        let tokens = TokenManager::new(store);
        let api = ApiClient::new(config, tokens.clone())?;
        let auth = AuthService::new(api.clone(), tokens.clone());
        auth.install_refresh_callback();

        // Fire and forget: reads before hydration completes see an empty
        // session and fall back to the login flow
        let hydrating = tokens.clone();
        tokio::spawn(async move { hydrating.hydrate().await });

        Ok(Self { tokens, api, auth })
    }
}
