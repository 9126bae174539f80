//! Core library for Botdeck - API client, auth session, token lifecycle.
//!
//! The mobile frontends drive all business logic through the hosted REST
//! backend; this crate owns the one stateful piece that lives on-device: the
//! authentication session. [`TokenManager`] keeps the in-memory token state,
//! schedules the proactive refresh, and persists the record through a
//! [`CredentialStore`]; [`ApiClient`] attaches bearer tokens and enforces
//! the clear-on-401 policy; [`AuthService`] performs the auth round trips;
//! [`Services`] bundles one of each per process.

pub mod api;
pub mod auth;
pub mod config;
pub mod services;
pub mod store;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthError, AuthService, TokenManager, TokenPair};
pub use config::Config;
pub use services::Services;
pub use store::{CredentialStore, FileStore, KeyringStore, MemoryStore};
