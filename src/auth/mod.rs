//! Authentication module: session token lifecycle and auth flows.
//!
//! This module provides:
//! - `TokenManager`: in-memory token state, proactive refresh scheduling, persistence
//! - `AuthService`: login/register/refresh/logout round trips feeding the manager
//! - `state`: the pure session state machine the manager executes
//!
//! Sessions are persisted as a single record in the credential store and
//! refreshed 60 seconds before expiry.

pub mod error;
pub mod manager;
pub mod service;
pub mod state;
pub mod tokens;

pub use error::AuthError;
pub use manager::{RefreshCallback, SessionExpiredCallback, TokenManager};
pub use service::AuthService;
pub use tokens::{StoredTokenRecord, TokenPair, REFRESH_BUFFER};
