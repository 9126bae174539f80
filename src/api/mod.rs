//! REST API client module for the Botdeck backend.
//!
//! This module provides the `ApiClient` for authenticated requests against
//! the bot, org, and wallet endpoints, and the `ApiError` taxonomy shared by
//! the auth flows.
//!
//! The API uses bearer token authentication; tokens come from the
//! `TokenManager` and any 401 response wipes the local session.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
