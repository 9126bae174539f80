//! HTTP client for the Botdeck REST backend.
//!
//! Attaches bearer tokens from the token manager, normalizes transport
//! failures, and enforces the clear-on-401 policy: any 401 wipes the local
//! session before the error reaches the caller, forcing re-login instead of
//! retry loops with a token the server has rejected.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client, Method};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::auth::TokenManager;
use crate::config::Config;

use super::ApiError;

/// Maximum number of retries for rate-limited (429) requests.
/// 3 retries with exponential backoff usually succeeds without excessive delay.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
/// 1 second is polite to the server while not making users wait too long.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// API client for the Botdeck backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    tokens: TokenManager,
}

impl ApiClient {
    /// Create a new API client with the fixed identification headers baked in
    pub fn new(config: &Config, tokens: TokenManager) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "x-client-name",
            header::HeaderValue::from_str(&config.client_name)
                .context("Invalid client name header")?,
        );
        headers.insert(
            "x-client-version",
            header::HeaderValue::from_str(&config.client_version)
                .context("Invalid client version header")?,
        );
        headers.insert(
            "x-client-platform",
            header::HeaderValue::from_str(&config.platform)
                .context("Invalid client platform header")?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.request(Method::GET, endpoint, None::<&()>).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::POST, endpoint, Some(body)).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::PUT, endpoint, Some(body)).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::PATCH, endpoint, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.request(Method::DELETE, endpoint, None::<&()>).await
    }

    async fn request<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let mut request = self.client.request(method.clone(), &url);
            // Bearer attached only while the manager holds a valid token;
            // otherwise the request goes out unauthenticated and the server
            // rejects it itself
            if let Some(token) = self.tokens.get_access_token() {
                request = request.bearer_auth(token);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await.map_err(ApiError::from_transport)?;
            let status = response.status();

            if status.is_success() {
                let text = response.text().await.map_err(ApiError::from_transport)?;
                return Self::parse_body(&text, &url);
            }

            if status.as_u16() == 401 {
                warn!(url = %url, "Server rejected credentials, clearing local session");
                self.tokens.clear().await;
                return Err(ApiError::Unauthorized);
            }

            if status.as_u16() == 429 {
                retries += 1;
                if retries > MAX_RATE_LIMIT_RETRIES {
                    return Err(ApiError::RateLimited);
                }
                warn!(url = %url, retry = retries, backoff_ms, "Rate limited, backing off");
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms *= 2;
                continue;
            }

            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &text));
        }
    }

    fn parse_body<T: DeserializeOwned>(text: &str, url: &str) -> Result<T, ApiError> {
        // Some endpoints (logout, deletes) answer with an empty body
        let text = if text.trim().is_empty() { "null" } else { text };
        serde_json::from_str(text).map_err(|e| {
            debug!(url, error = %e, "Failed to parse response body");
            ApiError::InvalidResponse(format!("Failed to parse response from {}: {}", url, e))
        })
    }
}
