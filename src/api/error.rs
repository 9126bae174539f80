use serde::Deserialize;
use thiserror::Error;

/// API error taxonomy.
///
/// `Network` is "could not reach the server" (timeout, DNS, connection
/// reset) and looks retryable; every other variant means the server
/// answered. Each variant carries a stable `code()` for UI-layer mapping.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Structured error envelope from the backend:
    /// `{ "error": { "code", "message", "details?" } }`
    #[error("{message} ({code})")]
    Api { code: String, message: String },
}

/// Standard JSON error envelope the backend wraps failures in
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(default)]
    #[allow(dead_code)]
    details: Option<serde_json::Value>,
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid dragging large payloads into logs
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..MAX_ERROR_BODY_LENGTH],
                body.len()
            )
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        // 401 is always Unauthorized regardless of envelope contents: the
        // client's clear-on-401 policy keys off this variant
        if status.as_u16() == 401 {
            return ApiError::Unauthorized;
        }
        if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
            return ApiError::Api {
                code: envelope.error.code,
                message: envelope.error.message,
            };
        }
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// Normalize a transport-level failure. Decode errors surface as
    /// `InvalidResponse` so callers can tell a malformed reply apart from an
    /// unreachable server.
    pub fn from_transport(error: reqwest::Error) -> Self {
        if error.is_decode() {
            ApiError::InvalidResponse(error.to_string())
        } else {
            ApiError::Network(error)
        }
    }

    pub fn code(&self) -> &str {
        match self {
            ApiError::Unauthorized => "unauthorized",
            ApiError::AccessDenied(_) => "access_denied",
            ApiError::NotFound(_) => "not_found",
            ApiError::RateLimited => "rate_limited",
            ApiError::ServerError(_) => "server_error",
            ApiError::Network(_) => "network_error",
            ApiError::InvalidResponse(_) => "invalid_response",
            ApiError::Api { code, .. } => code,
        }
    }
}
