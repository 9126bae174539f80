use thiserror::Error;

use crate::api::ApiError;

/// Authentication flow errors.
///
/// Every variant carries a stable `code()` so the UI layer can map failures
/// without string-matching messages.
#[derive(Error, Debug)]
pub enum AuthError {
    /// No usable credentials; the user must log in
    #[error("Authentication required")]
    AuthenticationRequired,

    /// The server rejected the supplied email/password
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl AuthError {
    pub fn code(&self) -> &str {
        match self {
            AuthError::AuthenticationRequired => "auth_required",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::Api(e) => e.code(),
        }
    }
}
