//! Auth service façade: login, register, refresh, and logout round trips.
//!
//! The sole writer of fresh token pairs into the token manager, and the sole
//! trigger of `clear()` on explicit logout.

use std::sync::Arc;

use futures::FutureExt;
use serde::Serialize;
use tracing::{debug, info};

use crate::api::{ApiClient, ApiError};
use crate::auth::error::AuthError;
use crate::auth::manager::TokenManager;
use crate::auth::tokens::TokenPair;

#[derive(Serialize)]
struct CredentialsBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshBody<'a> {
    refresh_token: &'a str,
}

#[derive(Clone)]
pub struct AuthService {
    api: ApiClient,
    tokens: TokenManager,
}

impl AuthService {
    pub fn new(api: ApiClient, tokens: TokenManager) -> Self {
        Self { api, tokens }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let pair: TokenPair = self
            .api
            .post("/auth/login", &CredentialsBody { email, password })
            .await
            .map_err(|e| match e {
                ApiError::Unauthorized => AuthError::InvalidCredentials,
                e => e.into(),
            })?;
        info!("Login succeeded");
        self.tokens.set_tokens(pair).await;
        Ok(())
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let pair: TokenPair = self
            .api
            .post("/auth/register", &CredentialsBody { email, password })
            .await?;
        info!("Registration succeeded");
        self.tokens.set_tokens(pair).await;
        Ok(())
    }

    /// Exchange the refresh token for a new pair and store it.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        let pair = self.request_refresh().await?;
        self.tokens.set_tokens(pair).await;
        Ok(())
    }

    /// The network half of a refresh. Fails fast, before any round trip that
    /// would certainly 401, when no refresh token is present.
    async fn request_refresh(&self) -> Result<TokenPair, AuthError> {
        let refresh_token = self
            .tokens
            .get_refresh_token()
            .ok_or(AuthError::AuthenticationRequired)?;
        let pair = self
            .api
            .post(
                "/auth/refresh",
                &RefreshBody {
                    refresh_token: &refresh_token,
                },
            )
            .await?;
        Ok(pair)
    }

    /// End the session. The server call is best effort; the local session
    /// dies regardless of whether the backend acknowledged.
    pub async fn logout(&self) {
        if let Err(e) = self
            .api
            .post::<serde_json::Value, _>("/auth/logout", &serde_json::json!({}))
            .await
        {
            debug!(error = %e, "Logout request failed, clearing local session anyway");
        }
        self.tokens.clear().await;
    }

    /// Wire the manager's proactive refresh to this service. The manager
    /// feeds the returned pair back through `set_tokens` itself, under its
    /// generation guard.
    pub fn install_refresh_callback(&self) {
        let service = self.clone();
        self.tokens.set_refresh_callback(Arc::new(move || {
            let service = service.clone();
            async move { service.request_refresh().await }.boxed()
        }));
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::Config;
    use crate::store::MemoryStore;

    fn pair_json(access: &str, expires_in: u64) -> serde_json::Value {
        json!({
            "accessToken": access,
            "refreshToken": format!("r-{}", access),
            "expiresIn": expires_in
        })
    }

    async fn service(server: &MockServer) -> (AuthService, TokenManager) {
        let config = Config {
            base_url: server.uri(),
            ..Config::default()
        };
        let tokens = TokenManager::new(Arc::new(MemoryStore::new()));
        let api = ApiClient::new(&config, tokens.clone()).unwrap();
        (AuthService::new(api, tokens.clone()), tokens)
    }

    #[tokio::test]
    async fn test_login_feeds_token_manager() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(body_json(json!({"email": "t@example.com", "password": "pw"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(pair_json("a1", 3600)))
            .mount(&server)
            .await;

        let (auth, tokens) = service(&server).await;
        auth.login("t@example.com", "pw").await.unwrap();
        assert_eq!(tokens.get_access_token().as_deref(), Some("a1"));
    }

    #[tokio::test]
    async fn test_register_feeds_token_manager() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/register"))
            .and(body_json(json!({"email": "new@example.com", "password": "pw"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(pair_json("a1", 3600)))
            .mount(&server)
            .await;

        let (auth, tokens) = service(&server).await;
        auth.register("new@example.com", "pw").await.unwrap();
        assert_eq!(tokens.get_access_token().as_deref(), Some("a1"));
    }

    #[tokio::test]
    async fn test_login_rejection_maps_to_invalid_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let (auth, tokens) = service(&server).await;
        let err = auth.login("t@example.com", "wrong").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(err.code(), "invalid_credentials");
        assert_eq!(tokens.get_access_token(), None);
    }

    #[tokio::test]
    async fn test_refresh_fails_fast_without_refresh_token() {
        let server = MockServer::start().await;
        // No mock mounted: a request would 404; expect none at all
        let (auth, _) = service(&server).await;
        let err = auth.refresh().await.unwrap_err();
        assert!(matches!(err, AuthError::AuthenticationRequired));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_rotates_pair() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(pair_json("a1", 3600)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .and(body_json(json!({"refreshToken": "r-a1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(pair_json("a2", 3600)))
            .mount(&server)
            .await;

        let (auth, tokens) = service(&server).await;
        auth.login("t@example.com", "pw").await.unwrap();
        auth.refresh().await.unwrap();
        assert_eq!(tokens.get_access_token().as_deref(), Some("a2"));
        assert_eq!(tokens.get_refresh_token().as_deref(), Some("r-a2"));
    }

    #[tokio::test]
    async fn test_logout_clears_even_when_server_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(pair_json("a1", 3600)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/logout"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (auth, tokens) = service(&server).await;
        auth.login("t@example.com", "pw").await.unwrap();
        auth.logout().await;
        assert_eq!(tokens.get_access_token(), None);
        assert_eq!(tokens.get_refresh_token(), None);
    }
}
