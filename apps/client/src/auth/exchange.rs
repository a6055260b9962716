//! Token exchange: login and refresh calls against the auth endpoints.
//!
//! These requests go out on a dedicated `reqwest::Client` that is never
//! wrapped by the retry interceptor: a refresh that itself fails with 401 must
//! not trigger another refresh.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::store::TokenPair;
use crate::errors::AuthError;

const REFRESH_PATH: &str = "/auth/refresh";
const LOGIN_PATH: &str = "/auth/login";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Exchanges a refresh token for a new credential pair.
///
/// The interceptor holds this as `Arc<dyn TokenRefresher>` so tests can swap
/// in a scripted backend.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: String,
}

impl LoginResponse {
    pub fn tokens(&self) -> TokenPair {
        TokenPair {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct HttpTokenExchange {
    client: Client,
    base_url: String,
}

impl HttpTokenExchange {
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            base_url: base_url.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Creates a session from email and password.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AuthError> {
        let response = self
            .client
            .post(self.url(LOGIN_PATH))
            .json(&LoginRequest { email, password })
            .send()
            .await
            .map_err(|e| AuthError::LoginFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::LoginFailed(error_message(status.as_u16(), body)));
        }

        response
            .json::<LoginResponse>()
            .await
            .map_err(|e| AuthError::LoginFailed(format!("invalid login response: {e}")))
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenExchange {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let response = self
            .client
            .post(self.url(REFRESH_PATH))
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .map_err(|e| AuthError::RefreshExchangeFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::RefreshExchangeFailed(error_message(
                status.as_u16(),
                body,
            )));
        }

        let tokens = response
            .json::<TokenPair>()
            .await
            .map_err(|e| AuthError::RefreshExchangeFailed(format!("invalid refresh response: {e}")))?;

        debug!("Refresh exchange succeeded");
        Ok(tokens)
    }
}

/// Prefers the `message` field of a JSON error body, falling back to the raw body.
fn error_message(status: u16, body: String) -> String {
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .map(|e| e.message)
        .unwrap_or(body);
    format!("status {status}: {message}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn spawn_server(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn test_error_message_prefers_json_message() {
        let msg = error_message(401, r#"{"message":"token revoked"}"#.to_string());
        assert_eq!(msg, "status 401: token revoked");
    }

    #[test]
    fn test_error_message_falls_back_to_body() {
        assert_eq!(error_message(502, "bad gateway".to_string()), "status 502: bad gateway");
    }

    #[tokio::test]
    async fn test_refresh_posts_token_and_decodes_pair() {
        let router = Router::new().route(
            "/auth/refresh",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["refreshToken"], "r-old");
                Json(json!({ "accessToken": "a-new", "refreshToken": "r-new" }))
            }),
        );
        let base = spawn_server(router).await;
        let exchange = HttpTokenExchange::new(format!("{base}/")).unwrap();

        let tokens = exchange.refresh("r-old").await.unwrap();
        assert_eq!(tokens.access_token, "a-new");
        assert_eq!(tokens.refresh_token, "r-new");
    }

    #[tokio::test]
    async fn test_refresh_rejection_is_exchange_failure() {
        let router = Router::new().route(
            "/auth/refresh",
            post(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "message": "refresh token expired" })),
                )
            }),
        );
        let base = spawn_server(router).await;
        let exchange = HttpTokenExchange::new(base).unwrap();

        let err = exchange.refresh("r-old").await.unwrap_err();
        assert_eq!(
            err,
            AuthError::RefreshExchangeFailed("status 401: refresh token expired".to_string())
        );
    }

    #[tokio::test]
    async fn test_refresh_undecodable_body_is_exchange_failure() {
        let router = Router::new().route("/auth/refresh", post(|| async { "not json" }));
        let base = spawn_server(router).await;
        let exchange = HttpTokenExchange::new(base).unwrap();

        assert!(matches!(
            exchange.refresh("r").await,
            Err(AuthError::RefreshExchangeFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_login_returns_session() {
        let router = Router::new().route(
            "/auth/login",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["email"], "ada@example.com");
                Json(json!({
                    "accessToken": "a",
                    "refreshToken": "r",
                    "userId": "user-1"
                }))
            }),
        );
        let base = spawn_server(router).await;
        let exchange = HttpTokenExchange::new(base).unwrap();

        let session = exchange.login("ada@example.com", "secret").await.unwrap();
        assert_eq!(session.user_id, "user-1");
        assert_eq!(session.tokens().refresh_token, "r");
    }
}
