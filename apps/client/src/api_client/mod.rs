//! API client: the single entry point for authenticated calls to the Meetspace backend.
//!
//! Every request gets the stored access token as a bearer header. Failed
//! responses go through the `RefreshInterceptor`, which may ask for exactly one
//! replay after rotating the tokens. Auth endpoints do NOT go through here; see
//! `auth::exchange`.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, Request, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::auth::interceptor::{FailedAttempt, RefreshInterceptor, RetryDecision};
use crate::auth::store::{CredentialKey, CredentialStore};
use crate::errors::ClientError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    store: Arc<dyn CredentialStore>,
    interceptor: Arc<RefreshInterceptor>,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        store: Arc<dyn CredentialStore>,
        interceptor: Arc<RefreshInterceptor>,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            base_url: base_url.into(),
            store,
            interceptor,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Starts a request against `path`. Finish it with `build()` and pass it to `send`.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    /// Executes `request` with the current access token.
    ///
    /// On a non-success status the interceptor decides; a `Retry` replays a
    /// clone of the original request with whatever token the store now holds.
    /// Transport errors are returned as-is.
    pub async fn send(&self, request: Request) -> Result<Response, ClientError> {
        let mut retry_count = 0u32;

        loop {
            let mut attempt = request
                .try_clone()
                .ok_or(ClientError::RequestNotReplayable)?;

            let access_token = self.access_token();
            if let Some(token) = &access_token {
                let value = HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|_| ClientError::InvalidToken)?;
                attempt.headers_mut().insert(AUTHORIZATION, value);
            }

            let method = attempt.method().clone();
            let url = attempt.url().clone();
            let response = self.client.execute(attempt).await?;
            let status = response.status();

            if status.is_success() {
                debug!(%method, %url, status = status.as_u16(), retry_count, "API call succeeded");
                return Ok(response);
            }

            let body = response.text().await.unwrap_or_default();
            warn!(%method, %url, status = status.as_u16(), "API call failed");
            let error = ClientError::Status {
                status: status.as_u16(),
                message: body,
            };

            let failed = FailedAttempt {
                status,
                retry_count,
                access_token,
            };
            match self.interceptor.intercept(&failed, error).await {
                RetryDecision::Retry => retry_count += 1,
                RetryDecision::DoNotRetry(e) => return Err(e),
            }
        }
    }

    /// GET `path` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let request = self.request(Method::GET, path).build()?;
        decode(self.send(request).await?).await
    }

    /// POST `body` as JSON to `path` and decode the JSON response.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::POST, path).json(body).build()?;
        decode(self.send(request).await?).await
    }

    fn access_token(&self) -> Option<String> {
        match self.store.get(CredentialKey::AccessToken) {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Could not read access token, sending unauthenticated");
                None
            }
        }
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
