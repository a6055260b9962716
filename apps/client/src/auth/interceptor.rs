//! Refresh-and-retry interceptor for authenticated requests.
//!
//! # Flow per failed request
//! - Status is not the expiry signal, or the request was already retried once
//!   → `DoNotRetry` with the original error, untouched.
//! - No refresh token in the store → clear the store, broadcast forced logout,
//!   `DoNotRetry(SessionExpired)`. No network call.
//! - Refresh exchange succeeds → persist the new pair, `Retry`.
//! - Refresh exchange fails or times out → clear the store, broadcast forced
//!   logout, `DoNotRetry(SessionExpired)`.
//!
//! # Single-flight
//! Refreshes are serialized behind an async mutex. Each failed attempt carries
//! the access token it was sent with; a caller that gets the lock after
//! another caller already rotated that token skips the exchange and retries
//! with the fresh one.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::auth::exchange::TokenRefresher;
use crate::auth::session::SessionEvents;
use crate::auth::store::{CredentialKey, CredentialStore};
use crate::errors::{AuthError, ClientError};

/// At most one refresh cycle per original request.
pub const MAX_AUTH_RETRIES: u32 = 1;
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// What the interceptor sees about one failed attempt.
#[derive(Debug, Clone)]
pub struct FailedAttempt {
    pub status: StatusCode,
    /// How many times this request has already been retried.
    pub retry_count: u32,
    /// Access token the failed attempt was sent with, if any.
    pub access_token: Option<String>,
}

#[derive(Debug)]
pub enum RetryDecision {
    Retry,
    DoNotRetry(ClientError),
}

impl RetryDecision {
    pub fn is_retry(&self) -> bool {
        matches!(self, RetryDecision::Retry)
    }
}

/// Outcome of the serialized refresh step.
enum RefreshOutcome {
    /// This caller ran the exchange and stored the new pair.
    Refreshed,
    /// Another caller rotated the token while this one waited.
    AlreadyRotated,
}

// ────────────────────────────────────────────────────────────────────────────
// Interceptor
// ────────────────────────────────────────────────────────────────────────────

pub struct RefreshInterceptor {
    store: Arc<dyn CredentialStore>,
    refresher: Arc<dyn TokenRefresher>,
    events: SessionEvents,
    expired_status: StatusCode,
    refresh_timeout: Duration,
    refresh_lock: Mutex<()>,
}

impl RefreshInterceptor {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        refresher: Arc<dyn TokenRefresher>,
        events: SessionEvents,
    ) -> Self {
        Self {
            store,
            refresher,
            events,
            expired_status: StatusCode::UNAUTHORIZED,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Status code that signals an expired access token (default 401).
    pub fn with_expired_status(mut self, status: StatusCode) -> Self {
        self.expired_status = status;
        self
    }

    /// Upper bound on a single refresh exchange (default 10s).
    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    pub fn events(&self) -> &SessionEvents {
        &self.events
    }

    /// Decides whether the caller should replay a failed request.
    ///
    /// `error` is the failure the request produced; it is returned unchanged
    /// unless the refresh cycle turns it into `SessionExpired`.
    pub async fn intercept(&self, attempt: &FailedAttempt, error: ClientError) -> RetryDecision {
        if attempt.status != self.expired_status {
            return RetryDecision::DoNotRetry(error);
        }
        if attempt.retry_count >= MAX_AUTH_RETRIES {
            debug!(
                status = attempt.status.as_u16(),
                "Request still unauthorized after refresh, giving up"
            );
            return RetryDecision::DoNotRetry(error);
        }

        match self.refresh(attempt.access_token.as_deref()).await {
            Ok(RefreshOutcome::Refreshed) => {
                info!("Access token refreshed, retrying request");
                RetryDecision::Retry
            }
            Ok(RefreshOutcome::AlreadyRotated) => {
                debug!("Access token rotated by a concurrent refresh, retrying request");
                RetryDecision::Retry
            }
            Err(cause) => RetryDecision::DoNotRetry(ClientError::SessionExpired {
                status: attempt.status.as_u16(),
                message: failure_message(error),
                cause,
            }),
        }
    }

    async fn refresh(&self, stale_access: Option<&str>) -> Result<RefreshOutcome, AuthError> {
        let _guard = self.refresh_lock.lock().await;

        // An unreadable access token says nothing about rotation; fall through
        // to the refresh-token path, which expires the session on its own.
        match (stale_access, self.store.get(CredentialKey::AccessToken)) {
            (Some(stale), Ok(Some(current))) if stale != current => {
                return Ok(RefreshOutcome::AlreadyRotated);
            }
            (Some(_), Ok(None)) => {
                // Session already torn down by a concurrent failure; its
                // logout broadcast has gone out.
                return Err(AuthError::RefreshTokenMissing);
            }
            (_, Err(e)) => {
                warn!(error = %e, "Could not read access token before refresh");
            }
            _ => {}
        }

        let Some(refresh_token) = self.read(CredentialKey::RefreshToken) else {
            warn!("Access token expired and no refresh token is stored");
            self.expire_session();
            return Err(AuthError::RefreshTokenMissing);
        };

        let exchanged =
            match tokio::time::timeout(self.refresh_timeout, self.refresher.refresh(&refresh_token))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(AuthError::RefreshExchangeFailed(format!(
                    "timed out after {}ms",
                    self.refresh_timeout.as_millis()
                ))),
            };

        let result = exchanged.and_then(|tokens| {
            self.store.save_tokens(&tokens).map_err(|e| {
                AuthError::RefreshExchangeFailed(format!("could not persist refreshed tokens: {e}"))
            })
        });

        match result {
            Ok(()) => Ok(RefreshOutcome::Refreshed),
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                self.expire_session();
                Err(e)
            }
        }
    }

    /// Store read failures are treated as an absent value.
    fn read(&self, key: CredentialKey) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = key.as_str(), error = %e, "Credential store read failed");
                None
            }
        }
    }

    fn expire_session(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear credential store");
        }
        self.events.notify_forced_logout();
    }
}

/// Response body of the original failure, or its rendering for non-status errors.
fn failure_message(error: ClientError) -> String {
    match error {
        ClientError::Status { message, .. } => message,
        other => other.to_string(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
