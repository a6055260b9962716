use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::StatusCode;

use crate::api_client::ApiClient;
use crate::auth::{
    CredentialStore, FileCredentialStore, HttpTokenExchange, RefreshInterceptor, SessionEvents,
};
use crate::config::Config;
use crate::layout::MasonryLayout;

/// Everything the client needs, wired once at startup and passed explicitly.
#[derive(Clone)]
pub struct ClientState {
    pub config: Config,
    pub store: Arc<dyn CredentialStore>,
    pub events: SessionEvents,
    /// Out-of-band auth calls (login, refresh). Never retried by the interceptor.
    pub exchange: Arc<HttpTokenExchange>,
    pub api: ApiClient,
    /// Grid configuration for the spaces feed.
    pub feed_layout: MasonryLayout,
}

impl ClientState {
    /// Builds the state around a file-backed credential store.
    pub fn from_config(config: Config) -> Result<Self> {
        let store: Arc<dyn CredentialStore> =
            Arc::new(FileCredentialStore::new(config.credentials_path.clone()));
        Self::with_store(config, store)
    }

    pub fn with_store(config: Config, store: Arc<dyn CredentialStore>) -> Result<Self> {
        let events = SessionEvents::new();
        let exchange = Arc::new(
            HttpTokenExchange::new(config.api_url.clone())
                .context("Failed to build auth HTTP client")?,
        );
        let expired_status = StatusCode::from_u16(config.auth_expired_status)
            .context("AUTH_EXPIRED_STATUS must be a valid HTTP status code")?;

        let interceptor = Arc::new(
            RefreshInterceptor::new(store.clone(), exchange.clone(), events.clone())
                .with_expired_status(expired_status)
                .with_refresh_timeout(config.refresh_timeout),
        );
        let api = ApiClient::new(config.api_url.clone(), store.clone(), interceptor)
            .context("Failed to build API HTTP client")?;
        let feed_layout = MasonryLayout::new(config.feed_columns, config.feed_spacing)
            .context("Invalid feed grid configuration")?;

        Ok(Self {
            config,
            store,
            events,
            exchange,
            api,
            feed_layout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryCredentialStore;
    use std::path::PathBuf;
    use std::time::Duration;

    fn config() -> Config {
        Config {
            api_url: "http://127.0.0.1:9".to_string(),
            credentials_path: PathBuf::from("unused.json"),
            email: None,
            password: None,
            feed_columns: 2,
            feed_spacing: 8.0,
            feed_width: 390.0,
            refresh_timeout: Duration::from_secs(10),
            auth_expired_status: 401,
            rust_log: "info".to_string(),
        }
    }

    #[test]
    fn test_state_builds_from_valid_config() {
        let state = ClientState::with_store(config(), Arc::new(MemoryCredentialStore::new())).unwrap();
        assert_eq!(state.feed_layout.columns(), 2);
    }

    #[test]
    fn test_zero_columns_rejected_at_startup() {
        let mut cfg = config();
        cfg.feed_columns = 0;
        assert!(ClientState::with_store(cfg, Arc::new(MemoryCredentialStore::new())).is_err());
    }

    #[test]
    fn test_invalid_expired_status_rejected() {
        let mut cfg = config();
        cfg.auth_expired_status = 42;
        assert!(ClientState::with_store(cfg, Arc::new(MemoryCredentialStore::new())).is_err());
    }
}
