use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Client configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub credentials_path: PathBuf,
    pub email: Option<String>,
    pub password: Option<String>,
    pub feed_columns: usize,
    pub feed_spacing: f32,
    pub feed_width: f32,
    pub refresh_timeout: Duration,
    pub auth_expired_status: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            api_url: require_env("MEETSPACE_API_URL")?,
            credentials_path: PathBuf::from(
                optional_env("MEETSPACE_CREDENTIALS_PATH")
                    .unwrap_or_else(|| ".meetspace/credentials.json".to_string()),
            ),
            email: optional_env("MEETSPACE_EMAIL"),
            password: optional_env("MEETSPACE_PASSWORD"),
            feed_columns: parse_env("FEED_COLUMNS", 2)?,
            feed_spacing: parse_env("FEED_SPACING", 8.0)?,
            feed_width: parse_env("FEED_WIDTH", 390.0)?,
            refresh_timeout: Duration::from_secs(parse_env("REFRESH_TIMEOUT_SECS", 10)?),
            auth_expired_status: parse_env("AUTH_EXPIRED_STATUS", 401)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid value (got '{raw}')")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses its own variable names; the process environment is shared.

    #[test]
    fn test_parse_env_uses_default_when_unset() {
        std::env::remove_var("MEETSPACE_TEST_UNSET");
        assert_eq!(parse_env("MEETSPACE_TEST_UNSET", 7usize).unwrap(), 7);
    }

    #[test]
    fn test_parse_env_reads_value() {
        std::env::set_var("MEETSPACE_TEST_COLUMNS", " 3 ");
        assert_eq!(parse_env("MEETSPACE_TEST_COLUMNS", 2usize).unwrap(), 3);
    }

    #[test]
    fn test_parse_env_rejects_garbage() {
        std::env::set_var("MEETSPACE_TEST_SPACING", "wide");
        let err = parse_env("MEETSPACE_TEST_SPACING", 8.0f32).unwrap_err();
        assert!(err.to_string().contains("MEETSPACE_TEST_SPACING"));
    }

    #[test]
    fn test_require_env_names_missing_key() {
        std::env::remove_var("MEETSPACE_TEST_REQUIRED");
        let err = require_env("MEETSPACE_TEST_REQUIRED").unwrap_err();
        assert!(err.to_string().contains("MEETSPACE_TEST_REQUIRED"));
    }
}
