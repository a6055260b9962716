use anyhow::{bail, Context, Result};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use meetspace_client::auth::{logout, CredentialKey, SessionEvent};
use meetspace_client::config::Config;
use meetspace_client::feed::{fetch_spaces, layout_feed};
use meetspace_client::state::ClientState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "meetspace={level},meetspace_client={level}",
                level = &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Meetspace client v{}", env!("CARGO_PKG_VERSION"));

    let state = ClientState::from_config(config)?;
    info!(
        "Credential store at {}",
        state.config.credentials_path.display()
    );

    if std::env::args().nth(1).as_deref() == Some("logout") {
        logout(state.store.as_ref())?;
        return Ok(());
    }

    // Forced logouts are the shell's cue to send the user back to login.
    let mut session_rx = state.events.subscribe();
    tokio::spawn(async move {
        loop {
            match session_rx.recv().await {
                Ok(SessionEvent::ForcedLogout) => {
                    warn!("Session expired; log in again with MEETSPACE_EMAIL and MEETSPACE_PASSWORD")
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    ensure_session(&state).await?;

    let cards = match fetch_spaces(&state.api).await {
        Ok(cards) => cards,
        Err(e) => {
            warn!(
                status = ?e.status(),
                session_expired = e.is_session_expired(),
                "Spaces request failed"
            );
            return Err(e).context("Failed to fetch spaces feed");
        }
    };
    info!(count = cards.len(), "Fetched spaces feed");

    let feed = layout_feed(cards, state.feed_layout, state.config.feed_width).await?;
    info!(
        columns = state.feed_layout.columns(),
        spacing = state.feed_layout.spacing(),
        total_height = feed.total_height,
        "Feed laid out"
    );

    println!("{}", serde_json::to_string_pretty(&feed)?);
    Ok(())
}

/// Logs in with the configured credentials when no session is stored.
async fn ensure_session(state: &ClientState) -> Result<()> {
    if state.store.get(CredentialKey::AccessToken)?.is_some() {
        return Ok(());
    }

    let (Some(email), Some(password)) = (&state.config.email, &state.config.password) else {
        bail!("No stored session; set MEETSPACE_EMAIL and MEETSPACE_PASSWORD to log in");
    };

    let session = state.exchange.login(email, password).await?;
    state
        .store
        .save_session(&session.tokens(), &session.user_id)?;
    info!(user_id = %session.user_id, "Logged in");
    Ok(())
}
