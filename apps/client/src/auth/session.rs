use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::auth::store::CredentialStore;
use crate::errors::StoreError;

/// Capacity of the session event channel. Events carry no payload, so a
/// lagging receiver only needs to know that at least one logout happened.
const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Credentials are gone; the shell must route to the login screen.
    ForcedLogout,
}

/// Process-wide session broadcast. Cheap to clone; all clones share one channel.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Broadcasts a forced logout. Having no subscribers is not an error.
    pub fn notify_forced_logout(&self) {
        match self.sender.send(SessionEvent::ForcedLogout) {
            Ok(receivers) => warn!(receivers, "Session expired, forcing logout"),
            Err(_) => warn!("Session expired, forcing logout (no listeners)"),
        }
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}

/// User-initiated logout: wipes the credentials without a forced-logout event.
pub fn logout(store: &dyn CredentialStore) -> Result<(), StoreError> {
    store.clear()?;
    info!("Logged out");
    Ok(())
}
