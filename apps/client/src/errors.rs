use thiserror::Error;

/// Invalid input to the masonry engine. A programmer error, never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("Invalid layout argument: {0}")]
    InvalidArgument(String),
}

/// Credential store failure (I/O or a corrupt backing file).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Credential store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Credential store is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Failures of the token refresh cycle and the login exchange.
///
/// Both refresh variants end the session: the caller sees them wrapped in
/// `ClientError::SessionExpired`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuthError {
    #[error("Refresh token missing")]
    RefreshTokenMissing,

    #[error("Refresh exchange failed: {0}")]
    RefreshExchangeFailed(String),

    #[error("Login failed: {0}")]
    LoginFailed(String),
}

/// Error type of the authorized API client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Status { status: u16, message: String },

    /// The original failure (`status`, response body in `message`) plus the
    /// refresh failure that ended the session.
    #[error("Session expired (status {status}): {cause}")]
    SessionExpired {
        status: u16,
        message: String,
        #[source]
        cause: AuthError,
    },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Request body cannot be replayed")]
    RequestNotReplayable,

    #[error("Stored access token is not a valid header value")]
    InvalidToken,
}

impl ClientError {
    /// True for the terminal outcome that must route the user to login.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, ClientError::SessionExpired { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } | ClientError::SessionExpired { status, .. } => {
                Some(*status)
            }
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
