// Session credentials, token exchange, and the refresh-and-retry interceptor.

pub mod exchange;
pub mod interceptor;
pub mod session;
pub mod store;

pub use exchange::{HttpTokenExchange, LoginResponse, TokenRefresher};
pub use interceptor::{FailedAttempt, RefreshInterceptor, RetryDecision};
pub use session::{logout, SessionEvent, SessionEvents};
pub use store::{
    CredentialKey, CredentialStore, FileCredentialStore, MemoryCredentialStore, TokenPair,
};
