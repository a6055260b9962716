//! Meetspace client core: masonry feed layout and authenticated API access
//! with single-flight token refresh.

pub mod api_client;
pub mod auth;
pub mod config;
pub mod errors;
pub mod feed;
pub mod layout;
pub mod models;
pub mod state;
