//! # Spotify Integration Module
//!
//! Thin layer over the parts of the Spotify accounts service and Web API
//! that the widget needs.
//!
//! - [`auth`] implements the OAuth 2.0 authorization code flow with PKCE:
//!   building the authorization URL, exchanging the code, and a manual
//!   refresh.
//! - [`player`] reads the currently playing item and the queue through the
//!   [`player::PlayerApi`] trait, so the poller can run against a fake.
//!
//! All requests go through one shared `reqwest` client built by
//! [`http_client`].

use std::time::Duration;

use reqwest::Client;

use crate::error::{Error, Result};

pub mod auth;
pub mod player;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub fn http_client() -> Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))
}
