//! Configuration management for queuecard.
//!
//! Values come from environment variables, which are first populated from a
//! `.env` file in the local data directory. Only the Spotify client id is
//! required; every other setting falls back to the public Spotify endpoints
//! and a 2s/5s polling cadence.

use std::{env, path::PathBuf, time::Duration};

use crate::error::{Error, Result};

pub const APP_DIR: &str = "queuecard";

pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:3000/callback";
pub const DEFAULT_SCOPES: &str = "user-read-playback-state user-read-currently-playing";
pub const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:3000";
pub const DEFAULT_COVER_INTERVAL_MS: u64 = 2_000;
pub const DEFAULT_TRACK_INTERVAL_MS: u64 = 5_000;

/// Loads environment variables from `<data_local_dir>/queuecard/.env`.
///
/// Creates the directory if needed. A missing `.env` file is fine since all
/// values may also come from the process environment.
///
/// # Example
///
/// ```
/// use queuecard::config;
///
/// #[tokio::main]
/// async fn main() {
///     if let Err(e) = config::load_env().await {
///         eprintln!("Configuration error: {}", e);
///     }
/// }
/// ```
pub async fn load_env() -> Result<()> {
    let path = app_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::Config(e.to_string()))?;
    }

    match dotenv::from_path(&path) {
        Ok(()) => Ok(()),
        Err(dotenv::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Config(format!(
            "failed to load {}: {}",
            path.display(),
            e
        ))),
    }
}

pub fn app_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    path
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn millis_or(key: &str, default: u64) -> Duration {
    let ms = env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .unwrap_or(default);
    Duration::from_millis(ms)
}

/// Returns the client id registered in the Spotify developer dashboard.
///
/// # Errors
///
/// Fails with [`Error::Config`] when `SPOTIFY_CLIENT_ID` is unset.
pub fn spotify_client_id() -> Result<String> {
    env::var("SPOTIFY_CLIENT_ID")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| Error::Config("SPOTIFY_CLIENT_ID must be set".to_string()))
}

/// Must match one of the redirect URIs registered for the client.
pub fn spotify_redirect_uri() -> String {
    var_or("SPOTIFY_REDIRECT_URI", DEFAULT_REDIRECT_URI)
}

/// Scopes requested at login, space or comma separated in the environment.
pub fn spotify_scopes() -> Vec<String> {
    var_or("SPOTIFY_SCOPES", DEFAULT_SCOPES)
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

pub fn spotify_auth_url() -> String {
    var_or("SPOTIFY_AUTH_URL", DEFAULT_AUTH_URL)
}

pub fn spotify_token_url() -> String {
    var_or("SPOTIFY_TOKEN_URL", DEFAULT_TOKEN_URL)
}

/// Base of the Web API, e.g. `https://api.spotify.com/v1`.
pub fn spotify_api_url() -> String {
    var_or("SPOTIFY_API_URL", DEFAULT_API_URL)
}

/// Address the local callback server binds to.
pub fn server_addr() -> String {
    var_or("SERVER_ADDRESS", DEFAULT_SERVER_ADDRESS)
}

pub fn cover_interval() -> Duration {
    millis_or("QUEUECARD_COVER_INTERVAL_MS", DEFAULT_COVER_INTERVAL_MS)
}

pub fn track_interval() -> Duration {
    millis_or("QUEUECARD_TRACK_INTERVAL_MS", DEFAULT_TRACK_INTERVAL_MS)
}

pub fn store_path() -> PathBuf {
    env::var("QUEUECARD_STORE_PATH")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| app_dir().join("session.json"))
}

pub fn debug_enabled() -> bool {
    env::var_os("QUEUECARD_DEBUG").is_some()
}
