//! Spotify Now-Playing Widget Library
//!
//! This library keeps a small "now playing" card in sync with the Spotify
//! Web API. It logs the user in with the OAuth 2.0 authorization code flow
//! using PKCE, keeps the verifier and tokens in an injected session store,
//! and polls the player endpoints to publish the current track and the
//! covers of the next items in the queue.
//!
//! # Modules
//!
//! - `api` - HTTP endpoints of the local callback server
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration management and environment variables
//! - `error` - Error taxonomy shared by the auth and polling paths
//! - `pkce` - Code verifier generation and challenge derivation
//! - `poller` - Playback polling and the observable display state
//! - `server` - Local HTTP server for OAuth callbacks
//! - `spotify` - Spotify accounts service and player API client
//! - `store` - Session storage for the verifier and tokens
//! - `types` - Data structures and type definitions
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use queuecard::{poller::{PlaybackPoller, PollIntervals}, spotify, store::MemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> queuecard::error::Result<()> {
//!     let api = spotify::player::SpotifyClient::new(spotify::http_client()?, "https://api.spotify.com/v1");
//!     let poller = Arc::new(PlaybackPoller::new(
//!         Arc::new(api),
//!         Arc::new(MemoryStore::new()),
//!         PollIntervals::default(),
//!     ));
//!     let handle = poller.start();
//!     handle.stop().await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod pkce;
pub mod poller;
pub mod server;
pub mod spotify;
pub mod store;
pub mod types;

/// Prints an informational message with a blue bullet point.
///
/// # Example
///
/// ```
/// info!("Waiting for Spotify login...");
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only for the binary and the `cli` module. Library code returns errors
/// instead of terminating the process.
///
/// # Example
///
/// ```
/// error!("Failed to open session store: {}", e);
/// // Program exits here - code after this will not execute
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a dimmed diagnostic line when `QUEUECARD_DEBUG` is set.
///
/// The poller reports swallowed errors through this macro, so they stay
/// invisible unless explicitly asked for.
#[macro_export]
macro_rules! debug {
  ($($arg:tt)*) => ({
    if $crate::config::debug_enabled() {
      use colored::Colorize;
      eprintln!("[{}] {}", "~".dimmed(), std::format_args!($($arg)*));
    }
  })
}
