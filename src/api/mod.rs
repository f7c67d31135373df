//! # API Module
//!
//! HTTP endpoints of the local server that receives the Spotify redirect.
//!
//! ## Endpoints
//!
//! - [`callback`] - `/callback`, the redirect URI. Completes the PKCE login
//!   by exchanging the authorization code for tokens and storing them.
//! - [`health`] - `/health`, status, version and whether a token is stored.
//! - [`now_playing`] - `/`, the application root. Returns the current
//!   display state as JSON when a poller runs next to the server.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use axum::{Router, routing::get};
//! use queuecard::api::{callback, health};
//!
//! let app = Router::new()
//!     .route("/callback", get(callback))
//!     .route("/health", get(health));
//! ```

mod callback;
mod health;
mod now_playing;

pub use callback::callback;
pub use health::health;
pub use now_playing::now_playing;
