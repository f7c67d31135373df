//! # CLI Module
//!
//! User-facing commands of the `queuecard` binary.
//!
//! - [`login`] - Runs the PKCE login in the browser and stores the tokens
//! - [`refresh`] - Trades the stored refresh token for a new access token
//! - [`status`] - Prints the playing item and the next two queue entries once
//! - [`watch`] - Runs the playback poller and prints every change until Ctrl-C
//!
//! Commands print through the crate's logging macros and terminate with
//! [`error!`](crate::error!) on fatal problems. Everything they do is built
//! from the library modules, so the same flow can be embedded elsewhere.
//!
//! ## Usage Patterns
//!
//! ```bash
//! queuecard login           # Authorize with Spotify
//! queuecard status          # What is playing right now
//! queuecard watch --serve   # Follow playback, expose it on http://127.0.0.1:3000/
//! ```

use std::sync::Arc;

use crate::{config, error, spotify, store::FileStore};

mod auth;
mod status;
mod watch;

pub use auth::login;
pub use auth::refresh;
pub use status::status;
pub use watch::watch;

async fn open_store() -> Arc<FileStore> {
    let path = config::store_path();
    match FileStore::open(path.clone()).await {
        Ok(store) => Arc::new(store),
        Err(e) => error!("Cannot open session store at {}: {}", path.display(), e),
    }
}

fn http_client() -> reqwest::Client {
    match spotify::http_client() {
        Ok(client) => client,
        Err(e) => error!("{}", e),
    }
}
