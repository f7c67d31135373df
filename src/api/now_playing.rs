use std::sync::Arc;

use axum::{Extension, response::Json};

use crate::{server::AppState, types::DisplayState};

/// Application root. Serves the latest display state, or `null` when no
/// poller is attached to this server.
pub async fn now_playing(Extension(state): Extension<Arc<AppState>>) -> Json<Option<DisplayState>> {
    Json(state.display.as_ref().map(|rx| rx.borrow().clone()))
}
