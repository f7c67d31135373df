use std::sync::Arc;

use axum::{Extension, response::Json};
use serde_json::{Value, json};

use crate::{server::AppState, store};

pub async fn health(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    let authenticated = matches!(store::load_access_token(state.store.as_ref()), Ok(Some(_)));
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "authenticated": authenticated,
    }))
}
