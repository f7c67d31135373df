use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use reqwest::Client;
use tokio::{net::TcpListener, sync::watch};

use crate::{
    api,
    error::{Error, Result},
    spotify::auth::AuthSettings,
    store::SessionStore,
    types::DisplayState,
};

/// Result of the login attempt handled by the callback route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginStatus {
    Pending,
    Succeeded,
    Failed(String),
}

/// Shared by all routes of the local server.
pub struct AppState {
    pub store: Arc<dyn SessionStore>,
    pub http: Client,
    /// `None` when the server only exposes the display state.
    pub settings: Option<AuthSettings>,
    pub login: watch::Sender<LoginStatus>,
    pub display: Option<watch::Receiver<DisplayState>>,
}

impl AppState {
    pub fn new(store: Arc<dyn SessionStore>, http: Client) -> Self {
        let (login, _) = watch::channel(LoginStatus::Pending);
        Self {
            store,
            http,
            settings: None,
            login,
            display: None,
        }
    }

    pub fn with_settings(mut self, settings: AuthSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn with_display(mut self, display: watch::Receiver<DisplayState>) -> Self {
        self.display = Some(display);
        self
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(api::now_playing))
        .route("/health", get(api::health))
        .route("/callback", get(api::callback))
        .layer(Extension(state))
}

pub async fn bind(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Config(format!("failed to bind {}: {}", addr, e)))
}

pub async fn start_api_server(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    axum::serve(listener, router(state))
        .await
        .map_err(|e| Error::Config(format!("server stopped: {}", e)))
}
