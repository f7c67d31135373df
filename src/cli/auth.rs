use std::{sync::Arc, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    cli::{http_client, open_store},
    config, error,
    server::{self, AppState, LoginStatus},
    spotify::auth::{self, AuthSettings},
    store, success, warning,
};

const LOGIN_TIMEOUT: Duration = Duration::from_secs(120);

/// Runs the complete PKCE login.
///
/// 1. Starts the local server that owns the redirect URI
/// 2. Stores a fresh verifier and opens the authorization URL
/// 3. Waits for the callback route to exchange the code and store the tokens
pub async fn login() {
    let settings = match AuthSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => error!("{}", e),
    };
    let store = open_store().await;
    let http = http_client();

    let listener = match server::bind(&config::server_addr()).await {
        Ok(listener) => listener,
        Err(e) => error!("{}", e),
    };

    let state = Arc::new(AppState::new(store.clone(), http).with_settings(settings.clone()));
    let mut login_rx = state.login.subscribe();

    let server_state = Arc::clone(&state);
    tokio::spawn(async move {
        if let Err(e) = server::start_api_server(listener, server_state).await {
            warning!("Callback server stopped: {}", e);
        }
    });

    let auth_url = match auth::start_login(store.as_ref(), &settings).await {
        Ok(url) => url,
        Err(e) => error!("Cannot start login: {}", e),
    };

    if webbrowser::open(auth_url.as_str()).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            auth_url
        )
    }

    let pb = ProgressBar::new_spinner();
    pb.set_message("Waiting for Spotify login in the browser...");
    pb.enable_steady_tick(Duration::from_millis(100));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }

    let outcome = tokio::time::timeout(
        LOGIN_TIMEOUT,
        login_rx.wait_for(|status| *status != LoginStatus::Pending),
    )
    .await
    .ok()
    .and_then(|res| res.ok().map(|status| status.clone()));

    pb.finish_and_clear();

    match outcome {
        Some(LoginStatus::Succeeded) => success!("Authentication successful!"),
        Some(LoginStatus::Failed(message)) => error!("{}", message),
        _ => error!("Authentication failed or timed out."),
    }
}

/// Replaces the stored access token using the stored refresh token.
pub async fn refresh() {
    let settings = match AuthSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => error!("{}", e),
    };
    let store = open_store().await;

    let refresh_token = match store::load_refresh_token(store.as_ref()) {
        Ok(Some(token)) => token,
        Ok(None) => error!("No refresh token stored, run `queuecard login` first."),
        Err(e) => error!("{}", e),
    };

    let tokens = match auth::refresh_access_token(
        &http_client(),
        &settings.token_url,
        &settings.client_id,
        &refresh_token,
    )
    .await
    {
        Ok(tokens) => tokens,
        Err(e) => error!("Token refresh failed: {}", e),
    };

    if let Err(e) = store::save_tokens(store.as_ref(), &tokens) {
        error!("Failed to save tokens: {}", e);
    }

    success!("Access token refreshed.");
}
