use std::sync::Arc;

use axum::{Extension, extract::Query, response::Html};

use crate::{
    error::Error,
    server::{AppState, LoginStatus},
    spotify::auth::{self, CallbackParams},
    warning,
};

/// Landing page of the redirect URI.
///
/// Completes the PKCE exchange and reports the outcome as a status line.
/// On success the browser moves on to the application root after a second.
pub async fn callback(
    Query(params): Query<CallbackParams>,
    Extension(state): Extension<Arc<AppState>>,
) -> Html<String> {
    let Some(settings) = state.settings.as_ref() else {
        return status_page("Login is not enabled on this server.", false);
    };

    match auth::complete_login(&state.http, state.store.as_ref(), settings, &params).await {
        Ok(_) => {
            state.login.send_replace(LoginStatus::Succeeded);
            status_page("Spotify login successful! Redirecting...", true)
        }
        Err(e) => {
            warning!("Login failed: {}", e);
            let message = failure_message(&e);
            state.login.send_replace(LoginStatus::Failed(message.clone()));
            status_page(&message, false)
        }
    }
}

fn failure_message(err: &Error) -> String {
    match err {
        Error::MissingAuthorizationCode => "No code found in URL!".to_string(),
        Error::MissingCodeVerifier => "No code_verifier found!".to_string(),
        Error::AuthorizationDenied(reason) => format!("Spotify login was denied: {}", reason),
        other => format!("Failed to get tokens: {}", other),
    }
}

fn status_page(message: &str, redirect: bool) -> Html<String> {
    let refresh = if redirect {
        r#"<meta http-equiv="refresh" content="1; url=/">"#
    } else {
        ""
    };
    Html(format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\">{refresh}<title>queuecard</title></head>\
         <body style=\"color: white; background: #222; padding: 20px\">{message}</body></html>",
        refresh = refresh,
        message = escape(message),
    ))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
