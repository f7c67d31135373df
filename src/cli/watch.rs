use std::sync::Arc;

use crate::{
    cli::{http_client, open_store},
    config, debug, error, info,
    poller::{PlaybackPoller, PollIntervals},
    server::{self, AppState},
    spotify::{auth::AuthSettings, player::SpotifyClient},
    store, success,
    types::{DisplayState, PollerPhase},
    warning,
};

/// Follows playback until Ctrl-C, printing every change of track or covers.
///
/// With `serve`, the local server runs alongside and exposes the display
/// state at its root, with the login callback available as well.
pub async fn watch(serve: bool) {
    let store = open_store().await;
    let http = http_client();
    let api = SpotifyClient::new(http.clone(), config::spotify_api_url());

    let poller = Arc::new(PlaybackPoller::new(
        Arc::new(api),
        store.clone(),
        PollIntervals::from_env(),
    ));
    let mut display = poller.subscribe();

    if serve {
        let listener = match server::bind(&config::server_addr()).await {
            Ok(listener) => listener,
            Err(e) => error!("{}", e),
        };
        let mut state = AppState::new(store.clone(), http).with_display(poller.subscribe());
        if let Ok(settings) = AuthSettings::from_env() {
            state = state.with_settings(settings);
        }
        tokio::spawn(async move {
            if let Err(e) = server::start_api_server(listener, Arc::new(state)).await {
                warning!("Server stopped: {}", e);
            }
        });
        info!("Serving now playing on http://{}/", config::server_addr());
    }

    if !matches!(store::load_access_token(store.as_ref()), Ok(Some(_))) {
        warning!("No access token stored yet, waiting for `queuecard login`.");
    }

    let handle = poller.start();
    info!("Watching playback, press Ctrl-C to stop.");

    let mut last_printed = DisplayState::default();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = display.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = display.borrow_and_update().clone();
                report(&last_printed, &current);
                last_printed = current;
            }
        }
    }

    handle.stop().await;
    success!("Stopped.");
}

fn report(previous: &DisplayState, current: &DisplayState) {
    if current.phase != previous.phase && current.phase == PollerPhase::Idle {
        warning!("No access token stored, run `queuecard login`.");
    }
    if (&current.title, &current.artist) != (&previous.title, &previous.artist) {
        if let Some(title) = &current.title {
            info!(
                "{} - {}",
                title,
                current.artist.as_deref().unwrap_or("unknown artist")
            );
        }
    }
    if current.covers != previous.covers {
        for (idx, cover) in current.covers.iter().enumerate() {
            info!("cover {}: {}", idx, cover.as_deref().unwrap_or("-"));
        }
    }
    if current.last_error() != previous.last_error() {
        if let Some(err) = current.last_error() {
            debug!("showing stale data: {}", err);
        }
    }
}
