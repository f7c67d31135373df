use tabled::Table;

use crate::{
    cli::{http_client, open_store},
    config, error,
    error::Error,
    info,
    poller::UPCOMING_COVERS,
    spotify::player::{PlayerApi, SpotifyClient},
    store,
    types::{PlayableItem, QueueTableRow},
    warning,
};

/// Prints the playing item and the next queue entries once.
pub async fn status() {
    let store = open_store().await;
    let token = match store::load_access_token(store.as_ref()) {
        Ok(Some(token)) => token,
        Ok(None) => error!("{}", Error::NotAuthenticated),
        Err(e) => error!("{}", e),
    };

    let client = SpotifyClient::new(http_client(), config::spotify_api_url());

    let current = match client.currently_playing(&token).await {
        Ok(Some(item)) => item,
        Ok(None) => {
            info!("Nothing is playing right now.");
            return;
        }
        Err(e) => error!("Failed to fetch currently playing item: {}", e),
    };

    info!(
        "{} - {}",
        current.name,
        current.first_artist().unwrap_or("unknown artist")
    );

    let queue = match client.queue(&token).await {
        Ok(queue) => queue,
        Err(e) => {
            warning!("Failed to fetch queue: {}", e);
            Vec::new()
        }
    };

    let mut rows = vec![row("now", &current)];
    rows.extend(
        queue
            .iter()
            .take(UPCOMING_COVERS)
            .enumerate()
            .map(|(idx, item)| row(&(idx + 1).to_string(), item)),
    );

    println!("{}", Table::new(rows));
}

fn row(position: &str, item: &PlayableItem) -> QueueTableRow {
    QueueTableRow {
        position: position.to_string(),
        name: item.name.clone(),
        cover: item.cover_url().unwrap_or("-").to_string(),
    }
}
