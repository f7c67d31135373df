use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// Tokens returned by the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentlyPlayingResponse {
    pub item: Option<PlayableItem>,
}

/// A track or episode as returned by the player endpoints. Episodes carry
/// no album, so everything beyond the id is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayableItem {
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ItemArtist>,
    pub album: Option<ItemAlbum>,
}

impl PlayableItem {
    pub fn cover_url(&self) -> Option<&str> {
        self.album
            .as_ref()
            .and_then(|album| album.images.first())
            .map(|image| image.url.as_str())
    }

    pub fn first_artist(&self) -> Option<&str> {
        self.artists.first().map(|artist| artist.name.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemArtist {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemAlbum {
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueResponse {
    #[serde(default)]
    pub queue: Vec<PlayableItem>,
}

/// Whether the poller has a token to work with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollerPhase {
    #[default]
    Idle,
    Polling,
}

/// Everything a widget needs to draw itself. Published as a whole so
/// readers never observe half of an update.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DisplayState {
    pub phase: PollerPhase,
    /// Identity the current covers were derived from.
    pub track_id: Option<String>,
    pub title: Option<String>,
    pub artist: Option<String>,
    /// Positional cover slots: the playing item, then up to two upcoming
    /// items. A slot is `None` when that item has no artwork.
    pub covers: Vec<Option<String>>,
    /// Last failure of the cover loop, cleared by its next good tick.
    pub cover_error: Option<String>,
    /// Last failure of the track loop, cleared by its next good tick.
    pub track_error: Option<String>,
    pub revision: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl DisplayState {
    /// The error currently shown as stale data, cover loop first.
    pub fn last_error(&self) -> Option<&str> {
        self.cover_error.as_deref().or(self.track_error.as_deref())
    }
}

#[derive(Tabled)]
pub struct QueueTableRow {
    pub position: String,
    pub name: String,
    pub cover: String,
}
