use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::{
    error::{Error, Result},
    types::{CurrentlyPlayingResponse, PlayableItem, QueueResponse},
};

/// The two player endpoints the widget reads.
#[async_trait]
pub trait PlayerApi: Send + Sync {
    /// Returns `None` when nothing is playing.
    async fn currently_playing(&self, access_token: &str) -> Result<Option<PlayableItem>>;

    /// Upcoming items, next one first.
    async fn queue(&self, access_token: &str) -> Result<Vec<PlayableItem>>;
}

pub struct SpotifyClient {
    http: Client,
    api_url: String,
}

impl SpotifyClient {
    pub fn new(http: Client, api_url: impl Into<String>) -> Self {
        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get(&self, path: &str, access_token: &str) -> Result<reqwest::Response> {
        let response = self
            .http
            .get(format!("{}{}", self.api_url, path))
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::NetworkOrApi {
                status: Some(status.as_u16()),
                message: format!("GET {} answered {}", path, status),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl PlayerApi for SpotifyClient {
    async fn currently_playing(&self, access_token: &str) -> Result<Option<PlayableItem>> {
        let response = self
            .get("/me/player/currently-playing", access_token)
            .await?;

        // 204 means no active device or nothing playing.
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }

        let res: CurrentlyPlayingResponse =
            serde_json::from_str(&body).map_err(|e| Error::NetworkOrApi {
                status: None,
                message: format!("malformed currently-playing response: {}", e),
            })?;

        Ok(res.item)
    }

    async fn queue(&self, access_token: &str) -> Result<Vec<PlayableItem>> {
        let response = self.get("/me/player/queue", access_token).await?;
        let res = response
            .json::<QueueResponse>()
            .await
            .map_err(|e| Error::NetworkOrApi {
                status: None,
                message: format!("malformed queue response: {}", e),
            })?;

        Ok(res.queue)
    }
}
