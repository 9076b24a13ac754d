use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{endpoint, status_error, transport_error};
use crate::domain::NotifyError;
use crate::services::TrailerSearch;

const SERVICE: &str = "YouTube";

pub const DEFAULT_API_URL: &str = "https://www.googleapis.com/youtube/v3";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    id: Option<ResourceId>,
}

#[derive(Debug, Deserialize)]
struct ResourceId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Clone)]
pub struct YoutubeClient {
    client: Client,
    api_url: String,
    api_key: Option<String>,
}

impl YoutubeClient {
    /// An empty key disables trailer lookups.
    #[must_use]
    pub fn new(client: Client, api_url: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    /// Returns the watch URL of the top video result for `query`.
    pub async fn search_trailer(&self, query: &str) -> Result<Option<String>, NotifyError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(None);
        };

        let mut url = endpoint(SERVICE, &self.api_url, "/search")?;
        url.query_pairs_mut()
            .append_pair("part", "snippet")
            .append_pair("q", query)
            .append_pair("type", "video")
            .append_pair("maxResults", "1")
            .append_pair("key", api_key);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        if !response.status().is_success() {
            return Err(status_error(SERVICE, response).await);
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| NotifyError::remote(SERVICE, format!("unreadable response: {e}")))?;

        let video = body
            .items
            .into_iter()
            .find_map(|item| item.id.and_then(|id| id.video_id));

        debug!(query, found = video.is_some(), "Trailer search finished");

        Ok(video.map(|id| format!("https://www.youtube.com/watch?v={id}")))
    }
}

#[async_trait::async_trait]
impl TrailerSearch for YoutubeClient {
    async fn find_trailer(&self, query: &str) -> Result<Option<String>, NotifyError> {
        self.search_trailer(query).await
    }
}
