use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::{endpoint, status_error, transport_error};
use crate::domain::{ItemId, MediaDetails, NotifyError};
use crate::services::MetadataResolver;

const SERVICE: &str = "Jellyfin";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ItemsResponse {
    #[serde(default)]
    items: Vec<JellyfinItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JellyfinItem {
    date_created: Option<String>,
    overview: Option<String>,
    series_id: Option<String>,
    season_id: Option<String>,
    premiere_date: Option<String>,
}

impl From<JellyfinItem> for MediaDetails {
    fn from(item: JellyfinItem) -> Self {
        Self {
            date_created: item.date_created,
            overview: item.overview,
            series_id: item.series_id.map(ItemId::new),
            season_id: item.season_id.map(ItemId::new),
            premiere_date: item.premiere_date,
        }
    }
}

/// Read-only client for the Jellyfin items API.
#[derive(Clone)]
pub struct JellyfinClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl JellyfinClient {
    #[must_use]
    pub fn new(client: Client, base_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub async fn item_details(&self, id: &ItemId) -> Result<MediaDetails, NotifyError> {
        let mut url = endpoint(SERVICE, &self.base_url, "/Items")?;
        url.query_pairs_mut()
            .append_pair("Recursive", "true")
            .append_pair("Fields", "DateCreated,Overview")
            .append_pair("Ids", id.as_str());

        debug!(item = %id, "Fetching item details");

        let response = self
            .client
            .get(url)
            .header("X-Emby-Token", &self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        if !response.status().is_success() {
            return Err(status_error(SERVICE, response).await);
        }

        let body: ItemsResponse = response
            .json()
            .await
            .map_err(|e| NotifyError::remote(SERVICE, format!("unreadable response: {e}")))?;

        body.items
            .into_iter()
            .next()
            .map(MediaDetails::from)
            .ok_or_else(|| NotifyError::remote(SERVICE, format!("item {id} not found")))
    }

    /// Downloads the primary image for `id`. `None` means the item has no
    /// primary image.
    pub async fn primary_image(&self, id: &ItemId) -> Result<Option<Vec<u8>>, NotifyError> {
        let mut url = endpoint(SERVICE, &self.base_url, "/Items")?;
        url.path_segments_mut()
            .map_err(|()| NotifyError::remote(SERVICE, "base URL cannot carry a path"))?
            .extend([id.as_str(), "Images", "Primary"]);

        let response = self
            .client
            .get(url)
            .header("X-Emby-Token", &self.api_key)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(item = %id, "Item has no primary image");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(status_error(SERVICE, response).await);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        Ok((!bytes.is_empty()).then(|| bytes.to_vec()))
    }

    /// Cheap authenticated call used by `check`.
    pub async fn ping(&self) -> Result<(), NotifyError> {
        let url = endpoint(SERVICE, &self.base_url, "/System/Info")?;
        let response = self
            .client
            .get(url)
            .header("X-Emby-Token", &self.api_key)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(status_error(SERVICE, response).await)
        }
    }
}

#[async_trait::async_trait]
impl MetadataResolver for JellyfinClient {
    async fn item_details(&self, id: &ItemId) -> Result<MediaDetails, NotifyError> {
        Self::item_details(self, id).await
    }
}
