use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::jellyfin::JellyfinClient;
use super::{endpoint, transport_error};
use crate::domain::{ItemId, NotifyError};
use crate::services::{DeliveryOutcome, ImageDelivery};

const SERVICE: &str = "Telegram";

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Deserialize)]
struct BotResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Bot API client bound to a single chat.
#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    api_url: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramClient {
    #[must_use]
    pub fn new(
        client: Client,
        api_url: &str,
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
        }
    }

    fn method_url(&self, method: &str) -> Result<url::Url, NotifyError> {
        endpoint(
            SERVICE,
            &self.api_url,
            &format!("/bot{}/{method}", self.bot_token),
        )
    }

    /// Posts `photo` with a Markdown caption.
    pub async fn send_photo(&self, photo: Vec<u8>, caption: &str) -> DeliveryOutcome {
        let url = match self.method_url("sendPhoto") {
            Ok(url) => url,
            Err(e) => return DeliveryOutcome::RemoteError(e),
        };

        let part = match Part::bytes(photo)
            .file_name("photo.jpg")
            .mime_str("image/jpeg")
        {
            Ok(part) => part,
            Err(e) => return DeliveryOutcome::RemoteError(transport_error(SERVICE, e)),
        };

        let form = Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("caption", caption.to_string())
            .text("parse_mode", "Markdown")
            .part("photo", part);

        let response = match self.client.post(url).multipart(form).send().await {
            Ok(response) => response,
            Err(e) => return DeliveryOutcome::RemoteError(transport_error(SERVICE, e)),
        };

        let status = response.status();
        let body = response.json::<BotResponse>().await.ok();

        if status.is_success() && body.as_ref().is_none_or(|b| b.ok) {
            debug!(chat = %self.chat_id, "Photo sent");
            return DeliveryOutcome::Delivered;
        }

        let description = body.and_then(|b| b.description).unwrap_or_default();
        classify_failure(status, &description)
    }

    /// Verifies the bot token with `getMe`.
    pub async fn get_me(&self) -> Result<(), NotifyError> {
        let url = self.method_url("getMe")?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let description = response
            .json::<BotResponse>()
            .await
            .ok()
            .and_then(|b| b.description)
            .unwrap_or_default();
        Err(NotifyError::remote(SERVICE, format!("{status} - {description}")))
    }
}

/// Telegram rejects unusable uploads with 400 and a description naming the
/// photo or file; everything else is a plain remote failure.
fn classify_failure(status: StatusCode, description: &str) -> DeliveryOutcome {
    let lower = description.to_lowercase();
    let image_problem = ["photo", "image", "file"]
        .iter()
        .any(|needle| lower.contains(needle));

    if status == StatusCode::BAD_REQUEST && image_problem {
        DeliveryOutcome::ImageNotFound
    } else if description.is_empty() {
        DeliveryOutcome::RemoteError(NotifyError::remote(SERVICE, status))
    } else {
        DeliveryOutcome::RemoteError(NotifyError::remote(
            SERVICE,
            format!("{status} - {description}"),
        ))
    }
}

/// Fetches artwork from Jellyfin and posts it to Telegram.
pub struct TelegramDelivery {
    images: JellyfinClient,
    telegram: TelegramClient,
}

impl TelegramDelivery {
    #[must_use]
    pub const fn new(images: JellyfinClient, telegram: TelegramClient) -> Self {
        Self { images, telegram }
    }
}

#[async_trait::async_trait]
impl ImageDelivery for TelegramDelivery {
    async fn deliver(&self, image: &ItemId, caption: &str) -> DeliveryOutcome {
        match self.images.primary_image(image).await {
            Ok(Some(photo)) => self.telegram.send_photo(photo, caption).await,
            Ok(None) => DeliveryOutcome::ImageNotFound,
            Err(e) => DeliveryOutcome::RemoteError(e),
        }
    }
}
