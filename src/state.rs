use std::sync::Arc;

use crate::clients::jellyfin::JellyfinClient;
use crate::clients::telegram::{TelegramClient, TelegramDelivery};
use crate::clients::youtube::YoutubeClient;
use crate::config::Config;
use crate::services::{DedupStore, NotificationService};

/// Build a shared HTTP client with reasonable defaults for API calls.
/// This client is reused by every remote client to share the connection pool.
pub fn build_shared_http_client(timeout_seconds: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_seconds))
        .user_agent(concat!("Premierr/", env!("CARGO_PKG_VERSION")))
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub jellyfin: JellyfinClient,

    pub telegram: TelegramClient,

    pub youtube: YoutubeClient,

    pub notifier: Arc<NotificationService>,
}

impl SharedState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http_client = build_shared_http_client(config.general.request_timeout_seconds)?;

        let jellyfin = JellyfinClient::new(
            http_client.clone(),
            &config.jellyfin.base_url,
            config.jellyfin.api_key.clone(),
        );
        let telegram = TelegramClient::new(
            http_client.clone(),
            &config.telegram.api_url,
            config.telegram.bot_token.clone(),
            config.telegram.chat_id.clone(),
        );
        let youtube = YoutubeClient::new(
            http_client,
            &config.youtube.api_url,
            config.youtube_api_key(),
        );

        let dedup = Arc::new(DedupStore::new(config.notifications.dedup_max_entries));

        let notifier = Arc::new(NotificationService::new(
            Arc::new(jellyfin.clone()),
            Arc::new(youtube.clone()),
            Arc::new(TelegramDelivery::new(jellyfin.clone(), telegram.clone())),
            dedup,
            config.window_settings(),
        ));

        Ok(Self {
            config: Arc::new(config),
            jellyfin,
            telegram,
            youtube,
            notifier,
        })
    }
}
