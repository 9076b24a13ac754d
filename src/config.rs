use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::clients::{telegram, youtube};
use crate::services::{WindowSettings, dedup::DEFAULT_MAX_ENTRIES};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub telegram: TelegramConfig,

    pub jellyfin: JellyfinConfig,

    pub youtube: YoutubeConfig,

    pub notifications: NotificationsConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,

    #[serde(default)]
    pub suppress_connection_errors: bool,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Timeout applied to every outbound request.
    pub request_timeout_seconds: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            suppress_connection_errors: false,
            worker_threads: 2,
            request_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,

    pub port: u16,

    /// Webhook bodies above this size are rejected.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_body_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: String,

    pub chat_id: String,

    pub api_url: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            api_url: telegram::DEFAULT_API_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JellyfinConfig {
    pub base_url: String,

    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeConfig {
    /// Must be set; an empty key skips trailer lookups.
    pub api_key: Option<String>,

    pub api_url: String,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: youtube::DEFAULT_API_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    pub episode_premiered_within_days: Option<i64>,

    pub season_added_within_days: Option<i64>,

    pub dedup_max_entries: usize,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            episode_premiered_within_days: None,
            season_added_within_days: None,
            dedup_max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
        }
    }
}

fn parse_env<T>(name: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid value for {name}: {value:?}"))
}

impl Config {
    /// Loads the first config file found, then applies environment overrides.
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        let mut config = paths.iter().find(|p| p.exists()).map_or_else(
            || {
                info!("No config file found, using defaults");
                Ok(Self::default())
            },
            |path| {
                info!("Loading config from: {}", path.display());
                Self::load_from_path(path)
            },
        )?;

        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Loads `path` when given, otherwise searches the default locations.
    /// Environment overrides apply either way.
    pub fn load_with_path(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Self::load();
        };

        info!("Loading config from: {}", path.display());
        let mut config = Self::load_from_path(path)?;
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("premierr").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".premierr").join("config.toml"));
        }

        paths
    }

    /// Overrides file values with environment variables looked up through
    /// `lookup`. Numeric variables that do not parse are an error.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = lookup("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = v;
        }
        if let Some(v) = lookup("TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = v;
        }
        if let Some(v) = lookup("JELLYFIN_BASE_URL") {
            self.jellyfin.base_url = v;
        }
        if let Some(v) = lookup("JELLYFIN_API_KEY") {
            self.jellyfin.api_key = v;
        }
        if let Some(v) = lookup("YOUTUBE_API_KEY") {
            self.youtube.api_key = Some(v);
        }
        if let Some(v) = lookup("EPISODE_PREMIERED_WITHIN_X_DAYS") {
            self.notifications.episode_premiered_within_days =
                Some(parse_env("EPISODE_PREMIERED_WITHIN_X_DAYS", &v)?);
        }
        if let Some(v) = lookup("SEASON_ADDED_WITHIN_X_DAYS") {
            self.notifications.season_added_within_days =
                Some(parse_env("SEASON_ADDED_WITHIN_X_DAYS", &v)?);
        }
        if let Some(v) = lookup("DEDUP_MAX_ENTRIES") {
            self.notifications.dedup_max_entries = parse_env("DEDUP_MAX_ENTRIES", &v)?;
        }
        if let Some(v) = lookup("PREMIERR_PORT") {
            self.server.port = parse_env("PREMIERR_PORT", &v)?;
        }
        if let Some(v) = lookup("PREMIERR_LOG_LEVEL") {
            self.general.log_level = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            bail!("Telegram bot token is required (TELEGRAM_BOT_TOKEN)");
        }
        if self.telegram.chat_id.trim().is_empty() {
            bail!("Telegram chat id is required (TELEGRAM_CHAT_ID)");
        }
        if self.jellyfin.base_url.trim().is_empty() {
            bail!("Jellyfin base URL is required (JELLYFIN_BASE_URL)");
        }
        url::Url::parse(&self.jellyfin.base_url)
            .with_context(|| format!("Invalid Jellyfin base URL: {}", self.jellyfin.base_url))?;
        if self.jellyfin.api_key.trim().is_empty() {
            bail!("Jellyfin API key is required (JELLYFIN_API_KEY)");
        }
        if self.youtube.api_key.is_none() {
            bail!("YouTube API key is required (YOUTUBE_API_KEY), leave it empty to disable trailers");
        }
        if self.notifications.episode_premiered_within_days.is_none() {
            bail!("Episode premiere window is required (EPISODE_PREMIERED_WITHIN_X_DAYS)");
        }
        if self.notifications.season_added_within_days.is_none() {
            bail!("Season added window is required (SEASON_ADDED_WITHIN_X_DAYS)");
        }
        if self.notifications.dedup_max_entries == 0 {
            bail!("notifications.dedup_max_entries must be > 0");
        }
        if self.general.request_timeout_seconds == 0 {
            bail!("general.request_timeout_seconds must be > 0");
        }

        Ok(())
    }

    /// Window sizes for the filters. Unset windows read as zero days;
    /// `validate` rejects them before this is used in production.
    #[must_use]
    pub fn window_settings(&self) -> WindowSettings {
        WindowSettings {
            episode_premiered_within_days: self
                .notifications
                .episode_premiered_within_days
                .unwrap_or_default(),
            season_added_within_days: self
                .notifications
                .season_added_within_days
                .unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn youtube_api_key(&self) -> Option<String> {
        self.youtube
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    fn complete_env() -> Vec<(&'static str, &'static str)> {
        vec![
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("TELEGRAM_CHAT_ID", "-10042"),
            ("JELLYFIN_BASE_URL", "http://jellyfin:8096"),
            ("JELLYFIN_API_KEY", "key"),
            ("EPISODE_PREMIERED_WITHIN_X_DAYS", "7"),
            ("SEASON_ADDED_WITHIN_X_DAYS", "3"),
            ("YOUTUBE_API_KEY", ""),
        ]
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.max_body_bytes, 1024 * 1024);
        assert_eq!(config.notifications.dedup_max_entries, 100);
        assert_eq!(config.telegram.api_url, "https://api.telegram.org");
        assert_eq!(config.general.request_timeout_seconds, 30);
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [notifications]
            episode_premiered_within_days = 14
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.notifications.episode_premiered_within_days, Some(14));
        assert_eq!(config.notifications.season_added_within_days, None);
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn env_overrides_complete_the_config() {
        let mut config = Config::default();
        config.apply_env(env(&complete_env())).unwrap();

        config.validate().unwrap();
        assert_eq!(config.telegram.chat_id, "-10042");
        let windows = config.window_settings();
        assert_eq!(windows.episode_premiered_within_days, 7);
        assert_eq!(windows.season_added_within_days, 3);
        assert_eq!(config.youtube_api_key(), None);
    }

    #[test]
    fn env_wins_over_file_values() {
        let mut config: Config = toml::from_str(
            r#"
            [server]
            port = 8080

            [notifications]
            season_added_within_days = 10
        "#,
        )
        .unwrap();

        config
            .apply_env(env(&[("SEASON_ADDED_WITHIN_X_DAYS", "2"), ("PREMIERR_PORT", "9000")]))
            .unwrap();

        assert_eq!(config.notifications.season_added_within_days, Some(2));
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn unparseable_number_is_fatal() {
        let mut config = Config::default();
        let err = config
            .apply_env(env(&[("EPISODE_PREMIERED_WITHIN_X_DAYS", "a week")]))
            .unwrap_err();

        assert!(err.to_string().contains("EPISODE_PREMIERED_WITHIN_X_DAYS"));
    }

    #[test]
    fn missing_required_values_fail_validation() {
        for missing in [
            "TELEGRAM_BOT_TOKEN",
            "TELEGRAM_CHAT_ID",
            "JELLYFIN_BASE_URL",
            "JELLYFIN_API_KEY",
            "EPISODE_PREMIERED_WITHIN_X_DAYS",
            "SEASON_ADDED_WITHIN_X_DAYS",
            "YOUTUBE_API_KEY",
        ] {
            let pairs: Vec<_> = complete_env()
                .into_iter()
                .filter(|(k, _)| *k != missing)
                .collect();
            let mut config = Config::default();
            config.apply_env(env(&pairs)).unwrap();

            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains(missing), "{missing}: {err}");
        }
    }

    #[test]
    fn load_from_path_reads_toml() {
        let path =
            std::env::temp_dir().join(format!("premierr-config-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"
            [telegram]
            chat_id = "-1001"

            [jellyfin]
            base_url = "http://media:8096"
        "#,
        )
        .unwrap();

        let config = Config::load_from_path(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.telegram.chat_id, "-1001");
        assert_eq!(config.jellyfin.base_url, "http://media:8096");
    }

    #[test]
    fn zero_dedup_capacity_is_rejected() {
        let mut pairs = complete_env();
        pairs.push(("DEDUP_MAX_ENTRIES", "0"));
        let mut config = Config::default();
        config.apply_env(env(&pairs)).unwrap();

        assert!(config.validate().is_err());
    }

    #[test]
    fn youtube_key_may_be_empty_but_not_absent() {
        let mut config = Config::default();
        config.apply_env(env(&complete_env())).unwrap();
        config.validate().unwrap();
        assert_eq!(config.youtube_api_key(), None);

        config.youtube.api_key = None;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("YOUTUBE_API_KEY"));
    }

    #[test]
    fn youtube_key_enables_trailers() {
        let mut pairs: Vec<_> = complete_env()
            .into_iter()
            .filter(|(k, _)| *k != "YOUTUBE_API_KEY")
            .collect();
        pairs.push(("YOUTUBE_API_KEY", "yt"));
        let mut config = Config::default();
        config.apply_env(env(&pairs)).unwrap();

        config.validate().unwrap();
        assert_eq!(config.youtube_api_key().as_deref(), Some("yt"));
    }
}
