//! Per-request orchestration: classify, resolve, filter, dedup, compose,
//! deliver, record.
//!
//! Nothing here outlives a single request except the dedup store mutation
//! made by a successful delivery.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::domain::{
    EpisodeEvent, ItemType, MediaEvent, MovieEvent, NotifyError, RawEvent, SeasonEvent, classify,
};

use super::composer::{Composer, TrailerSearch};
use super::dedup::DedupStore;
use super::dispatcher::{DeliveredVia, Dispatcher, ImageDelivery};
use super::resolver::MetadataResolver;
use super::window::within_last_x_days;

/// Day counts for the two time windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSettings {
    /// Episodes are announced only if they premiered within this many days.
    pub episode_premiered_within_days: i64,
    /// Episodes are held back while their season was added within this many days.
    pub season_added_within_days: i64,
}

/// Why a notification was deliberately not sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    AlreadyNotified,
    SeasonTooRecent { days: i64 },
    EpisodeTooStale { days: i64 },
}

impl SuppressReason {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyNotified => "already_notified",
            Self::SeasonTooRecent { .. } => "season_too_recent",
            Self::EpisodeTooStale { .. } => "episode_too_stale",
        }
    }
}

impl fmt::Display for SuppressReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyNotified => f.write_str("Notification was already sent"),
            Self::SeasonTooRecent { days } => {
                write!(f, "Season was added within the last {days} days")
            }
            Self::EpisodeTooStale { days } => {
                write!(f, "Episode was added more than {days} days ago")
            }
        }
    }
}

/// Terminal state of one webhook request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    NotificationSent {
        item_type: ItemType,
        label: String,
        via: DeliveredVia,
    },
    Suppressed {
        label: String,
        reason: SuppressReason,
    },
    Unsupported {
        item_type: String,
    },
    Failed(NotifyError),
}

impl Outcome {
    /// Stable tag for headers, metrics and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotificationSent { .. } => "sent",
            Self::Suppressed { .. } => "suppressed",
            Self::Unsupported { .. } => "unsupported",
            Self::Failed(_) => "failed",
        }
    }

    /// Human-readable body returned to the webhook sender.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            // Texts match what existing webhook senders already parse.
            Self::NotificationSent { item_type, .. } => match item_type {
                ItemType::Episode => "Notification sent to Telegram!".to_string(),
                ItemType::Movie | ItemType::Season => {
                    format!("{item_type} notification was sent to telegram")
                }
            },
            Self::Suppressed { reason, .. } => format!("{reason}. Not sending notification."),
            Self::Unsupported { .. } => "Item type not supported.".to_string(),
            Self::Failed(e) => format!("Error: {e}"),
        }
    }

    fn record(&self) {
        match self {
            Self::NotificationSent { label, via, .. } => {
                info!(notification = %label, via = %via, "Notification was sent to Telegram");
                metrics::counter!("notification_deliveries_total", "via" => via.as_str())
                    .increment(1);
            }
            Self::Suppressed { label, reason } => {
                info!(notification = %label, reason = reason.as_str(), "{reason}. Not sending notification");
            }
            Self::Unsupported { item_type } => {
                error!(item_type = %item_type, "Item type not supported");
            }
            Self::Failed(e) => {
                error!(error = %e, "Notification failed");
            }
        }
        metrics::counter!("notifications_total", "outcome" => self.kind()).increment(1);
    }
}

/// `Ok(Ok(_))` delivered, `Ok(Err(_))` deliberately suppressed.
type Step = Result<Result<DeliveredVia, SuppressReason>, NotifyError>;

pub struct NotificationService {
    resolver: Arc<dyn MetadataResolver>,
    composer: Composer,
    dispatcher: Dispatcher,
    dedup: Arc<DedupStore>,
    windows: WindowSettings,
}

impl NotificationService {
    #[must_use]
    pub fn new(
        resolver: Arc<dyn MetadataResolver>,
        trailers: Arc<dyn TrailerSearch>,
        delivery: Arc<dyn ImageDelivery>,
        dedup: Arc<DedupStore>,
        windows: WindowSettings,
    ) -> Self {
        Self {
            composer: Composer::new(resolver.clone(), trailers),
            resolver,
            dispatcher: Dispatcher::new(delivery),
            dedup,
            windows,
        }
    }

    #[must_use]
    pub const fn dedup(&self) -> &Arc<DedupStore> {
        &self.dedup
    }

    /// Handles a raw request body.
    pub async fn handle_payload(&self, body: &[u8]) -> Outcome {
        match RawEvent::from_slice(body) {
            Ok(raw) => self.handle(&raw).await,
            Err(e) => {
                let outcome = Outcome::Failed(e);
                outcome.record();
                outcome
            }
        }
    }

    pub async fn handle(&self, raw: &RawEvent) -> Outcome {
        self.handle_at(raw, Utc::now()).await
    }

    /// Like [`Self::handle`] with an explicit reference time for the windows.
    pub async fn handle_at(&self, raw: &RawEvent, now: DateTime<Utc>) -> Outcome {
        let outcome = match classify(raw) {
            Ok(event) => self.process(event, now).await,
            Err(NotifyError::UnsupportedType(item_type)) => Outcome::Unsupported { item_type },
            Err(e) => Outcome::Failed(e),
        };
        outcome.record();
        outcome
    }

    async fn process(&self, event: MediaEvent, now: DateTime<Utc>) -> Outcome {
        let item_type = event.item_type();
        let label = event.label();

        let result = match event {
            MediaEvent::Movie(movie) => self.movie(movie).await,
            MediaEvent::Season(season) => self.season(season).await,
            MediaEvent::Episode(episode) => self.episode(episode, now).await,
        };

        match result {
            Ok(Ok(via)) => Outcome::NotificationSent {
                item_type,
                label,
                via,
            },
            Ok(Err(reason)) => Outcome::Suppressed { label, reason },
            Err(e) => {
                warn!(notification = %label, "Event processing stopped");
                Outcome::Failed(e)
            }
        }
    }

    async fn movie(&self, event: MovieEvent) -> Step {
        let Some(claim) = self.dedup.try_claim(event.key()) else {
            return Ok(Err(SuppressReason::AlreadyNotified));
        };

        let notification = self.composer.movie(&event).await;
        self.dispatcher.dispatch(&notification, claim).await.map(Ok)
    }

    async fn season(&self, event: SeasonEvent) -> Step {
        let details = self.resolver.item_details(&event.item_id).await?;
        let series_id = details
            .series_id
            .ok_or_else(|| NotifyError::missing(event.item_id.clone(), "SeriesId"))?;

        let Some(claim) = self.dedup.try_claim(event.key()) else {
            return Ok(Err(SuppressReason::AlreadyNotified));
        };

        let notification = self.composer.season(&event, &series_id).await?;
        self.dispatcher.dispatch(&notification, claim).await.map(Ok)
    }

    async fn episode(&self, event: EpisodeEvent, now: DateTime<Utc>) -> Step {
        let episode = self.resolver.item_details(&event.item_id).await?;
        let season_id = episode
            .season_id
            .ok_or_else(|| NotifyError::missing(event.item_id.clone(), "SeasonId"))?;

        let season = self.resolver.item_details(&season_id).await?;
        let series_id = season
            .series_id
            .ok_or_else(|| NotifyError::missing(season_id.clone(), "SeriesId"))?;

        let season_days = self.windows.season_added_within_days;
        if within_last_x_days(season.date_created.as_deref(), season_days, now) {
            return Ok(Err(SuppressReason::SeasonTooRecent { days: season_days }));
        }

        let episode_days = self.windows.episode_premiered_within_days;
        if !within_last_x_days(episode.premiere_date.as_deref(), episode_days, now) {
            return Ok(Err(SuppressReason::EpisodeTooStale { days: episode_days }));
        }

        let Some(claim) = self.dedup.try_claim(event.key()) else {
            return Ok(Err(SuppressReason::AlreadyNotified));
        };

        let notification = Composer::episode(
            &event,
            episode.premiere_date.as_deref(),
            &season_id,
            &series_id,
        );
        self.dispatcher.dispatch(&notification, claim).await.map(Ok)
    }
}
