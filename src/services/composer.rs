//! Caption formatting per media variant.
//!
//! The composer never touches the dedup store. Its only remote lookups are
//! the trailer search for movies and the series overview fallback for
//! seasons.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{EpisodeEvent, ItemId, MovieEvent, NotificationKey, NotifyError, SeasonEvent};

use super::resolver::MetadataResolver;
use super::window::parse_media_date;

/// Telegram rejects photo captions longer than this.
pub const MAX_CAPTION_CHARS: usize = 1024;

/// Finds a trailer link for a free-text query.
#[async_trait::async_trait]
pub trait TrailerSearch: Send + Sync {
    /// `Ok(None)` when nothing was found or lookups are disabled.
    async fn find_trailer(&self, query: &str) -> Result<Option<String>, NotifyError>;
}

/// A composed message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub key: NotificationKey,
    pub label: String,
    pub caption: String,
    pub primary_image: ItemId,
    pub fallback_image: Option<ItemId>,
}

/// Removes a trailing `" (<year>)"` from `name`.
///
/// ```
/// # use premierr::services::composer::strip_year_suffix;
/// assert_eq!(strip_year_suffix("Dune (2021)", Some(2021)), "Dune");
/// assert_eq!(strip_year_suffix("Dune (2021)", Some(1984)), "Dune (2021)");
/// assert_eq!(strip_year_suffix("Dune", None), "Dune");
/// ```
#[must_use]
pub fn strip_year_suffix(name: &str, year: Option<i32>) -> String {
    let trimmed = name.trim();
    year.and_then(|year| trimmed.strip_suffix(&format!(" ({year})")))
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}

fn title_line(title: &str, year: Option<i32>) -> String {
    match year {
        Some(year) => format!("*{title}* *({year})*"),
        None => format!("*{title}*"),
    }
}

/// Cuts `text` to at most `max` chars, marking the cut with `…`.
fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    text.chars()
        .take(max.saturating_sub(1))
        .chain(std::iter::once('…'))
        .collect()
}

/// Renders the caption, shortening the overview when the whole text would
/// exceed [`MAX_CAPTION_CHARS`]. If the fixed parts alone are too long the
/// rendered caption itself is cut.
fn fit_caption(overview: &str, render: impl Fn(&str) -> String) -> String {
    let full = render(overview);
    let len = full.chars().count();
    if len <= MAX_CAPTION_CHARS {
        return full;
    }

    let excess = len - MAX_CAPTION_CHARS;
    let overview_len = overview.chars().count();
    if overview_len > excess {
        let shortened = truncate_chars(overview, overview_len - excess);
        return render(&shortened);
    }

    truncate_chars(&render(""), MAX_CAPTION_CHARS)
}

fn premiere_day(premiere_date: Option<&str>) -> String {
    premiere_date.map_or_else(
        || "Unknown".to_string(),
        |raw| {
            parse_media_date(raw).map_or_else(
                || raw.split('T').next().unwrap_or(raw).to_string(),
                |date| date.format("%Y-%m-%d").to_string(),
            )
        },
    )
}

pub struct Composer {
    resolver: Arc<dyn MetadataResolver>,
    trailers: Arc<dyn TrailerSearch>,
}

impl Composer {
    #[must_use]
    pub fn new(resolver: Arc<dyn MetadataResolver>, trailers: Arc<dyn TrailerSearch>) -> Self {
        Self { resolver, trailers }
    }

    async fn trailer_for(&self, title: &str, year: Option<i32>) -> Option<String> {
        let query = match year {
            Some(year) => format!("{title} Trailer {year}"),
            None => format!("{title} Trailer"),
        };

        match self.trailers.find_trailer(&query).await {
            Ok(Some(url)) => Some(url),
            Ok(None) => {
                debug!(query = %query, "No trailer found");
                None
            }
            Err(e) => {
                warn!(query = %query, error = %e, "Trailer lookup failed, sending without trailer");
                None
            }
        }
    }

    /// Movie caption with an optional trailer line. Never fails: a broken
    /// trailer lookup only drops the trailer line.
    pub async fn movie(&self, event: &MovieEvent) -> Notification {
        let title = strip_year_suffix(&event.name, event.year);
        let trailer = self.trailer_for(&title, event.year).await;
        let heading = title_line(&title, event.year);

        let caption = fit_caption(event.overview.as_deref().unwrap_or_default(), |overview| {
            let mut caption = format!("*🍿New Movie Added🍿*\n\n{heading}\n\n{overview}");
            if let Some(runtime) = &event.runtime {
                caption.push_str(&format!("\n\nRuntime\n{runtime}"));
            }
            if let Some(url) = &trailer {
                caption.push_str(&format!("\n\n[🎥]({url})[Trailer]({url})"));
            }
            caption
        });

        Notification {
            key: event.key(),
            label: event.label(),
            caption,
            primary_image: event.item_id.clone(),
            fallback_image: None,
        }
    }

    /// Season caption. An empty season overview falls back to the series
    /// overview, which is fetched only in that case.
    pub async fn season(
        &self,
        event: &SeasonEvent,
        series_id: &ItemId,
    ) -> Result<Notification, NotifyError> {
        let overview = match event.overview.as_deref().map(str::trim) {
            Some(overview) if !overview.is_empty() => overview.to_string(),
            _ => {
                debug!(series = %series_id, "Season overview empty, using series overview");
                self.resolver
                    .item_details(series_id)
                    .await?
                    .overview
                    .unwrap_or_default()
            }
        };

        let series = strip_year_suffix(&event.series_name, event.year);
        let heading = title_line(&series, event.year);
        let caption = fit_caption(&overview, |overview| {
            format!(
                "*New Season Added*\n\n{heading}\n\n*{}*\n\n{overview}\n\n",
                event.name
            )
        });

        Ok(Notification {
            key: event.key(),
            label: event.label(),
            caption,
            primary_image: event.item_id.clone(),
            fallback_image: Some(series_id.clone()),
        })
    }

    /// Episode caption. Artwork comes from the season, falling back to the
    /// series.
    #[must_use]
    pub fn episode(
        event: &EpisodeEvent,
        premiere_date: Option<&str>,
        season_id: &ItemId,
        series_id: &ItemId,
    ) -> Notification {
        let released = premiere_day(premiere_date);
        let caption = fit_caption(event.overview.as_deref().unwrap_or_default(), |overview| {
            format!(
                "*New Episode Added*\n\n*Release Date*: {released}\n\n*Series*: {} *S*{}*E*{}\n*Episode Title*: {}\n\n{overview}\n\n",
                event.series_name,
                event.season_padded(),
                event.episode_padded(),
                event.name
            )
        });

        Notification {
            key: event.key(),
            label: event.label(),
            caption,
            primary_image: season_id.clone(),
            fallback_image: Some(series_id.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MediaDetails, MediaEvent, RawEvent, classify};
    use crate::services::testing::{FakeResolver, FakeTrailer, FakeTrailers};
    use serde_json::json;

    fn movie() -> MovieEvent {
        let raw: RawEvent = serde_json::from_value(json!({
            "ItemType": "Movie",
            "ItemId": "m1",
            "Name": "Dune (2021)",
            "Year": 2021,
            "Overview": "Paul Atreides travels to Arrakis.",
            "RunTime": 155
        }))
        .unwrap();
        match classify(&raw).unwrap() {
            MediaEvent::Movie(movie) => movie,
            other => panic!("unexpected {other:?}"),
        }
    }

    fn season(overview: &str) -> SeasonEvent {
        SeasonEvent {
            item_id: ItemId::from("s2"),
            name: "Season 2".to_string(),
            series_name: "Severance (2022)".to_string(),
            year: Some(2022),
            overview: Some(overview.to_string()),
        }
    }

    fn composer(resolver: FakeResolver, trailers: FakeTrailers) -> Composer {
        Composer::new(Arc::new(resolver), Arc::new(trailers))
    }

    #[tokio::test]
    async fn movie_with_trailer() {
        let trailers = Arc::new(FakeTrailers::new(FakeTrailer::Found(
            "https://www.youtube.com/watch?v=abc",
        )));
        let composer = Composer::new(Arc::new(FakeResolver::default()), trailers.clone());

        let notification = composer.movie(&movie()).await;

        assert_eq!(trailers.queries(), vec!["Dune Trailer 2021".to_string()]);
        assert!(notification.caption.starts_with("*🍿New Movie Added🍿*\n\n*Dune* *(2021)*"));
        assert!(!notification.caption.contains("Dune (2021)"));
        assert!(notification.caption.contains("Runtime\n155"));
        assert!(notification.caption.ends_with(
            "[🎥](https://www.youtube.com/watch?v=abc)[Trailer](https://www.youtube.com/watch?v=abc)"
        ));
        assert_eq!(notification.primary_image, ItemId::from("m1"));
        assert_eq!(notification.fallback_image, None);
    }

    #[tokio::test]
    async fn movie_without_trailer_on_search_failure() {
        let composer = composer(
            FakeResolver::default(),
            FakeTrailers::new(FakeTrailer::Fails),
        );
        let notification = composer.movie(&movie()).await;
        assert!(!notification.caption.contains("Trailer"));

        let composer = composer_not_found();
        let notification = composer.movie(&movie()).await;
        assert!(!notification.caption.contains("Trailer"));
    }

    fn composer_not_found() -> Composer {
        composer(
            FakeResolver::default(),
            FakeTrailers::new(FakeTrailer::NotFound),
        )
    }

    #[tokio::test]
    async fn season_uses_own_overview() {
        let resolver = Arc::new(FakeResolver::default());
        let composer = Composer::new(
            resolver.clone(),
            Arc::new(FakeTrailers::new(FakeTrailer::NotFound)),
        );

        let notification = composer
            .season(&season("Mark returns."), &ItemId::from("series"))
            .await
            .unwrap();

        assert!(resolver.calls().is_empty());
        assert_eq!(
            notification.caption,
            "*New Season Added*\n\n*Severance* *(2022)*\n\n*Season 2*\n\nMark returns.\n\n"
        );
        assert_eq!(notification.primary_image, ItemId::from("s2"));
        assert_eq!(notification.fallback_image, Some(ItemId::from("series")));
    }

    #[tokio::test]
    async fn season_falls_back_to_series_overview() {
        let resolver = Arc::new(FakeResolver::default().with(
            "series",
            MediaDetails {
                overview: Some("Work-life balance, surgically.".to_string()),
                ..MediaDetails::default()
            },
        ));
        let composer = Composer::new(
            resolver.clone(),
            Arc::new(FakeTrailers::new(FakeTrailer::NotFound)),
        );

        let notification = composer
            .season(&season("  "), &ItemId::from("series"))
            .await
            .unwrap();

        assert_eq!(resolver.calls(), vec![ItemId::from("series")]);
        assert!(notification.caption.contains("Work-life balance, surgically."));
    }

    #[tokio::test]
    async fn season_fallback_lookup_error_propagates() {
        let composer = composer_not_found();
        let err = composer
            .season(&season(""), &ItemId::from("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Remote { .. }));
    }

    #[test]
    fn episode_caption() {
        let event = EpisodeEvent {
            item_id: ItemId::from("e3"),
            name: "Who Is Alive?".to_string(),
            series_name: "Severance".to_string(),
            year: Some(2025),
            overview: Some("Mark confronts.".to_string()),
            season_number: Some("2".to_string()),
            episode_number: Some("03".to_string()),
        };

        let notification = Composer::episode(
            &event,
            Some("2025-01-31T00:00:00.0000000Z"),
            &ItemId::from("s2"),
            &ItemId::from("series"),
        );

        assert_eq!(
            notification.caption,
            "*New Episode Added*\n\n*Release Date*: 2025-01-31\n\n*Series*: Severance *S*02*E*03\n*Episode Title*: Who Is Alive?\n\nMark confronts.\n\n"
        );
        assert_eq!(notification.primary_image, ItemId::from("s2"));
        assert_eq!(notification.fallback_image, Some(ItemId::from("series")));
    }

    #[tokio::test]
    async fn long_overview_is_shortened_to_caption_limit() {
        let mut event = movie();
        event.overview = Some("word ".repeat(400));

        let notification = composer_not_found().movie(&event).await;

        assert!(notification.caption.chars().count() <= MAX_CAPTION_CHARS);
        assert!(notification.caption.contains('…'));
        assert!(notification.caption.ends_with("Runtime\n155"));
    }

    #[tokio::test]
    async fn title_longer_than_limit_still_fits() {
        let mut event = movie();
        event.name = "A".repeat(1100);
        event.year = None;

        let notification = composer_not_found().movie(&event).await;

        assert_eq!(notification.caption.chars().count(), MAX_CAPTION_CHARS);
        assert!(notification.caption.starts_with("*🍿New Movie Added🍿*"));
        assert!(notification.caption.ends_with('…'));
        assert!(!notification.caption.contains("Paul Atreides"));
    }

    #[test]
    fn episode_with_long_series_name_fits() {
        let event = EpisodeEvent {
            item_id: ItemId::from("e1"),
            name: "Pilot".to_string(),
            series_name: "Ö".repeat(2000),
            year: None,
            overview: Some("Short.".to_string()),
            season_number: Some("01".to_string()),
            episode_number: Some("01".to_string()),
        };

        let notification =
            Composer::episode(&event, None, &ItemId::from("s1"), &ItemId::from("series"));

        assert_eq!(notification.caption.chars().count(), MAX_CAPTION_CHARS);
        assert!(notification.caption.ends_with('…'));
    }

    #[test]
    fn truncate_chars_respects_multibyte_boundaries() {
        assert_eq!(truncate_chars("héllo", 10), "héllo");
        assert_eq!(truncate_chars("héllo", 3), "hé…");
        assert_eq!(truncate_chars("🍿🍿🍿", 2), "🍿…");
    }

    #[test]
    fn strip_only_trailing_suffix() {
        assert_eq!(strip_year_suffix("1917 (2019)", Some(2019)), "1917");
        assert_eq!(
            strip_year_suffix("(2019) Retrospective", Some(2019)),
            "(2019) Retrospective"
        );
        assert_eq!(strip_year_suffix("  Dune (2021)  ", Some(2021)), "Dune");
    }

    #[test]
    fn premiere_day_formats() {
        assert_eq!(premiere_day(Some("2025-01-31T00:00:00.0000000Z")), "2025-01-31");
        assert_eq!(premiere_day(Some("0000-00-00T")), "0000-00-00");
        assert_eq!(premiere_day(None), "Unknown");
    }
}
