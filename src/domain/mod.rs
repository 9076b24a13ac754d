//! Domain types for media notifications with strong typing.
//!
//! Identifiers coming from the media server are opaque strings; they are
//! wrapped in a newtype so they cannot be confused with names or captions.

pub mod error;
pub mod events;

pub use error::NotifyError;
pub use events::{EpisodeEvent, MediaEvent, MovieEvent, RawEvent, SeasonEvent, classify};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of an item on the media server.
///
/// # Examples
///
/// ```rust
/// use premierr::domain::ItemId;
///
/// let id = ItemId::from("5f1c");
/// assert_eq!(id.as_str(), "5f1c");
/// assert_eq!(id.to_string(), "5f1c");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Kinds of media item that produce notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemType {
    Movie,
    Season,
    Episode,
}

impl ItemType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Movie => "Movie",
            Self::Season => "Season",
            Self::Episode => "Episode",
        }
    }

    /// Parses the webhook discriminator. Matching is exact, like the media
    /// server emits it.
    #[must_use]
    pub fn from_discriminator(value: &str) -> Option<Self> {
        match value {
            "Movie" => Some(Self::Movie),
            "Season" => Some(Self::Season),
            "Episode" => Some(Self::Episode),
            _ => None,
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a notifiable occurrence.
///
/// Two events with the same key are the same occurrence no matter which
/// remote item produced them, so the item id is not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationKey {
    pub item_type: ItemType,
    pub name: String,
    pub year: Option<i32>,
}

impl NotificationKey {
    #[must_use]
    pub fn new(item_type: ItemType, name: impl Into<String>, year: Option<i32>) -> Self {
        Self {
            item_type,
            name: name.into(),
            year,
        }
    }
}

impl fmt::Display for NotificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.year {
            Some(year) => write!(f, "{}:{}:{}", self.item_type, self.name, year),
            None => write!(f, "{}:{}", self.item_type, self.name),
        }
    }
}

/// Supplemental fields fetched from the media server for one item.
///
/// Dates are kept as the raw strings the server returned; the window
/// filter owns their interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaDetails {
    pub date_created: Option<String>,
    pub overview: Option<String>,
    pub series_id: Option<ItemId>,
    pub season_id: Option<ItemId>,
    pub premiere_date: Option<String>,
}
