//! Webhook events and their classification.
//!
//! The media server posts one flat JSON object per newly added item. The
//! object stays untyped until [`classify`] has read its `ItemType`
//! discriminator; only then is it decoded into the variant that consumes it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::{ItemId, ItemType, NotificationKey, NotifyError};

const DISCRIMINATOR_KEYS: [&str; 2] = ["ItemType", "itemType"];

/// Accepted spellings per field, preferred first. When a body carries more
/// than one, only the preferred spelling is decoded.
const FIELD_SPELLINGS: [&[&str]; 8] = [
    &["ItemId", "itemId"],
    &["Name", "name"],
    &["SeriesName", "seriesName"],
    &["Year", "year"],
    &["Overview", "overview"],
    &["RunTime", "Runtime", "runtime"],
    &["SeasonNumber00", "SeasonNumber", "seasonNumber"],
    &["EpisodeNumber00", "EpisodeNumber", "episodeNumber"],
];

/// One webhook body, as received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawEvent(Map<String, Value>);

impl RawEvent {
    /// Parses a request body. Anything other than a JSON object is malformed.
    pub fn from_slice(body: &[u8]) -> Result<Self, NotifyError> {
        serde_json::from_slice(body).map_err(NotifyError::malformed)
    }

    /// The raw `ItemType` value, if it is present and a string.
    #[must_use]
    pub fn discriminator(&self) -> Option<&str> {
        DISCRIMINATOR_KEYS
            .iter()
            .find_map(|key| self.0.get(*key))
            .and_then(Value::as_str)
    }

    fn decode<T: DeserializeOwned>(&self) -> Result<T, NotifyError> {
        let mut fields = self.0.clone();
        for spellings in FIELD_SPELLINGS {
            if let Some(pos) = spellings.iter().position(|key| fields.contains_key(*key)) {
                for shadowed in &spellings[pos + 1..] {
                    fields.remove(*shadowed);
                }
            }
        }
        serde_json::from_value(Value::Object(fields)).map_err(NotifyError::malformed)
    }
}

impl From<Map<String, Value>> for RawEvent {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// A classified event. Downstream code matches on this instead of
/// re-reading the discriminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    Movie(MovieEvent),
    Season(SeasonEvent),
    Episode(EpisodeEvent),
}

impl MediaEvent {
    #[must_use]
    pub const fn item_type(&self) -> ItemType {
        match self {
            Self::Movie(_) => ItemType::Movie,
            Self::Season(_) => ItemType::Season,
            Self::Episode(_) => ItemType::Episode,
        }
    }

    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Movie(event) => event.label(),
            Self::Season(event) => event.label(),
            Self::Episode(event) => event.label(),
        }
    }
}

/// Maps a raw webhook body onto one of the supported variants.
///
/// Performs no I/O. A missing or unknown discriminator is
/// [`NotifyError::UnsupportedType`]; a known discriminator with missing or
/// mistyped required fields is [`NotifyError::MalformedPayload`].
pub fn classify(raw: &RawEvent) -> Result<MediaEvent, NotifyError> {
    let discriminator = raw.discriminator().unwrap_or_default();

    match ItemType::from_discriminator(discriminator) {
        Some(ItemType::Movie) => raw.decode().map(MediaEvent::Movie),
        Some(ItemType::Season) => raw.decode().map(MediaEvent::Season),
        Some(ItemType::Episode) => raw.decode().map(MediaEvent::Episode),
        None => Err(NotifyError::UnsupportedType(discriminator.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MovieEvent {
    #[serde(alias = "itemId")]
    pub item_id: ItemId,

    #[serde(alias = "name")]
    pub name: String,

    #[serde(default, alias = "year", deserialize_with = "lenient_year")]
    pub year: Option<i32>,

    #[serde(default, alias = "overview", deserialize_with = "lenient_string")]
    pub overview: Option<String>,

    #[serde(
        default,
        rename = "RunTime",
        alias = "runtime",
        alias = "Runtime",
        deserialize_with = "lenient_string"
    )]
    pub runtime: Option<String>,
}

impl MovieEvent {
    #[must_use]
    pub fn key(&self) -> NotificationKey {
        NotificationKey::new(ItemType::Movie, self.name.clone(), self.year)
    }

    #[must_use]
    pub fn label(&self) -> String {
        format!("(Movie) {}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SeasonEvent {
    #[serde(alias = "itemId")]
    pub item_id: ItemId,

    /// Season title, e.g. "Season 2".
    #[serde(alias = "name")]
    pub name: String,

    #[serde(alias = "seriesName")]
    pub series_name: String,

    #[serde(default, alias = "year", deserialize_with = "lenient_year")]
    pub year: Option<i32>,

    #[serde(default, alias = "overview", deserialize_with = "lenient_string")]
    pub overview: Option<String>,
}

impl SeasonEvent {
    #[must_use]
    pub fn key(&self) -> NotificationKey {
        NotificationKey::new(
            ItemType::Season,
            format!("{} {}", self.series_name, self.name),
            self.year,
        )
    }

    #[must_use]
    pub fn label(&self) -> String {
        format!("(Season) {} {}", self.series_name, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EpisodeEvent {
    #[serde(alias = "itemId")]
    pub item_id: ItemId,

    /// Episode title.
    #[serde(alias = "name")]
    pub name: String,

    #[serde(alias = "seriesName")]
    pub series_name: String,

    #[serde(default, alias = "year", deserialize_with = "lenient_year")]
    pub year: Option<i32>,

    #[serde(default, alias = "overview", deserialize_with = "lenient_string")]
    pub overview: Option<String>,

    #[serde(
        default,
        rename = "SeasonNumber00",
        alias = "SeasonNumber",
        alias = "seasonNumber",
        deserialize_with = "lenient_string"
    )]
    pub season_number: Option<String>,

    #[serde(
        default,
        rename = "EpisodeNumber00",
        alias = "EpisodeNumber",
        alias = "episodeNumber",
        deserialize_with = "lenient_string"
    )]
    pub episode_number: Option<String>,
}

impl EpisodeEvent {
    #[must_use]
    pub fn key(&self) -> NotificationKey {
        NotificationKey::new(
            ItemType::Episode,
            format!("{} {}", self.series_name, self.name),
            self.year,
        )
    }

    #[must_use]
    pub fn label(&self) -> String {
        format!(
            "(Episode) {} S{}E{}",
            self.series_name,
            self.season_padded(),
            self.episode_padded()
        )
    }

    /// Season number zero-padded to two digits.
    #[must_use]
    pub fn season_padded(&self) -> String {
        pad_two(self.season_number.as_deref())
    }

    #[must_use]
    pub fn episode_padded(&self) -> String {
        pad_two(self.episode_number.as_deref())
    }
}

fn pad_two(number: Option<&str>) -> String {
    let number = number.map(str::trim).unwrap_or_default();
    if !number.is_empty() && number.len() < 2 && number.chars().all(|c| c.is_ascii_digit()) {
        format!("0{number}")
    } else {
        number.to_string()
    }
}

/// Accepts strings, numbers and booleans; anything else reads as absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// The plugin sends `Year` as a number, hand-written payloads often as a string.
fn lenient_year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
