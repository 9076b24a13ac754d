//! In-memory collaborators for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::{ItemId, MediaDetails, NotifyError};

use super::composer::TrailerSearch;
use super::dispatcher::{DeliveryOutcome, ImageDelivery};
use super::resolver::MetadataResolver;

#[derive(Default)]
pub struct FakeResolver {
    pub items: HashMap<ItemId, MediaDetails>,
    pub calls: Mutex<Vec<ItemId>>,
}

impl FakeResolver {
    #[must_use]
    pub fn with(mut self, id: &str, details: MediaDetails) -> Self {
        self.items.insert(ItemId::from(id), details);
        self
    }

    pub fn calls(&self) -> Vec<ItemId> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl MetadataResolver for FakeResolver {
    async fn item_details(&self, id: &ItemId) -> Result<MediaDetails, NotifyError> {
        self.calls.lock().unwrap().push(id.clone());
        self.items
            .get(id)
            .cloned()
            .ok_or_else(|| NotifyError::remote("Jellyfin", format!("item {id} not found")))
    }
}

pub enum FakeTrailer {
    Found(&'static str),
    NotFound,
    Fails,
}

pub struct FakeTrailers {
    pub result: FakeTrailer,
    pub queries: Mutex<Vec<String>>,
}

impl FakeTrailers {
    #[must_use]
    pub const fn new(result: FakeTrailer) -> Self {
        Self {
            result,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl TrailerSearch for FakeTrailers {
    async fn find_trailer(&self, query: &str) -> Result<Option<String>, NotifyError> {
        self.queries.lock().unwrap().push(query.to_string());
        match self.result {
            FakeTrailer::Found(url) => Ok(Some(url.to_string())),
            FakeTrailer::NotFound => Ok(None),
            FakeTrailer::Fails => Err(NotifyError::remote("YouTube", "403 Forbidden")),
        }
    }
}

/// Replies with scripted outcomes in order; `Delivered` once the script runs out.
#[derive(Default)]
pub struct FakeDelivery {
    pub script: Mutex<Vec<DeliveryOutcome>>,
    pub attempts: Mutex<Vec<(ItemId, String)>>,
}

impl FakeDelivery {
    #[must_use]
    pub fn scripted(outcomes: Vec<DeliveryOutcome>) -> Self {
        let mut script = outcomes;
        script.reverse();
        Self {
            script: Mutex::new(script),
            attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn attempts(&self) -> Vec<(ItemId, String)> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn images(&self) -> Vec<ItemId> {
        self.attempts().into_iter().map(|(image, _)| image).collect()
    }
}

#[async_trait::async_trait]
impl ImageDelivery for FakeDelivery {
    async fn deliver(&self, image: &ItemId, caption: &str) -> DeliveryOutcome {
        self.attempts
            .lock()
            .unwrap()
            .push((image.clone(), caption.to_string()));
        self.script
            .lock()
            .unwrap()
            .pop()
            .unwrap_or(DeliveryOutcome::Delivered)
    }
}
