//! Delivery with a single artwork fallback.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{ItemId, NotifyError};

use super::composer::Notification;
use super::dedup::DedupClaim;

/// Result of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// The media server has no usable image for the identifier.
    ImageNotFound,
    RemoteError(NotifyError),
}

/// Sends an item's artwork with a caption to the chat.
#[async_trait::async_trait]
pub trait ImageDelivery: Send + Sync {
    async fn deliver(&self, image: &ItemId, caption: &str) -> DeliveryOutcome;
}

/// Which image ended up in the chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveredVia {
    Primary,
    Fallback,
}

impl DeliveredVia {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for DeliveredVia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct Dispatcher {
    delivery: Arc<dyn ImageDelivery>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(delivery: Arc<dyn ImageDelivery>) -> Self {
        Self { delivery }
    }

    /// Delivers `notification`, retrying once with the fallback image when
    /// the primary attempt does not succeed. The second outcome is final.
    ///
    /// The claim is committed only on final success; on failure it is
    /// dropped so a later occurrence of the same event can try again.
    pub async fn dispatch(
        &self,
        notification: &Notification,
        claim: DedupClaim,
    ) -> Result<DeliveredVia, NotifyError> {
        let primary = self
            .delivery
            .deliver(&notification.primary_image, &notification.caption)
            .await;

        let (outcome, via, image) = match (primary, &notification.fallback_image) {
            (DeliveryOutcome::Delivered, _) => (
                DeliveryOutcome::Delivered,
                DeliveredVia::Primary,
                &notification.primary_image,
            ),
            (failed, Some(fallback)) => {
                warn!(
                    notification = %notification.label,
                    image = %notification.primary_image,
                    fallback = %fallback,
                    outcome = ?failed,
                    "Primary image delivery failed, falling back to series image"
                );
                let outcome = self.delivery.deliver(fallback, &notification.caption).await;
                (outcome, DeliveredVia::Fallback, fallback)
            }
            (failed, None) => (failed, DeliveredVia::Primary, &notification.primary_image),
        };

        match outcome {
            DeliveryOutcome::Delivered => {
                claim.commit();
                info!(
                    notification = %notification.label,
                    via = %via,
                    "Notification delivered"
                );
                Ok(via)
            }
            DeliveryOutcome::ImageNotFound => Err(NotifyError::remote(
                "Delivery",
                format!("no image available for item {image}"),
            )),
            DeliveryOutcome::RemoteError(e) => Err(e),
        }
    }
}
