use crate::domain::{ItemId, MediaDetails, NotifyError};

/// Fetches supplemental fields for an item from the media server.
///
/// Results are used for one request only and never cached.
#[async_trait::async_trait]
pub trait MetadataResolver: Send + Sync {
    /// # Errors
    ///
    /// Returns [`NotifyError::Remote`] on transport failures, non-2xx
    /// responses, or when the server does not know the item.
    async fn item_details(&self, id: &ItemId) -> Result<MediaDetails, NotifyError>;
}
