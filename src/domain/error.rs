use thiserror::Error;

use super::ItemId;

/// Errors raised while turning a webhook event into a notification.
///
/// Every variant is caught at the request boundary and rendered as plain
/// text; none of them abort the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    #[error("{service} error: {message}")]
    Remote { service: String, message: String },

    #[error("Item type not supported: {0}")]
    UnsupportedType(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Item {item} has no {field}")]
    MissingMetadata { item: ItemId, field: &'static str },
}

impl NotifyError {
    pub fn remote(service: impl Into<String>, message: impl ToString) -> Self {
        Self::Remote {
            service: service.into(),
            message: message.to_string(),
        }
    }

    pub fn malformed(message: impl ToString) -> Self {
        Self::MalformedPayload(message.to_string())
    }

    #[must_use]
    pub const fn missing(item: ItemId, field: &'static str) -> Self {
        Self::MissingMetadata { item, field }
    }
}
