pub mod composer;
pub use composer::{Composer, Notification, TrailerSearch};

pub mod dedup;
pub use dedup::{DedupClaim, DedupStore};

pub mod dispatcher;
pub use dispatcher::{DeliveredVia, DeliveryOutcome, Dispatcher, ImageDelivery};

pub mod notifier;
pub use notifier::{NotificationService, Outcome, SuppressReason, WindowSettings};

pub mod resolver;
pub use resolver::MetadataResolver;

pub mod window;

#[cfg(test)]
pub(crate) mod testing;
