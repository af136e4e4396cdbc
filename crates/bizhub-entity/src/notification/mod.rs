//! Notification domain entities.

pub mod delivery;
pub mod kind;
pub mod metadata;
pub mod model;
pub mod preference;
pub mod priority;
pub mod statistics;

pub use delivery::{UserNotification, UserNotificationView};
pub use kind::{NotificationType, ThresholdKind};
pub use metadata::{
    CustomerFacts, GeneralFacts, NotificationMetadata, OrderFacts, ProductFacts, StockFacts,
};
pub use model::{LocalizedText, Notification};
pub use preference::{DEFAULT_THRESHOLDS, DefaultThreshold, NotificationPreference, Threshold};
pub use priority::NotificationPriority;
pub use statistics::{NotificationStatistics, PriorityCount, TypeCount};
