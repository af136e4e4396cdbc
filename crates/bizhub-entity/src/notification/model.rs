//! Notification entity model.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::kind::NotificationType;
use super::metadata::NotificationMetadata;
use super::priority::NotificationPriority;
use crate::user::UserRole;

/// Translations keyed by language code (`"ar"`, `"fr"`, ...).
pub type LocalizedText = BTreeMap<String, String>;

/// A notification created once per business event.
///
/// Immutable after creation except for the `email_sent` marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Unique notification identifier.
    pub id: Uuid,
    /// Notification type, always equal to `metadata.kind()`.
    #[serde(rename = "type")]
    pub kind: NotificationType,
    /// Title in the default language.
    pub title: String,
    /// Optional translated titles.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub title_localized: LocalizedText,
    /// Body text in the default language.
    pub message: String,
    /// Optional translated bodies.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub message_localized: LocalizedText,
    /// Display priority.
    pub priority: NotificationPriority,
    /// Related business entity type (`"order"`, `"product"`, `"customer"`).
    pub related_type: Option<String>,
    /// Related business entity id.
    pub related_id: Option<Uuid>,
    /// Typed facts about the event.
    pub metadata: NotificationMetadata,
    /// After this instant the notification drops out of lists and counts.
    pub expires_at: Option<DateTime<Utc>>,
    /// Creating user, `None` for system-generated notifications.
    pub created_by: Option<Uuid>,
    /// Whether the notification was addressed to every active user.
    pub is_broadcast: bool,
    /// Roles the notification was addressed to.
    #[serde(default)]
    pub target_roles: Vec<UserRole>,
    /// Whether at least one email was sent for this notification.
    pub email_sent: bool,
    /// When the notification was created.
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Check if the notification has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|exp| exp <= now).unwrap_or(false)
    }

    /// Title in `language`, falling back to the default-language title.
    pub fn title_for(&self, language: &str) -> &str {
        self.title_localized
            .get(language)
            .map(String::as_str)
            .unwrap_or(&self.title)
    }

    /// Message in `language`, falling back to the default-language message.
    pub fn message_for(&self, language: &str) -> &str {
        self.message_localized
            .get(language)
            .map(String::as_str)
            .unwrap_or(&self.message)
    }
}
