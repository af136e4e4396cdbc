//! Request DTOs with validation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use bizhub_core::types::pagination::PageRequest;
use bizhub_entity::notification::{LocalizedText, NotificationPriority, NotificationType};
use bizhub_entity::user::UserRole;
use bizhub_service::notification::{BroadcastRequest, PreferenceUpdate};

use crate::extractors::PaginationParams;

/// Query string of `GET /api/notifications`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListNotificationsQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Only unread notifications.
    #[serde(default)]
    pub unread_only: bool,
}

impl ListNotificationsQuery {
    /// The requested page.
    pub fn page_request(&self, default_per_page: u64) -> PageRequest {
        PaginationParams {
            page: self.page,
            per_page: self.per_page,
        }
        .into_page_request(default_per_page)
    }
}

/// Body of `PUT /api/notifications/preferences`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdatePreferencesRequest {
    #[validate(length(min = 1, max = 12, message = "Between 1 and 12 preference updates"))]
    pub preferences: Vec<PreferenceUpdate>,
}

/// Body of `POST /api/admin/notifications/broadcast`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BroadcastNotificationRequest {
    /// `system_announcement` (default) or `maintenance`.
    #[serde(rename = "type", default)]
    pub kind: Option<NotificationType>,
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,
    #[serde(default)]
    pub title_localized: LocalizedText,
    #[validate(length(min = 1, max = 5000, message = "Message must be 1-5000 characters"))]
    pub message: String,
    #[serde(default)]
    pub message_localized: LocalizedText,
    #[serde(default)]
    pub priority: NotificationPriority,
    #[serde(default)]
    pub user_ids: Vec<Uuid>,
    #[serde(default)]
    pub roles: Vec<UserRole>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl From<BroadcastNotificationRequest> for BroadcastRequest {
    fn from(req: BroadcastNotificationRequest) -> Self {
        Self {
            kind: req.kind.unwrap_or(NotificationType::SystemAnnouncement),
            title: req.title,
            title_localized: req.title_localized,
            message: req.message,
            message_localized: req.message_localized,
            priority: req.priority,
            user_ids: req.user_ids,
            roles: req.roles,
            expires_at: req.expires_at,
            attributes: req.attributes,
        }
    }
}

/// Query string of `GET /api/admin/notifications/statistics`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatisticsQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}
