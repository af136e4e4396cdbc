//! Per-recipient delivery state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::model::Notification;

/// One row per (notification, recipient).
///
/// The only recipient-owned mutable state: read flag, email marker and
/// visibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserNotification {
    pub id: Uuid,
    pub notification_id: Uuid,
    pub user_id: Uuid,
    /// Monotonic: once true it never flips back.
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub email_sent: bool,
    pub email_sent_at: Option<DateTime<Utc>>,
    /// `false` once the recipient hid the notification.
    pub is_visible: bool,
    pub created_at: DateTime<Utc>,
}

impl UserNotification {
    /// A fresh unread, visible delivery.
    pub fn new(notification_id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            notification_id,
            user_id,
            is_read: false,
            read_at: None,
            email_sent: false,
            email_sent_at: None,
            is_visible: true,
            created_at: now,
        }
    }
}

/// Notification content enriched with one recipient's delivery state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserNotificationView {
    /// The shared notification content.
    #[serde(flatten)]
    pub notification: Notification,
    /// The delivery row id.
    pub delivery_id: Uuid,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub delivered_at: DateTime<Utc>,
}

impl UserNotificationView {
    /// Join a notification with a delivery row.
    pub fn new(notification: Notification, delivery: &UserNotification) -> Self {
        Self {
            notification,
            delivery_id: delivery.id,
            is_read: delivery.is_read,
            read_at: delivery.read_at,
            delivered_at: delivery.created_at,
        }
    }
}
