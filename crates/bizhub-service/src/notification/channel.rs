//! The realtime push seam.
//!
//! The service layer only knows this trait; the WebSocket connection
//! manager in `bizhub-realtime` implements it and is injected at startup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bizhub_entity::notification::UserNotificationView;
use bizhub_entity::user::UserRole;

/// An event pushed to live client connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RealtimeEvent {
    /// A new notification was delivered to the user.
    Notification(Box<UserNotificationView>),
    /// One notification flipped to read.
    NotificationRead {
        notification_id: Uuid,
        read_at: DateTime<Utc>,
        unread_count: u64,
    },
    /// Every unread notification was marked read.
    NotificationsAllRead { updated: u64, unread_count: u64 },
}

impl RealtimeEvent {
    /// Short event name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Notification(_) => "notification",
            Self::NotificationRead { .. } => "notification_read",
            Self::NotificationsAllRead { .. } => "notifications_all_read",
        }
    }
}

/// Push delivery to live connections.
///
/// Implementations never queue for offline users: with zero live
/// connections the event is dropped and `0` is returned.
pub trait RealtimeChannel: Send + Sync + std::fmt::Debug {
    /// Push to every live connection of one user. Returns connections reached.
    fn send_to_user(&self, user_id: Uuid, event: RealtimeEvent) -> usize;

    /// Push to every live connection of users holding `role`.
    fn send_to_role(&self, role: UserRole, event: RealtimeEvent) -> usize;
}
