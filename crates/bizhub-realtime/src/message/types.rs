//! Inbound and outbound WebSocket message type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bizhub_entity::notification::UserNotificationView;
use bizhub_entity::user::UserRole;
use bizhub_service::RealtimeEvent;

/// Messages sent by the client to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Mark one notification as read.
    MarkRead {
        /// Notification ID.
        notification_id: Uuid,
    },
    /// Mark every notification as read.
    MarkAllRead,
    /// Pong response to server ping.
    Pong {
        /// Echoed timestamp.
        #[serde(default)]
        timestamp: Option<i64>,
    },
}

/// Messages sent by the server to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Sent once after the connection is admitted.
    Connected {
        connection_id: Uuid,
        user_id: Uuid,
        role: UserRole,
        server_time: DateTime<Utc>,
    },
    /// A new notification with this user's delivery state.
    Notification {
        notification: Box<UserNotificationView>,
    },
    /// A notification was marked read.
    NotificationRead {
        notification_id: Uuid,
        read_at: DateTime<Utc>,
        unread_count: u64,
    },
    /// All notifications were marked read.
    NotificationsAllRead { updated: u64, unread_count: u64 },
    /// Ping (server keepalive).
    Ping {
        /// Server timestamp in milliseconds.
        timestamp: i64,
    },
    /// Error message.
    Error {
        /// Error code.
        code: String,
        /// Error description.
        message: String,
    },
}

impl OutboundMessage {
    /// Build an error message.
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }

    /// The `type` tag, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Notification { .. } => "notification",
            Self::NotificationRead { .. } => "notification_read",
            Self::NotificationsAllRead { .. } => "notifications_all_read",
            Self::Ping { .. } => "ping",
            Self::Error { .. } => "error",
        }
    }
}

impl From<RealtimeEvent> for OutboundMessage {
    fn from(event: RealtimeEvent) -> Self {
        match event {
            RealtimeEvent::Notification(notification) => Self::Notification { notification },
            RealtimeEvent::NotificationRead {
                notification_id,
                read_at,
                unread_count,
            } => Self::NotificationRead {
                notification_id,
                read_at,
                unread_count,
            },
            RealtimeEvent::NotificationsAllRead {
                updated,
                unread_count,
            } => Self::NotificationsAllRead {
                updated,
                unread_count,
            },
        }
    }
}
