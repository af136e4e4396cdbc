//! Per-recipient read state and visibility.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use bizhub_core::error::AppError;
use bizhub_core::types::pagination::{PageRequest, PageResponse};
use bizhub_database::{NotificationStore, ReadOutcome};
use bizhub_entity::notification::UserNotificationView;

use super::channel::{RealtimeChannel, RealtimeEvent};

/// Result of marking one notification read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkReadResult {
    pub notification_id: Uuid,
    /// `false` when the notification was already read.
    pub changed: bool,
    /// Set when this call performed the transition.
    pub read_at: Option<DateTime<Utc>>,
    pub unread_count: u64,
}

/// Result of marking everything read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkAllReadResult {
    pub updated: u64,
    pub unread_count: u64,
}

/// Tracks read state per recipient and keeps live connections in sync.
#[derive(Debug, Clone)]
pub struct ReadStateManager {
    store: Arc<dyn NotificationStore>,
    realtime: Arc<dyn RealtimeChannel>,
}

impl ReadStateManager {
    /// Creates a new read-state manager.
    pub fn new(store: Arc<dyn NotificationStore>, realtime: Arc<dyn RealtimeChannel>) -> Self {
        Self { store, realtime }
    }

    /// A page of the user's visible notifications, newest first.
    pub async fn list(
        &self,
        user_id: Uuid,
        page: &PageRequest,
        unread_only: bool,
    ) -> Result<PageResponse<UserNotificationView>, AppError> {
        self.store
            .find_for_user(user_id, unread_only, page, Utc::now())
            .await
    }

    /// Number of visible, unexpired, unread notifications.
    pub async fn unread_count(&self, user_id: Uuid) -> Result<u64, AppError> {
        self.store.count_unread(user_id, Utc::now()).await
    }

    /// Mark one notification read. Idempotent.
    ///
    /// Only the first transition notifies the user's connections.
    pub async fn mark_as_read(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
    ) -> Result<MarkReadResult, AppError> {
        let outcome = self
            .store
            .mark_read(notification_id, user_id, Utc::now())
            .await?;

        let read_at = match outcome {
            ReadOutcome::NotFound => {
                return Err(AppError::not_found(format!(
                    "Notification {notification_id} not found"
                )));
            }
            ReadOutcome::AlreadyRead => None,
            ReadOutcome::Updated(delivery) => delivery.read_at,
        };

        let unread_count = self.unread_count(user_id).await?;
        if let Some(read_at) = read_at {
            let reached = self.realtime.send_to_user(
                user_id,
                RealtimeEvent::NotificationRead {
                    notification_id,
                    read_at,
                    unread_count,
                },
            );
            debug!(
                notification_id = %notification_id,
                user_id = %user_id,
                connections = reached,
                "Notification marked read"
            );
        }

        Ok(MarkReadResult {
            notification_id,
            changed: read_at.is_some(),
            read_at,
            unread_count,
        })
    }

    /// Mark every visible unread notification of the user read.
    pub async fn mark_all_as_read(&self, user_id: Uuid) -> Result<MarkAllReadResult, AppError> {
        let updated = self.store.mark_all_read(user_id, Utc::now()).await?;
        let unread_count = self.unread_count(user_id).await?;

        self.realtime.send_to_user(
            user_id,
            RealtimeEvent::NotificationsAllRead {
                updated,
                unread_count,
            },
        );
        info!(user_id = %user_id, updated, "Marked all notifications read");

        Ok(MarkAllReadResult {
            updated,
            unread_count,
        })
    }

    /// Hide a notification from the user's lists and counts. Idempotent.
    pub async fn hide(&self, notification_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        if !self.store.hide(notification_id, user_id).await? {
            return Err(AppError::not_found(format!(
                "Notification {notification_id} not found"
            )));
        }
        debug!(notification_id = %notification_id, user_id = %user_id, "Notification hidden");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::orchestrator::NotificationSpec;
    use crate::notification::recipients::Targeting;
    use crate::notification::test_support::Fixture;
    use bizhub_core::error::ErrorKind;
    use bizhub_entity::notification::{
        GeneralFacts, LocalizedText, Notification, NotificationMetadata, NotificationPriority,
        NotificationType, UserNotification,
    };
    use bizhub_entity::user::UserRole;
    use chrono::Duration;
    use std::collections::HashMap;

    async fn send(fx: &Fixture, users: &[Uuid]) -> Uuid {
        let spec = NotificationSpec::new(
            NotificationMetadata::SystemAnnouncement(GeneralFacts::default()),
            "Hi",
            "There",
        )
        .targeting(Targeting::users(users.iter().copied()));
        fx.services
            .orchestrator
            .create_notification(spec)
            .await
            .unwrap()
            .notification
            .id
    }

    #[tokio::test]
    async fn test_mark_as_read_is_idempotent() {
        let fx = Fixture::new();
        let a = fx.user("alice", UserRole::Staff);
        let first = send(&fx, &[a.id]).await;
        send(&fx, &[a.id]).await;
        assert_eq!(fx.unread(a.id).await, 2);

        let read = fx.services.read_state.mark_as_read(first, a.id).await.unwrap();
        assert!(read.changed);
        assert_eq!(read.unread_count, 1);

        let again = fx.services.read_state.mark_as_read(first, a.id).await.unwrap();
        assert!(!again.changed);
        assert_eq!(again.unread_count, 1);

        let read_events = fx
            .realtime
            .events_for(a.id)
            .into_iter()
            .filter(|e| matches!(e, RealtimeEvent::NotificationRead { .. }))
            .count();
        assert_eq!(read_events, 1);
    }

    #[tokio::test]
    async fn test_mark_as_read_unknown_pair() {
        let fx = Fixture::new();
        let a = fx.user("alice", UserRole::Staff);
        let b = fx.user("bob", UserRole::Staff);
        let id = send(&fx, &[a.id]).await;

        let err = fx.services.read_state.mark_as_read(id, b.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(fx.unread(a.id).await, 1);
    }

    #[tokio::test]
    async fn test_mark_all_only_touches_owner() {
        let fx = Fixture::new();
        let a = fx.user("alice", UserRole::Staff);
        let b = fx.user("bob", UserRole::Staff);
        send(&fx, &[a.id, b.id]).await;
        send(&fx, &[a.id]).await;

        let result = fx.services.read_state.mark_all_as_read(a.id).await.unwrap();
        assert_eq!(result.updated, 2);
        assert_eq!(result.unread_count, 0);
        assert_eq!(fx.unread(b.id).await, 1);

        let again = fx.services.read_state.mark_all_as_read(a.id).await.unwrap();
        assert_eq!(again.updated, 0);
    }

    #[tokio::test]
    async fn test_hide_drops_from_list_and_count() {
        let fx = Fixture::new();
        let a = fx.user("alice", UserRole::Staff);
        let id = send(&fx, &[a.id]).await;
        send(&fx, &[a.id]).await;

        fx.services.read_state.hide(id, a.id).await.unwrap();
        fx.services.read_state.hide(id, a.id).await.unwrap();
        assert_eq!(fx.unread(a.id).await, 1);

        let page = fx
            .services
            .read_state
            .list(a.id, &PageRequest::new(1, 20), false)
            .await
            .unwrap();
        assert_eq!(page.total_items, 1);
        assert!(page.items.iter().all(|v| v.notification.id != id));

        let err = fx
            .services
            .read_state
            .hide(Uuid::new_v4(), a.id)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_unread_filter() {
        let fx = Fixture::new();
        let a = fx.user("alice", UserRole::Staff);
        let first = send(&fx, &[a.id]).await;
        send(&fx, &[a.id]).await;
        fx.services.read_state.mark_as_read(first, a.id).await.unwrap();

        let unread = fx
            .services
            .read_state
            .list(a.id, &PageRequest::new(1, 20), true)
            .await
            .unwrap();
        assert_eq!(unread.total_items, 1);
        assert!(!unread.items[0].is_read);
    }

    /// Store a delivery whose notification expired an hour ago.
    async fn send_expired(fx: &Fixture, user_id: Uuid) -> Uuid {
        let now = Utc::now();
        let notification = Notification {
            id: Uuid::new_v4(),
            kind: NotificationType::SystemAnnouncement,
            title: "Old".to_string(),
            title_localized: LocalizedText::new(),
            message: "Already over".to_string(),
            message_localized: LocalizedText::new(),
            priority: NotificationPriority::default(),
            related_type: None,
            related_id: None,
            metadata: NotificationMetadata::SystemAnnouncement(GeneralFacts::default()),
            expires_at: Some(now - Duration::hours(1)),
            created_by: None,
            is_broadcast: false,
            target_roles: Vec::new(),
            email_sent: false,
            created_at: now - Duration::days(1),
        };
        let store = &fx.stores.notifications;
        store.insert_notification(&notification).await.unwrap();
        let delivery = UserNotification::new(notification.id, user_id, now - Duration::days(1));
        assert!(store.insert_delivery(&delivery).await.unwrap());
        notification.id
    }

    #[derive(Debug, Clone, Copy)]
    enum Step {
        Send { shared: bool },
        SendExpired,
        Read(usize),
        Hide(usize),
        ReadAll,
    }

    #[derive(Debug, Default, Clone, Copy)]
    struct Row {
        read: bool,
        hidden: bool,
        expired: bool,
    }

    #[tokio::test]
    async fn test_unread_count_matches_visible_unread_rows() {
        let fx = Fixture::new();
        let a = fx.user("alice", UserRole::Staff);
        let b = fx.user("bob", UserRole::Staff);

        // Indices refer to creation order.
        let script = [
            Step::Send { shared: true },
            Step::Send { shared: true },
            Step::SendExpired,
            Step::Send { shared: false },
            Step::Read(0),
            Step::Read(0),
            Step::Hide(1),
            Step::Hide(1),
            Step::Send { shared: true },
            Step::ReadAll,
            Step::Send { shared: false },
            Step::Send { shared: true },
            Step::Hide(5),
            Step::Read(4),
            Step::Read(3),
            Step::ReadAll,
            Step::Send { shared: false },
        ];

        let mut created: Vec<Uuid> = Vec::new();
        let mut rows: HashMap<Uuid, Row> = HashMap::new();
        let mut shared_sent = 0u64;

        for (i, step) in script.into_iter().enumerate() {
            match step {
                Step::Send { shared } => {
                    let recipients = if shared { vec![a.id, b.id] } else { vec![a.id] };
                    let id = send(&fx, &recipients).await;
                    shared_sent += u64::from(shared);
                    created.push(id);
                    rows.insert(id, Row::default());
                }
                Step::SendExpired => {
                    let id = send_expired(&fx, a.id).await;
                    created.push(id);
                    rows.insert(
                        id,
                        Row {
                            expired: true,
                            ..Row::default()
                        },
                    );
                }
                Step::Read(n) => {
                    fx.services
                        .read_state
                        .mark_as_read(created[n], a.id)
                        .await
                        .unwrap();
                    rows.get_mut(&created[n]).unwrap().read = true;
                }
                Step::Hide(n) => {
                    fx.services.read_state.hide(created[n], a.id).await.unwrap();
                    rows.get_mut(&created[n]).unwrap().hidden = true;
                }
                Step::ReadAll => {
                    fx.services.read_state.mark_all_as_read(a.id).await.unwrap();
                    for row in rows.values_mut().filter(|r| !r.hidden && !r.expired) {
                        row.read = true;
                    }
                }
            }

            let expected = rows
                .values()
                .filter(|r| !r.read && !r.hidden && !r.expired)
                .count() as u64;
            let listed = fx
                .services
                .read_state
                .list(a.id, &PageRequest::new(1, 50), true)
                .await
                .unwrap();
            assert_eq!(fx.unread(a.id).await, expected, "step {i}: {step:?}");
            assert_eq!(listed.total_items, expected, "step {i}: {step:?}");
            assert_eq!(fx.unread(b.id).await, shared_sent, "step {i}: {step:?}");
        }
    }
}
