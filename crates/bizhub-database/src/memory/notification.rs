//! In-memory notification store using DashMap.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use bizhub_core::result::AppResult;
use bizhub_core::types::pagination::{PageRequest, PageResponse};
use bizhub_core::types::range::DateRange;
use bizhub_entity::notification::{
    Notification, NotificationStatistics, PriorityCount, TypeCount, UserNotification,
    UserNotificationView,
};

use crate::store::{NotificationStore, ReadOutcome};

/// Deliveries keyed by `(notification_id, user_id)`.
type DeliveryKey = (Uuid, Uuid);

/// In-memory [`NotificationStore`].
#[derive(Debug, Default)]
pub struct MemoryNotificationStore {
    notifications: DashMap<Uuid, Notification>,
    deliveries: DashMap<DeliveryKey, UserNotification>,
}

impl MemoryNotificationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a delivery counts as visible at `now`.
    fn is_visible(&self, delivery: &UserNotification, now: DateTime<Utc>) -> bool {
        delivery.is_visible
            && self
                .notifications
                .get(&delivery.notification_id)
                .map(|n| !n.is_expired_at(now))
                .unwrap_or(false)
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn insert_notification(&self, notification: &Notification) -> AppResult<()> {
        self.notifications
            .insert(notification.id, notification.clone());
        Ok(())
    }

    async fn insert_delivery(&self, delivery: &UserNotification) -> AppResult<bool> {
        match self
            .deliveries
            .entry((delivery.notification_id, delivery.user_id))
        {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(delivery.clone());
                Ok(true)
            }
        }
    }

    async fn mark_notification_email_sent(&self, notification_id: Uuid) -> AppResult<()> {
        if let Some(mut n) = self.notifications.get_mut(&notification_id) {
            n.email_sent = true;
        }
        Ok(())
    }

    async fn mark_delivery_email_sent(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        match self.deliveries.get_mut(&(notification_id, user_id)) {
            Some(mut d) => {
                d.email_sent = true;
                d.email_sent_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_notification(&self, notification_id: Uuid) -> AppResult<Option<Notification>> {
        Ok(self.notifications.get(&notification_id).map(|n| n.clone()))
    }

    async fn find_for_user(
        &self,
        user_id: Uuid,
        unread_only: bool,
        page: &PageRequest,
        now: DateTime<Utc>,
    ) -> AppResult<PageResponse<UserNotificationView>> {
        let rows: Vec<UserNotification> = self
            .deliveries
            .iter()
            .filter(|d| d.user_id == user_id && !(unread_only && d.is_read))
            .map(|d| d.value().clone())
            .collect();

        let mut views: Vec<UserNotificationView> = rows
            .iter()
            .filter(|d| self.is_visible(d, now))
            .filter_map(|d| {
                self.notifications
                    .get(&d.notification_id)
                    .map(|n| UserNotificationView::new(n.clone(), d))
            })
            .collect();

        views.sort_by(|a, b| {
            b.delivered_at
                .cmp(&a.delivered_at)
                .then_with(|| b.notification.created_at.cmp(&a.notification.created_at))
                .then_with(|| b.notification.id.cmp(&a.notification.id))
        });

        Ok(PageResponse::from_full(views, page))
    }

    async fn mark_read(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<ReadOutcome> {
        let Some(mut delivery) = self.deliveries.get_mut(&(notification_id, user_id)) else {
            return Ok(ReadOutcome::NotFound);
        };
        if delivery.is_read {
            return Ok(ReadOutcome::AlreadyRead);
        }
        delivery.is_read = true;
        delivery.read_at = Some(at);
        Ok(ReadOutcome::Updated(delivery.clone()))
    }

    async fn mark_all_read(&self, user_id: Uuid, at: DateTime<Utc>) -> AppResult<u64> {
        let candidates: Vec<DeliveryKey> = self
            .deliveries
            .iter()
            .filter(|d| d.user_id == user_id && !d.is_read && self.is_visible(d, at))
            .map(|d| *d.key())
            .collect();

        let mut updated = 0;
        for key in candidates {
            if let Some(mut d) = self.deliveries.get_mut(&key)
                && !d.is_read
            {
                d.is_read = true;
                d.read_at = Some(at);
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn hide(&self, notification_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        match self.deliveries.get_mut(&(notification_id, user_id)) {
            Some(mut d) => {
                d.is_visible = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_unread(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<u64> {
        Ok(self
            .deliveries
            .iter()
            .filter(|d| d.user_id == user_id && !d.is_read && self.is_visible(d, now))
            .count() as u64)
    }

    async fn statistics(&self, range: &DateRange) -> AppResult<NotificationStatistics> {
        let mut by_type = BTreeMap::new();
        let mut by_priority = BTreeMap::new();
        for n in self.notifications.iter() {
            if range.contains(n.created_at) {
                *by_type.entry(n.kind).or_insert(0u64) += 1;
                *by_priority.entry(n.priority).or_insert(0u64) += 1;
            }
        }

        let (mut deliveries, mut read, mut emailed) = (0u64, 0u64, 0u64);
        for d in self.deliveries.iter() {
            let in_range = self
                .notifications
                .get(&d.notification_id)
                .map(|n| range.contains(n.created_at))
                .unwrap_or(false);
            if in_range {
                deliveries += 1;
                read += u64::from(d.is_read);
                emailed += u64::from(d.email_sent);
            }
        }

        Ok(NotificationStatistics {
            from: range.from,
            to: range.to,
            total_notifications: by_type.values().sum(),
            by_type: by_type
                .into_iter()
                .map(|(kind, count)| TypeCount { kind, count })
                .collect(),
            by_priority: by_priority
                .into_iter()
                .map(|(priority, count)| PriorityCount { priority, count })
                .collect(),
            total_deliveries: deliveries,
            read_deliveries: read,
            emails_sent: emailed,
            read_rate: NotificationStatistics::compute_read_rate(read, deliveries),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizhub_entity::notification::{
        GeneralFacts, NotificationMetadata, NotificationPriority, NotificationType,
    };
    use chrono::Duration;

    fn notification(expires_at: Option<DateTime<Utc>>) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            kind: NotificationType::SystemAnnouncement,
            title: "Hello".to_string(),
            title_localized: Default::default(),
            message: "World".to_string(),
            message_localized: Default::default(),
            priority: NotificationPriority::Medium,
            related_type: None,
            related_id: None,
            metadata: NotificationMetadata::SystemAnnouncement(GeneralFacts::default()),
            expires_at,
            created_by: None,
            is_broadcast: true,
            target_roles: Vec::new(),
            email_sent: false,
            created_at: Utc::now(),
        }
    }

    async fn deliver(store: &MemoryNotificationStore, n: &Notification, user: Uuid) {
        store.insert_notification(n).await.unwrap();
        let inserted = store
            .insert_delivery(&UserNotification::new(n.id, user, Utc::now()))
            .await
            .unwrap();
        assert!(inserted);
    }

    #[tokio::test]
    async fn test_duplicate_delivery_is_noop() {
        let store = MemoryNotificationStore::new();
        let user = Uuid::new_v4();
        let n = notification(None);
        deliver(&store, &n, user).await;

        let again = store
            .insert_delivery(&UserNotification::new(n.id, user, Utc::now()))
            .await
            .unwrap();
        assert!(!again);
        assert_eq!(store.count_unread(user, Utc::now()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mark_read_is_idempotent() {
        let store = MemoryNotificationStore::new();
        let user = Uuid::new_v4();
        let n = notification(None);
        deliver(&store, &n, user).await;

        let first = store.mark_read(n.id, user, Utc::now()).await.unwrap();
        assert!(matches!(first, ReadOutcome::Updated(ref d) if d.is_read && d.read_at.is_some()));
        let second = store.mark_read(n.id, user, Utc::now()).await.unwrap();
        assert_eq!(second, ReadOutcome::AlreadyRead);
        let missing = store.mark_read(n.id, Uuid::new_v4(), Utc::now()).await.unwrap();
        assert_eq!(missing, ReadOutcome::NotFound);
        assert_eq!(store.count_unread(user, Utc::now()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_hidden_and_expired_rows_are_not_counted() {
        let store = MemoryNotificationStore::new();
        let user = Uuid::new_v4();
        let live = notification(None);
        let expired = notification(Some(Utc::now() - Duration::minutes(1)));
        let hidden = notification(None);
        deliver(&store, &live, user).await;
        deliver(&store, &expired, user).await;
        deliver(&store, &hidden, user).await;
        assert!(store.hide(hidden.id, user).await.unwrap());

        let now = Utc::now();
        assert_eq!(store.count_unread(user, now).await.unwrap(), 1);
        let page = store
            .find_for_user(user, false, &PageRequest::default(), now)
            .await
            .unwrap();
        assert_eq!(page.total_items, 1);
        assert_eq!(page.items[0].notification.id, live.id);

        assert_eq!(store.mark_all_read(user, now).await.unwrap(), 1);
        assert_eq!(store.count_unread(user, now).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mark_all_read_only_touches_owner() {
        let store = MemoryNotificationStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let n = notification(None);
        deliver(&store, &n, alice).await;
        store
            .insert_delivery(&UserNotification::new(n.id, bob, Utc::now()))
            .await
            .unwrap();

        assert_eq!(store.mark_all_read(alice, Utc::now()).await.unwrap(), 1);
        assert_eq!(store.count_unread(bob, Utc::now()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_statistics() {
        let store = MemoryNotificationStore::new();
        let user = Uuid::new_v4();
        let n = notification(None);
        deliver(&store, &n, user).await;
        store.mark_read(n.id, user, Utc::now()).await.unwrap();

        let range = DateRange::resolve(None, Some(Utc::now() + Duration::minutes(1))).unwrap();
        let stats = store.statistics(&range).await.unwrap();
        assert_eq!(stats.total_notifications, 1);
        assert_eq!(stats.total_deliveries, 1);
        assert_eq!(stats.read_deliveries, 1);
        assert!((stats.read_rate - 1.0).abs() < f64::EPSILON);
        assert_eq!(stats.by_type[0].kind, NotificationType::SystemAnnouncement);
    }
}
