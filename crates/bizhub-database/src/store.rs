//! Async store traits the service layer depends on.
//!
//! Each trait has a PostgreSQL implementation in [`crate::repositories`] and
//! an in-memory implementation in [`crate::memory`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use bizhub_core::result::AppResult;
use bizhub_core::types::pagination::{PageRequest, PageResponse};
use bizhub_core::types::range::DateRange;
use bizhub_entity::notification::{
    Notification, NotificationPreference, NotificationStatistics, NotificationType,
    UserNotification, UserNotificationView,
};
use bizhub_entity::user::{User, UserRole};

/// Result of marking one delivery as read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The row flipped from unread to read.
    Updated(UserNotification),
    /// The row was already read; nothing changed.
    AlreadyRead,
    /// No delivery exists for the (notification, user) pair.
    NotFound,
}

/// Storage for notifications and their per-recipient delivery rows.
#[async_trait]
pub trait NotificationStore: Send + Sync + std::fmt::Debug {
    /// Persist a new notification.
    async fn insert_notification(&self, notification: &Notification) -> AppResult<()>;

    /// Persist a delivery row.
    ///
    /// Returns `false` without changing anything when a row for the same
    /// (notification, user) pair already exists.
    async fn insert_delivery(&self, delivery: &UserNotification) -> AppResult<bool>;

    /// Set the notification-level email marker.
    async fn mark_notification_email_sent(&self, notification_id: Uuid) -> AppResult<()>;

    /// Set the per-recipient email marker. Returns `false` if no row exists.
    async fn mark_delivery_email_sent(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Fetch a notification by id.
    async fn find_notification(&self, notification_id: Uuid) -> AppResult<Option<Notification>>;

    /// List a user's visible, unexpired notifications, newest first.
    async fn find_for_user(
        &self,
        user_id: Uuid,
        unread_only: bool,
        page: &PageRequest,
        now: DateTime<Utc>,
    ) -> AppResult<PageResponse<UserNotificationView>>;

    /// Flip one delivery to read if it is unread.
    async fn mark_read(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<ReadOutcome>;

    /// Flip every unread, visible, unexpired delivery of a user to read.
    async fn mark_all_read(&self, user_id: Uuid, at: DateTime<Utc>) -> AppResult<u64>;

    /// Hide a delivery. Returns `false` if no row exists.
    async fn hide(&self, notification_id: Uuid, user_id: Uuid) -> AppResult<bool>;

    /// Count unread, visible, unexpired deliveries of a user.
    async fn count_unread(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<u64>;

    /// Aggregate statistics over notifications created within `range`.
    async fn statistics(&self, range: &DateRange) -> AppResult<NotificationStatistics>;
}

/// Storage for per-(user, type) preferences.
#[async_trait]
pub trait PreferenceStore: Send + Sync + std::fmt::Debug {
    /// Fetch one stored preference.
    async fn get(
        &self,
        user_id: Uuid,
        kind: NotificationType,
    ) -> AppResult<Option<NotificationPreference>>;

    /// Fetch every stored preference of one user.
    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<NotificationPreference>>;

    /// Fetch stored preferences of many users for the given types.
    async fn find_for_users(
        &self,
        user_ids: &[Uuid],
        kinds: &[NotificationType],
    ) -> AppResult<Vec<NotificationPreference>>;

    /// Insert or replace a batch of preferences as one unit, keeping each
    /// row's original `created_at`.
    ///
    /// Either every row is written or none is.
    async fn upsert_many(
        &self,
        preferences: &[NotificationPreference],
    ) -> AppResult<Vec<NotificationPreference>>;

    /// Insert rows that do not exist yet; existing rows are left untouched.
    ///
    /// Returns the number of rows inserted.
    async fn insert_defaults(&self, preferences: &[NotificationPreference]) -> AppResult<u64>;
}

/// Read-only view of the identity subsystem's users.
#[async_trait]
pub trait UserDirectory: Send + Sync + std::fmt::Debug {
    /// Active users among `ids`.
    async fn find_active_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<User>>;

    /// Active users holding any of `roles`.
    async fn find_active_by_roles(&self, roles: &[UserRole]) -> AppResult<Vec<User>>;

    /// Every active user.
    async fn find_all_active(&self) -> AppResult<Vec<User>>;
}
