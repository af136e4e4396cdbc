//! Notification and delivery repository implementation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use bizhub_core::error::{AppError, ErrorKind};
use bizhub_core::result::AppResult;
use bizhub_core::types::pagination::{PageRequest, PageResponse};
use bizhub_core::types::range::DateRange;
use bizhub_entity::notification::{
    LocalizedText, Notification, NotificationMetadata, NotificationPriority,
    NotificationStatistics, NotificationType, PriorityCount, TypeCount, UserNotification,
    UserNotificationView,
};
use bizhub_entity::user::UserRole;

use crate::store::{NotificationStore, ReadOutcome};

/// Columns of `notifications`, qualified with the `n` alias.
const NOTIFICATION_COLUMNS: &str = "n.id, n.type, n.title, n.title_localized, n.message, \
     n.message_localized, n.priority, n.related_type, n.related_id, n.metadata, n.expires_at, \
     n.created_by, n.is_broadcast, n.target_roles, n.email_sent, n.created_at";

/// Visible and not expired; `$2` is the reference instant.
const VISIBLE_FILTER: &str = "un.is_visible AND (n.expires_at IS NULL OR n.expires_at > $2)";

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    #[sqlx(rename = "type")]
    kind: NotificationType,
    title: String,
    title_localized: Json<LocalizedText>,
    message: String,
    message_localized: Json<LocalizedText>,
    priority: NotificationPriority,
    related_type: Option<String>,
    related_id: Option<Uuid>,
    metadata: Json<NotificationMetadata>,
    expires_at: Option<DateTime<Utc>>,
    created_by: Option<Uuid>,
    is_broadcast: bool,
    target_roles: Json<Vec<UserRole>>,
    email_sent: bool,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Self {
            id: row.id,
            kind: row.kind,
            title: row.title,
            title_localized: row.title_localized.0,
            message: row.message,
            message_localized: row.message_localized.0,
            priority: row.priority,
            related_type: row.related_type,
            related_id: row.related_id,
            metadata: row.metadata.0,
            expires_at: row.expires_at,
            created_by: row.created_by,
            is_broadcast: row.is_broadcast,
            target_roles: row.target_roles.0,
            email_sent: row.email_sent,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ViewRow {
    #[sqlx(flatten)]
    notification: NotificationRow,
    delivery_id: Uuid,
    is_read: bool,
    read_at: Option<DateTime<Utc>>,
    delivered_at: DateTime<Utc>,
}

impl From<ViewRow> for UserNotificationView {
    fn from(row: ViewRow) -> Self {
        Self {
            notification: row.notification.into(),
            delivery_id: row.delivery_id,
            is_read: row.is_read,
            read_at: row.read_at,
            delivered_at: row.delivered_at,
        }
    }
}

/// PostgreSQL-backed [`NotificationStore`].
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    /// Create a new notification repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for NotificationRepository {
    async fn insert_notification(&self, notification: &Notification) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO notifications (id, type, title, title_localized, message, message_localized, \
             priority, related_type, related_id, metadata, expires_at, created_by, is_broadcast, \
             target_roles, email_sent, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
        )
        .bind(notification.id)
        .bind(notification.kind)
        .bind(&notification.title)
        .bind(Json(&notification.title_localized))
        .bind(&notification.message)
        .bind(Json(&notification.message_localized))
        .bind(notification.priority)
        .bind(&notification.related_type)
        .bind(notification.related_id)
        .bind(Json(&notification.metadata))
        .bind(notification.expires_at)
        .bind(notification.created_by)
        .bind(notification.is_broadcast)
        .bind(Json(&notification.target_roles))
        .bind(notification.email_sent)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create notification", e))?;
        Ok(())
    }

    async fn insert_delivery(&self, delivery: &UserNotification) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT INTO user_notifications (id, notification_id, user_id, is_read, read_at, \
             email_sent, email_sent_at, is_visible, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (notification_id, user_id) DO NOTHING",
        )
        .bind(delivery.id)
        .bind(delivery.notification_id)
        .bind(delivery.user_id)
        .bind(delivery.is_read)
        .bind(delivery.read_at)
        .bind(delivery.email_sent)
        .bind(delivery.email_sent_at)
        .bind(delivery.is_visible)
        .bind(delivery.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create delivery", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_notification_email_sent(&self, notification_id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE notifications SET email_sent = TRUE WHERE id = $1 AND NOT email_sent")
            .bind(notification_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to mark notification emailed", e)
            })?;
        Ok(())
    }

    async fn mark_delivery_email_sent(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE user_notifications SET email_sent = TRUE, email_sent_at = $3 \
             WHERE notification_id = $1 AND user_id = $2",
        )
        .bind(notification_id)
        .bind(user_id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to mark delivery emailed", e)
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_notification(&self, notification_id: Uuid) -> AppResult<Option<Notification>> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications n WHERE n.id = $1"
        ))
        .bind(notification_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find notification", e))?;
        Ok(row.map(Notification::from))
    }

    async fn find_for_user(
        &self,
        user_id: Uuid,
        unread_only: bool,
        page: &PageRequest,
        now: DateTime<Utc>,
    ) -> AppResult<PageResponse<UserNotificationView>> {
        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM user_notifications un \
             JOIN notifications n ON n.id = un.notification_id \
             WHERE un.user_id = $1 AND {VISIBLE_FILTER} AND ($3 = FALSE OR NOT un.is_read)"
        ))
        .bind(user_id)
        .bind(now)
        .bind(unread_only)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count notifications", e))?;

        let rows = sqlx::query_as::<_, ViewRow>(&format!(
            "SELECT {NOTIFICATION_COLUMNS}, un.id AS delivery_id, un.is_read, un.read_at, \
             un.created_at AS delivered_at \
             FROM user_notifications un \
             JOIN notifications n ON n.id = un.notification_id \
             WHERE un.user_id = $1 AND {VISIBLE_FILTER} AND ($3 = FALSE OR NOT un.is_read) \
             ORDER BY un.created_at DESC, n.created_at DESC \
             LIMIT $4 OFFSET $5"
        ))
        .bind(user_id)
        .bind(now)
        .bind(unread_only)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list notifications", e))?;

        Ok(PageResponse::new(
            rows.into_iter().map(UserNotificationView::from).collect(),
            page,
            total as u64,
        ))
    }

    async fn mark_read(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<ReadOutcome> {
        let updated = sqlx::query_as::<_, UserNotification>(
            "UPDATE user_notifications SET is_read = TRUE, read_at = $3 \
             WHERE notification_id = $1 AND user_id = $2 AND NOT is_read \
             RETURNING *",
        )
        .bind(notification_id)
        .bind(user_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark read", e))?;

        if let Some(row) = updated {
            return Ok(ReadOutcome::Updated(row));
        }

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM user_notifications WHERE notification_id = $1 AND user_id = $2)",
        )
        .bind(notification_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to look up delivery", e))?;

        Ok(if exists {
            ReadOutcome::AlreadyRead
        } else {
            ReadOutcome::NotFound
        })
    }

    async fn mark_all_read(&self, user_id: Uuid, at: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(&format!(
            "UPDATE user_notifications un SET is_read = TRUE, read_at = $2 \
             FROM notifications n \
             WHERE n.id = un.notification_id AND un.user_id = $1 AND NOT un.is_read \
             AND {VISIBLE_FILTER}"
        ))
        .bind(user_id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark all read", e))?;
        Ok(result.rows_affected())
    }

    async fn hide(&self, notification_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE user_notifications SET is_visible = FALSE \
             WHERE notification_id = $1 AND user_id = $2",
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to hide notification", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_unread(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM user_notifications un \
             JOIN notifications n ON n.id = un.notification_id \
             WHERE un.user_id = $1 AND NOT un.is_read AND {VISIBLE_FILTER}"
        ))
        .bind(user_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count unread", e))?;
        Ok(count as u64)
    }

    async fn statistics(&self, range: &DateRange) -> AppResult<NotificationStatistics> {
        let by_type: Vec<(NotificationType, i64)> = sqlx::query_as(
            "SELECT type, COUNT(*) FROM notifications \
             WHERE created_at >= $1 AND created_at < $2 GROUP BY type",
        )
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count by type", e))?;

        let by_priority: Vec<(NotificationPriority, i64)> = sqlx::query_as(
            "SELECT priority, COUNT(*) FROM notifications \
             WHERE created_at >= $1 AND created_at < $2 GROUP BY priority",
        )
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count by priority", e))?;

        let (deliveries, read, emailed): (i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), \
                    COUNT(*) FILTER (WHERE un.is_read), \
                    COUNT(*) FILTER (WHERE un.email_sent) \
             FROM user_notifications un \
             JOIN notifications n ON n.id = un.notification_id \
             WHERE n.created_at >= $1 AND n.created_at < $2",
        )
        .bind(range.from)
        .bind(range.to)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count deliveries", e))?;

        let by_type: BTreeMap<NotificationType, u64> = by_type
            .into_iter()
            .map(|(kind, count)| (kind, count as u64))
            .collect();
        let by_priority: BTreeMap<NotificationPriority, u64> = by_priority
            .into_iter()
            .map(|(priority, count)| (priority, count as u64))
            .collect();

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
            total_deliveries: deliveries as u64,
            read_deliveries: read as u64,
            emails_sent: emailed as u64,
            read_rate: NotificationStatistics::compute_read_rate(read as u64, deliveries as u64),
        })
    }
}
