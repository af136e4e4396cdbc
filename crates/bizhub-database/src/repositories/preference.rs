//! Notification preference repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use bizhub_core::error::{AppError, ErrorKind};
use bizhub_core::result::AppResult;
use bizhub_entity::notification::{NotificationPreference, NotificationType, Threshold};

use crate::store::PreferenceStore;

#[derive(Debug, sqlx::FromRow)]
struct PreferenceRow {
    user_id: Uuid,
    #[sqlx(rename = "type")]
    kind: NotificationType,
    in_app_enabled: bool,
    email_enabled: bool,
    threshold: Option<Json<Threshold>>,
    language: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PreferenceRow> for NotificationPreference {
    fn from(row: PreferenceRow) -> Self {
        Self {
            user_id: row.user_id,
            kind: row.kind,
            in_app_enabled: row.in_app_enabled,
            email_enabled: row.email_enabled,
            threshold: row.threshold.map(|t| t.0),
            language: row.language,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// PostgreSQL-backed [`PreferenceStore`].
#[derive(Debug, Clone)]
pub struct PreferenceRepository {
    pool: PgPool,
}

impl PreferenceRepository {
    /// Create a new preference repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PreferenceStore for PreferenceRepository {
    async fn get(
        &self,
        user_id: Uuid,
        kind: NotificationType,
    ) -> AppResult<Option<NotificationPreference>> {
        let row = sqlx::query_as::<_, PreferenceRow>(
            "SELECT * FROM notification_preferences WHERE user_id = $1 AND type = $2",
        )
        .bind(user_id)
        .bind(kind)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to get preference", e))?;
        Ok(row.map(NotificationPreference::from))
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<NotificationPreference>> {
        let rows = sqlx::query_as::<_, PreferenceRow>(
            "SELECT * FROM notification_preferences WHERE user_id = $1 ORDER BY type",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list preferences", e))?;
        Ok(rows.into_iter().map(NotificationPreference::from).collect())
    }

    async fn find_for_users(
        &self,
        user_ids: &[Uuid],
        kinds: &[NotificationType],
    ) -> AppResult<Vec<NotificationPreference>> {
        if user_ids.is_empty() || kinds.is_empty() {
            return Ok(Vec::new());
        }
        let kinds: Vec<&str> = kinds.iter().map(NotificationType::as_str).collect();
        let rows = sqlx::query_as::<_, PreferenceRow>(
            "SELECT * FROM notification_preferences \
             WHERE user_id = ANY($1) AND type::text = ANY($2)",
        )
        .bind(user_ids)
        .bind(&kinds)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load preferences", e))?;
        Ok(rows.into_iter().map(NotificationPreference::from).collect())
    }

    async fn upsert_many(
        &self,
        preferences: &[NotificationPreference],
    ) -> AppResult<Vec<NotificationPreference>> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin preference update", e)
        })?;

        let mut saved = Vec::with_capacity(preferences.len());
        for preference in preferences {
            let row = sqlx::query_as::<_, PreferenceRow>(
                "INSERT INTO notification_preferences \
                 (user_id, type, in_app_enabled, email_enabled, threshold, language, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
                 ON CONFLICT (user_id, type) DO UPDATE SET \
                    in_app_enabled = EXCLUDED.in_app_enabled, \
                    email_enabled = EXCLUDED.email_enabled, \
                    threshold = EXCLUDED.threshold, \
                    language = EXCLUDED.language, \
                    updated_at = EXCLUDED.updated_at \
                 RETURNING *",
            )
            .bind(preference.user_id)
            .bind(preference.kind)
            .bind(preference.in_app_enabled)
            .bind(preference.email_enabled)
            .bind(preference.threshold.map(Json))
            .bind(&preference.language)
            .bind(preference.created_at)
            .bind(preference.updated_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to upsert preference", e)
            })?;
            saved.push(row.into());
        }

        // Dropping `tx` on an early return rolls the batch back.
        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit preference update", e)
        })?;
        Ok(saved)
    }

    async fn insert_defaults(&self, preferences: &[NotificationPreference]) -> AppResult<u64> {
        if preferences.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "INSERT INTO notification_preferences \
             (user_id, type, in_app_enabled, email_enabled, threshold, language, created_at, updated_at) ",
        );
        builder.push_values(preferences, |mut row, p| {
            row.push_bind(p.user_id)
                .push_bind(p.kind)
                .push_bind(p.in_app_enabled)
                .push_bind(p.email_enabled)
                .push_bind(p.threshold.map(Json))
                .push_bind(&p.language)
                .push_bind(p.created_at)
                .push_bind(p.updated_at);
        });
        builder.push(" ON CONFLICT (user_id, type) DO NOTHING");

        let result = builder.build().execute(&self.pool).await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to insert default preferences", e)
        })?;
        Ok(result.rows_affected())
    }
}
