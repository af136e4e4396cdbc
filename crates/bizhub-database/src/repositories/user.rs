//! Read-only user repository over the identity subsystem's `users` table.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use bizhub_core::error::{AppError, ErrorKind};
use bizhub_core::result::AppResult;
use bizhub_entity::user::{User, UserRole};

use crate::store::UserDirectory;

const USER_COLUMNS: &str = "id, username, email, display_name, role, is_active, created_at";

/// PostgreSQL-backed [`UserDirectory`].
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for UserRepository {
    async fn find_active_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1) AND is_active ORDER BY username"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find users by id", e))
    }

    async fn find_active_by_roles(&self, roles: &[UserRole]) -> AppResult<Vec<User>> {
        if roles.is_empty() {
            return Ok(Vec::new());
        }
        let roles: Vec<&str> = roles.iter().map(UserRole::as_str).collect();
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE role::text = ANY($1) AND is_active ORDER BY username"
        ))
        .bind(&roles)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find users by role", e))
    }

    async fn find_all_active(&self) -> AppResult<Vec<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE is_active ORDER BY username"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list active users", e))
    }
}
