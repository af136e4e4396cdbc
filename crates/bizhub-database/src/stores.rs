//! Store bundle that dispatches to the configured backend.

use std::sync::Arc;

use tracing::info;

use bizhub_core::config::{DatabaseBackend, DatabaseConfig};
use bizhub_core::result::AppResult;

use crate::connection::DatabasePool;
use crate::memory::{MemoryNotificationStore, MemoryPreferenceStore, MemoryUserDirectory};
use crate::migration::run_migrations;
use crate::repositories::{NotificationRepository, PreferenceRepository, UserRepository};
use crate::store::{NotificationStore, PreferenceStore, UserDirectory};

/// The three stores the notification engine needs.
///
/// The implementation is selected at construction time based on
/// `database.backend`.
#[derive(Debug, Clone)]
pub struct Stores {
    /// Notifications and delivery rows.
    pub notifications: Arc<dyn NotificationStore>,
    /// Per-(user, type) preferences.
    pub preferences: Arc<dyn PreferenceStore>,
    /// Read-only user directory.
    pub users: Arc<dyn UserDirectory>,
    pool: Option<DatabasePool>,
}

impl Stores {
    /// Build the stores from configuration, connecting and migrating if needed.
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        match config.backend {
            DatabaseBackend::Postgres => {
                let pool = DatabasePool::connect(config).await?;
                if config.run_migrations {
                    run_migrations(pool.pool()).await?;
                }
                Ok(Self::postgres(pool))
            }
            DatabaseBackend::Memory => {
                info!("Initializing in-memory notification stores");
                Ok(Self::memory(Arc::new(MemoryUserDirectory::new())))
            }
        }
    }

    /// PostgreSQL repositories sharing one pool.
    pub fn postgres(pool: DatabasePool) -> Self {
        let pg = pool.pool().clone();
        Self {
            notifications: Arc::new(NotificationRepository::new(pg.clone())),
            preferences: Arc::new(PreferenceRepository::new(pg.clone())),
            users: Arc::new(UserRepository::new(pg)),
            pool: Some(pool),
        }
    }

    /// Fresh in-memory stores over the given user directory.
    pub fn memory(users: Arc<MemoryUserDirectory>) -> Self {
        Self {
            notifications: Arc::new(MemoryNotificationStore::new()),
            preferences: Arc::new(MemoryPreferenceStore::new()),
            users,
            pool: None,
        }
    }

    /// Which backend these stores use.
    pub fn backend(&self) -> DatabaseBackend {
        if self.pool.is_some() {
            DatabaseBackend::Postgres
        } else {
            DatabaseBackend::Memory
        }
    }

    /// Check backend connectivity. The in-memory backend is always healthy.
    pub async fn health_check(&self) -> AppResult<bool> {
        match &self.pool {
            Some(pool) => pool.health_check().await,
            None => Ok(true),
        }
    }

    /// Release backend resources.
    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
