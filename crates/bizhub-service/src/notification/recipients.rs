//! Recipient resolution: who should receive a notification.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use bizhub_core::error::AppError;
use bizhub_database::UserDirectory;
use bizhub_entity::notification::NotificationType;
use bizhub_entity::user::{User, UserRole};

/// Who a notification is addressed to.
///
/// Precedence: explicit user ids, then roles, then broadcast, then the
/// type's default roles. `broadcast` defaults to `true` when neither ids
/// nor roles are given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Targeting {
    #[serde(default)]
    pub user_ids: Vec<Uuid>,
    #[serde(default)]
    pub roles: Vec<UserRole>,
    #[serde(default)]
    pub broadcast: Option<bool>,
}

impl Targeting {
    /// Address specific users.
    pub fn users(ids: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            user_ids: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Address every active user holding one of `roles`.
    pub fn roles(roles: impl IntoIterator<Item = UserRole>) -> Self {
        Self {
            roles: roles.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Use the notification type's default audience.
    pub fn type_default() -> Self {
        Self {
            broadcast: Some(false),
            ..Self::default()
        }
    }

    /// Whether this targeting resolves to every active user.
    pub fn is_broadcast(&self) -> bool {
        self.user_ids.is_empty() && self.roles.is_empty() && self.broadcast.unwrap_or(true)
    }
}

/// Default audience roles of a type; `None` means every active user.
pub fn fallback_roles(kind: NotificationType) -> Option<&'static [UserRole]> {
    const OPERATIONS: &[UserRole] = &[UserRole::Admin, UserRole::Manager, UserRole::Staff];
    const MANAGEMENT: &[UserRole] = &[UserRole::Admin, UserRole::Manager];
    match kind {
        NotificationType::OrderCreated
        | NotificationType::OrderStatusChanged
        | NotificationType::OrderCancelled
        | NotificationType::OrderHighValue
        | NotificationType::StockLow
        | NotificationType::StockMedium
        | NotificationType::StockOut
        | NotificationType::ProductCreated => Some(OPERATIONS),
        NotificationType::CustomerRegistered => Some(MANAGEMENT),
        NotificationType::SystemAnnouncement
        | NotificationType::Maintenance
        | NotificationType::Test => None,
    }
}

/// Resolves the active users a notification should be considered for.
#[derive(Debug, Clone)]
pub struct RecipientResolver {
    users: Arc<dyn UserDirectory>,
}

impl RecipientResolver {
    /// Creates a new recipient resolver.
    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        Self { users }
    }

    /// Resolve `targeting` for a `kind` notification, de-duplicated by id.
    pub async fn resolve(
        &self,
        kind: NotificationType,
        targeting: &Targeting,
    ) -> Result<Vec<User>, AppError> {
        let users = if !targeting.user_ids.is_empty() {
            self.users.find_active_by_ids(&targeting.user_ids).await?
        } else if !targeting.roles.is_empty() {
            self.users.find_active_by_roles(&targeting.roles).await?
        } else if targeting.broadcast.unwrap_or(true) {
            self.users.find_all_active().await?
        } else {
            match fallback_roles(kind) {
                Some(roles) => self.users.find_active_by_roles(roles).await?,
                None => self.users.find_all_active().await?,
            }
        };

        let mut seen = HashSet::with_capacity(users.len());
        let users: Vec<User> = users.into_iter().filter(|u| seen.insert(u.id)).collect();
        debug!(notification_type = %kind, recipients = users.len(), "Resolved recipients");
        Ok(users)
    }
}
