//! Administrator operations: broadcasts, test sends and statistics.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use bizhub_auth::{NotificationPermission, RbacEnforcer};
use bizhub_core::error::AppError;
use bizhub_core::types::range::DateRange;
use bizhub_database::NotificationStore;
use bizhub_entity::notification::{
    GeneralFacts, LocalizedText, NotificationMetadata, NotificationPriority,
    NotificationStatistics, NotificationType,
};
use bizhub_entity::user::UserRole;

use crate::context::RequestContext;

use super::orchestrator::{
    FanOutOutcome, NotificationOrchestrator, NotificationOrigin, NotificationSpec,
};
use super::recipients::Targeting;

/// An administrator's announcement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastRequest {
    /// `system_announcement` or `maintenance`.
    #[serde(rename = "type", default = "default_broadcast_type")]
    pub kind: NotificationType,
    pub title: String,
    #[serde(default)]
    pub title_localized: LocalizedText,
    pub message: String,
    #[serde(default)]
    pub message_localized: LocalizedText,
    #[serde(default)]
    pub priority: NotificationPriority,
    /// Explicit recipients; takes precedence over `roles`.
    #[serde(default)]
    pub user_ids: Vec<Uuid>,
    #[serde(default)]
    pub roles: Vec<UserRole>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

fn default_broadcast_type() -> NotificationType {
    NotificationType::SystemAnnouncement
}

/// Admin-only notification operations.
#[derive(Debug, Clone)]
pub struct NotificationAdminService {
    orchestrator: NotificationOrchestrator,
    store: Arc<dyn NotificationStore>,
    rbac: RbacEnforcer,
}

impl NotificationAdminService {
    /// Creates a new admin service.
    pub fn new(orchestrator: NotificationOrchestrator, store: Arc<dyn NotificationStore>) -> Self {
        Self {
            orchestrator,
            store,
            rbac: RbacEnforcer::new(),
        }
    }

    /// Send an announcement to users, roles or everyone.
    pub async fn broadcast(
        &self,
        ctx: &RequestContext,
        request: BroadcastRequest,
    ) -> Result<FanOutOutcome, AppError> {
        self.rbac
            .require_permission(&ctx.role, NotificationPermission::Broadcast)?;

        if !request.kind.is_general() {
            return Err(AppError::validation(format!(
                "Type '{}' cannot be broadcast; use system_announcement or maintenance",
                request.kind
            )));
        }
        let metadata = NotificationMetadata::general(
            request.kind,
            GeneralFacts {
                attributes: request.attributes,
            },
        )
        .ok_or_else(|| AppError::validation("Unsupported broadcast type"))?;

        let mut spec = NotificationSpec::new(metadata, request.title, request.message)
            .priority(request.priority)
            .targeting(Targeting {
                user_ids: request.user_ids,
                roles: request.roles,
                broadcast: Some(true),
            })
            .created_by(Some(ctx.user_id))
            .origin(NotificationOrigin::Broadcast);
        spec.title_localized = request.title_localized;
        spec.message_localized = request.message_localized;
        if let Some(expires_at) = request.expires_at {
            spec = spec.expires_at(expires_at);
        }

        let outcome = self.orchestrator.create_notification(spec).await?;
        info!(
            admin_id = %ctx.user_id,
            notification_id = %outcome.notification.id,
            deliveries = outcome.deliveries.len(),
            "Broadcast sent"
        );
        Ok(outcome)
    }

    /// Send a `test` notification to the caller.
    pub async fn send_test(&self, ctx: &RequestContext) -> Result<FanOutOutcome, AppError> {
        self.rbac
            .require_permission(&ctx.role, NotificationPermission::SendTest)?;

        let mut attributes = BTreeMap::new();
        attributes.insert(
            "requested_by".to_string(),
            serde_json::Value::String(ctx.username.clone()),
        );
        let spec = NotificationSpec::new(
            NotificationMetadata::Test(GeneralFacts { attributes }),
            "Test notification",
            "This is a test notification. Delivery is working.",
        )
        .localized("ar", "إشعار تجريبي", "هذا إشعار تجريبي. التوصيل يعمل.")
        .priority(NotificationPriority::Low)
        .targeting(Targeting::users([ctx.user_id]))
        .created_by(Some(ctx.user_id));

        self.orchestrator.create_notification(spec).await
    }

    /// Totals, per-type and per-priority counts and read rate over a range.
    ///
    /// Missing bounds default to the last 30 days.
    pub async fn statistics(
        &self,
        ctx: &RequestContext,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<NotificationStatistics, AppError> {
        self.rbac
            .require_permission(&ctx.role, NotificationPermission::ViewStatistics)?;
        let range = DateRange::resolve(from, to)?;
        self.store.statistics(&range).await
    }
}
