//! Notification creation and per-recipient fan-out.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use bizhub_core::error::AppError;
use bizhub_database::NotificationStore;
use bizhub_entity::notification::{
    LocalizedText, Notification, NotificationMetadata, NotificationPriority, NotificationType,
    UserNotification, UserNotificationView,
};
use bizhub_entity::user::{User, UserRole};

use super::channel::{RealtimeChannel, RealtimeEvent};
use super::email::EmailChannel;
use super::preferences::PreferenceService;
use super::recipients::{RecipientResolver, Targeting, fallback_roles};
use super::threshold::{ResolvedThresholds, eligible};

/// Where a notification request came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationOrigin {
    /// An administrator's broadcast.
    Broadcast,
    /// A business event or a direct send.
    #[default]
    Direct,
}

/// Everything needed to create one notification.
#[derive(Debug, Clone)]
pub struct NotificationSpec {
    pub title: String,
    pub title_localized: LocalizedText,
    pub message: String,
    pub message_localized: LocalizedText,
    pub priority: NotificationPriority,
    pub targeting: Targeting,
    /// Related entity; derived from the metadata when unset.
    pub related: Option<(String, Uuid)>,
    pub metadata: NotificationMetadata,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
    pub origin: NotificationOrigin,
}

impl NotificationSpec {
    /// A medium-priority notification addressed to every active user.
    pub fn new(
        metadata: NotificationMetadata,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            title_localized: LocalizedText::new(),
            message: message.into(),
            message_localized: LocalizedText::new(),
            priority: NotificationPriority::default(),
            targeting: Targeting::default(),
            related: None,
            metadata,
            expires_at: None,
            created_by: None,
            origin: NotificationOrigin::Direct,
        }
    }

    /// The notification type, implied by the metadata.
    pub fn kind(&self) -> NotificationType {
        self.metadata.kind()
    }

    pub fn priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn targeting(mut self, targeting: Targeting) -> Self {
        self.targeting = targeting;
        self
    }

    pub fn localized(
        mut self,
        language: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let language = language.into();
        self.title_localized.insert(language.clone(), title.into());
        self.message_localized.insert(language, message.into());
        self
    }

    pub fn related(mut self, entity_type: impl Into<String>, id: Uuid) -> Self {
        self.related = Some((entity_type.into(), id));
        self
    }

    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    pub fn created_by(mut self, user_id: Option<Uuid>) -> Self {
        self.created_by = user_id;
        self
    }

    pub fn origin(mut self, origin: NotificationOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Reject caller input errors before anything is persisted.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::validation("Notification title must not be empty"));
        }
        if self.message.trim().is_empty() {
            return Err(AppError::validation("Notification message must not be empty"));
        }
        let blank_translation = self
            .title_localized
            .iter()
            .chain(&self.message_localized)
            .find(|(_, text)| text.trim().is_empty());
        if let Some((language, _)) = blank_translation {
            return Err(AppError::validation(format!(
                "Translation for '{language}' must not be empty"
            )));
        }
        if let Some(expires_at) = self.expires_at
            && expires_at <= now
        {
            return Err(AppError::validation("Notification expiry must be in the future"));
        }
        Ok(())
    }

    fn target_roles(&self) -> Vec<UserRole> {
        if !self.targeting.user_ids.is_empty() {
            Vec::new()
        } else if !self.targeting.roles.is_empty() {
            self.targeting.roles.clone()
        } else if self.targeting.is_broadcast() {
            Vec::new()
        } else {
            fallback_roles(self.kind())
                .map(<[UserRole]>::to_vec)
                .unwrap_or_default()
        }
    }

    fn into_notification(self, now: DateTime<Utc>) -> Notification {
        let target_roles = self.target_roles();
        let is_broadcast = self.targeting.is_broadcast();
        let (related_type, related_id) = match self.related {
            Some((entity_type, id)) => (Some(entity_type), Some(id)),
            None => match self.metadata.related_entity() {
                Some((entity_type, id)) => (Some(entity_type.to_string()), Some(id)),
                None => (None, None),
            },
        };

        Notification {
            id: Uuid::new_v4(),
            kind: self.metadata.kind(),
            title: self.title,
            title_localized: self.title_localized,
            message: self.message,
            message_localized: self.message_localized,
            priority: self.priority,
            related_type,
            related_id,
            metadata: self.metadata,
            expires_at: self.expires_at,
            created_by: self.created_by,
            is_broadcast,
            target_roles,
            email_sent: false,
            created_at: now,
        }
    }
}

/// The result of one fan-out.
#[derive(Debug, Clone, Serialize)]
pub struct FanOutOutcome {
    /// The persisted notification.
    pub notification: Notification,
    /// In-app delivery rows created.
    pub deliveries: Vec<UserNotification>,
    /// Number of resolved candidate recipients.
    pub recipients_considered: usize,
}

/// Creates notifications and fans them out to recipients.
#[derive(Debug, Clone)]
pub struct NotificationOrchestrator {
    store: Arc<dyn NotificationStore>,
    resolver: RecipientResolver,
    preferences: PreferenceService,
    realtime: Arc<dyn RealtimeChannel>,
    email: EmailChannel,
    fanout_concurrency: usize,
}

impl NotificationOrchestrator {
    /// Creates a new orchestrator.
    pub fn new(
        store: Arc<dyn NotificationStore>,
        resolver: RecipientResolver,
        preferences: PreferenceService,
        realtime: Arc<dyn RealtimeChannel>,
        email: EmailChannel,
        fanout_concurrency: usize,
    ) -> Self {
        Self {
            store,
            resolver,
            preferences,
            realtime,
            email,
            fanout_concurrency: fanout_concurrency.max(1),
        }
    }

    /// The recipient resolver used for fan-out.
    pub fn resolver(&self) -> &RecipientResolver {
        &self.resolver
    }

    /// The preference service used for fan-out.
    pub fn preferences(&self) -> &PreferenceService {
        &self.preferences
    }

    /// Persist a notification and deliver it to each eligible recipient.
    ///
    /// The notification row is written before recipients are resolved, so
    /// it exists exactly once even when nobody receives it. Per-recipient
    /// failures are logged and never fail the call.
    pub async fn create_notification(
        &self,
        spec: NotificationSpec,
    ) -> Result<FanOutOutcome, AppError> {
        let now = Utc::now();
        spec.validate(now)?;

        let targeting = spec.targeting.clone();
        let origin = spec.origin;
        let notification = spec.into_notification(now);
        self.store.insert_notification(&notification).await?;

        let recipients = self.resolver.resolve(notification.kind, &targeting).await?;
        let recipients_considered = recipients.len();

        let shared = Arc::new(notification);
        let deliveries: Vec<UserNotification> = stream::iter(recipients)
            .map(|user| {
                let notification = Arc::clone(&shared);
                async move { self.deliver(&notification, user).await }
            })
            .buffer_unordered(self.fanout_concurrency)
            .filter_map(|delivery| async move { delivery })
            .collect()
            .await;

        let notification = Arc::unwrap_or_clone(shared);
        info!(
            notification_id = %notification.id,
            notification_type = %notification.kind,
            origin = ?origin,
            recipients = recipients_considered,
            deliveries = deliveries.len(),
            "Notification fanned out"
        );

        Ok(FanOutOutcome {
            notification,
            deliveries,
            recipients_considered,
        })
    }

    /// Deliver to one recipient. Returns the in-app row if one was created.
    async fn deliver(&self, notification: &Notification, user: User) -> Option<UserNotification> {
        let pref = match self.preferences.get_or_create(user.id, notification.kind).await {
            Ok(pref) => pref,
            Err(e) => {
                warn!(
                    notification_id = %notification.id,
                    user_id = %user.id,
                    error = %e,
                    "Failed to load preference; skipping recipient"
                );
                return None;
            }
        };

        if !pref.in_app_enabled && !pref.email_enabled {
            debug!(user_id = %user.id, notification_type = %notification.kind, "All channels disabled");
            return None;
        }

        let thresholds = match self.preferences.resolve_thresholds(&pref).await {
            Ok(thresholds) => thresholds,
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "Failed to resolve thresholds; using defaults");
                ResolvedThresholds::default()
            }
        };
        if !eligible(notification.kind, &notification.metadata, &thresholds) {
            debug!(
                user_id = %user.id,
                notification_type = %notification.kind,
                "Recipient below threshold"
            );
            return None;
        }

        let mut delivered = None;
        if pref.in_app_enabled {
            delivered = self.deliver_in_app(notification, user.id).await;
        }
        if pref.email_enabled {
            self.email.send(notification, &user, &pref.language).await;
        }
        delivered
    }

    async fn deliver_in_app(
        &self,
        notification: &Notification,
        user_id: Uuid,
    ) -> Option<UserNotification> {
        let delivery = UserNotification::new(notification.id, user_id, Utc::now());
        match self.store.insert_delivery(&delivery).await {
            Ok(true) => {
                let view = UserNotificationView::new(notification.clone(), &delivery);
                let reached = self
                    .realtime
                    .send_to_user(user_id, RealtimeEvent::Notification(Box::new(view)));
                debug!(
                    notification_id = %notification.id,
                    user_id = %user_id,
                    connections = reached,
                    "In-app notification delivered"
                );
                Some(delivery)
            }
            Ok(false) => {
                debug!(notification_id = %notification.id, user_id = %user_id, "Delivery already exists");
                None
            }
            Err(e) => {
                warn!(
                    notification_id = %notification.id,
                    user_id = %user_id,
                    error = %e,
                    "Failed to store delivery"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::preferences::PreferenceUpdate;
    use crate::notification::test_support::Fixture;
    use bizhub_core::types::range::DateRange;
    use bizhub_entity::notification::{GeneralFacts, OrderFacts, StockFacts, Threshold};

    fn order(kind: NotificationType, amount: f64) -> NotificationMetadata {
        let facts = OrderFacts {
            order_id: Uuid::new_v4(),
            order_number: "SO-42".to_string(),
            customer_name: Some("Acme".to_string()),
            total_amount: amount,
            currency: "USD".to_string(),
            status: "pending".to_string(),
            previous_status: None,
        };
        match kind {
            NotificationType::OrderHighValue => NotificationMetadata::OrderHighValue(facts),
            _ => NotificationMetadata::OrderCreated(facts),
        }
    }

    fn announcement() -> NotificationMetadata {
        NotificationMetadata::SystemAnnouncement(GeneralFacts::default())
    }

    fn toggle(kind: NotificationType, in_app: bool, email: bool) -> PreferenceUpdate {
        PreferenceUpdate {
            kind,
            in_app_enabled: Some(in_app),
            email_enabled: Some(email),
            threshold: None,
            language: None,
        }
    }

    #[tokio::test]
    async fn test_rejects_invalid_spec_before_persisting() {
        let fx = Fixture::new();
        let past = Utc::now() - chrono::Duration::minutes(1);
        let spec = NotificationSpec::new(announcement(), "Hi", "There").expires_at(past);
        assert!(fx.services.orchestrator.create_notification(spec).await.is_err());

        let blank = NotificationSpec::new(announcement(), "  ", "There");
        assert!(fx.services.orchestrator.create_notification(blank).await.is_err());

        let range = DateRange::resolve(None, None).unwrap();
        let stats = fx.stores.notifications.statistics(&range).await.unwrap();
        assert_eq!(stats.total_notifications, 0);
    }

    #[tokio::test]
    async fn test_explicit_list_isolates_recipients() {
        let fx = Fixture::new();
        let a = fx.user("alice", UserRole::Staff);
        let b = fx.user("bob", UserRole::Staff);
        let outsider = fx.user("carol", UserRole::Admin);

        let spec = NotificationSpec::new(announcement(), "Hi", "There")
            .targeting(Targeting::users([a.id, b.id]));
        let outcome = fx.services.orchestrator.create_notification(spec).await.unwrap();

        assert_eq!(outcome.recipients_considered, 2);
        assert_eq!(outcome.deliveries.len(), 2);
        assert!(outcome.deliveries.iter().all(|d| d.user_id != outsider.id));
        assert_eq!(fx.unread(outsider.id).await, 0);
        assert_eq!(fx.realtime.events_for(a.id).len(), 1);
        assert!(fx.realtime.events_for(outsider.id).is_empty());
    }

    #[tokio::test]
    async fn test_disabled_channels_leave_only_the_notification_row() {
        let fx = Fixture::new();
        let a = fx.user("alice", UserRole::Staff);
        fx.services
            .preferences
            .update(a.id, vec![toggle(NotificationType::SystemAnnouncement, false, false)])
            .await
            .unwrap();

        let spec = NotificationSpec::new(announcement(), "Hi", "There")
            .targeting(Targeting::users([a.id]));
        let outcome = fx.services.orchestrator.create_notification(spec).await.unwrap();

        assert!(outcome.deliveries.is_empty());
        assert_eq!(outcome.recipients_considered, 1);
        assert!(
            fx.stores
                .notifications
                .find_notification(outcome.notification.id)
                .await
                .unwrap()
                .is_some()
        );
        assert!(fx.transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_disabling_one_channel_keeps_the_other() {
        let fx = Fixture::new();
        let a = fx.user("alice", UserRole::Staff);
        let b = fx.user("bob", UserRole::Staff);
        fx.services
            .preferences
            .update(a.id, vec![toggle(NotificationType::SystemAnnouncement, false, true)])
            .await
            .unwrap();
        fx.services
            .preferences
            .update(b.id, vec![toggle(NotificationType::SystemAnnouncement, true, false)])
            .await
            .unwrap();

        let spec = NotificationSpec::new(announcement(), "Hi", "There")
            .targeting(Targeting::users([a.id, b.id]));
        let outcome = fx.services.orchestrator.create_notification(spec).await.unwrap();

        assert_eq!(outcome.deliveries.len(), 1);
        assert_eq!(outcome.deliveries[0].user_id, b.id);
        let sent = fx.transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].user_id, a.id);
        assert!(fx.realtime.events_for(a.id).is_empty());
    }

    #[tokio::test]
    async fn test_high_value_threshold_per_recipient() {
        let fx = Fixture::new();
        let default_user = fx.user("alice", UserRole::Manager);
        let strict_user = fx.user("bob", UserRole::Manager);
        fx.services
            .preferences
            .update(
                strict_user.id,
                vec![PreferenceUpdate {
                    threshold: Some(Some(Threshold::Amount { amount: 2000.0 })),
                    ..toggle(NotificationType::OrderHighValue, true, false)
                }],
            )
            .await
            .unwrap();

        let spec = NotificationSpec::new(
            order(NotificationType::OrderHighValue, 1500.0),
            "High value",
            "Order SO-42",
        )
        .targeting(Targeting::type_default());
        let outcome = fx.services.orchestrator.create_notification(spec).await.unwrap();

        assert_eq!(outcome.recipients_considered, 2);
        assert_eq!(outcome.deliveries.len(), 1);
        assert_eq!(outcome.deliveries[0].user_id, default_user.id);
        assert_eq!(outcome.notification.related_type.as_deref(), Some("order"));
    }

    #[tokio::test]
    async fn test_stock_low_band() {
        let fx = Fixture::new();
        let staff = fx.user("alice", UserRole::Staff);
        let facts = StockFacts {
            product_id: Uuid::new_v4(),
            product_name: "Widget".to_string(),
            sku: None,
            quantity: 4,
            previous_quantity: Some(12),
        };
        let spec = NotificationSpec::new(NotificationMetadata::StockLow(facts), "Low", "Widget")
            .targeting(Targeting::type_default());
        let outcome = fx.services.orchestrator.create_notification(spec).await.unwrap();

        assert_eq!(outcome.deliveries.len(), 1);
        assert_eq!(fx.unread(staff.id).await, 1);
        assert_eq!(outcome.notification.target_roles.len(), 3);
        assert!(!outcome.notification.is_broadcast);
    }

    #[tokio::test]
    async fn test_localized_content_and_broadcast_flag() {
        let fx = Fixture::new();
        fx.user("alice", UserRole::Viewer);
        let spec = NotificationSpec::new(announcement(), "Hello", "World")
            .localized("ar", "مرحبا", "العالم")
            .priority(NotificationPriority::High);
        let outcome = fx.services.orchestrator.create_notification(spec).await.unwrap();

        assert!(outcome.notification.is_broadcast);
        assert_eq!(outcome.notification.title_for("ar"), "مرحبا");
        assert_eq!(outcome.deliveries.len(), 1);
    }
}
