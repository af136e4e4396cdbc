//! Notification fan-out and delivery.
//!
//! A business event becomes one [`Notification`](bizhub_entity::notification::Notification)
//! and zero or more per-recipient deliveries. Each recipient is evaluated
//! independently against their own preferences and thresholds; in-app and
//! email channels never affect each other.

pub mod admin;
pub mod channel;
pub mod email;
pub mod orchestrator;
pub mod preferences;
pub mod read_state;
pub mod recipients;
pub mod stock;
pub mod threshold;
pub mod triggers;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

use bizhub_core::config::{AppConfig, NotificationsConfig};
use bizhub_core::result::AppResult;
use bizhub_database::Stores;

pub use admin::{BroadcastRequest, NotificationAdminService};
pub use channel::{RealtimeChannel, RealtimeEvent};
pub use email::{EmailChannel, EmailMessage, EmailTemplates, EmailTransport, LogTransport, WebhookTransport};
pub use orchestrator::{FanOutOutcome, NotificationOrchestrator, NotificationOrigin, NotificationSpec};
pub use preferences::{PreferenceService, PreferenceUpdate};
pub use read_state::{MarkAllReadResult, MarkReadResult, ReadStateManager};
pub use recipients::{RecipientResolver, Targeting};
pub use stock::{StockAggregate, select_stock_notification};
pub use threshold::{ResolvedThresholds, eligible};
pub use triggers::{CustomerEvent, NotificationTriggers, OrderEvent, ProductEvent, StockChangeEvent};

/// Every notification service, wired once at startup.
#[derive(Debug, Clone)]
pub struct NotificationServices {
    pub orchestrator: NotificationOrchestrator,
    pub preferences: PreferenceService,
    pub read_state: ReadStateManager,
    pub triggers: NotificationTriggers,
    pub admin: NotificationAdminService,
}

impl NotificationServices {
    /// Build the services from configuration.
    pub fn build(
        stores: &Stores,
        realtime: Arc<dyn RealtimeChannel>,
        config: &AppConfig,
    ) -> AppResult<Self> {
        let email = EmailChannel::from_config(
            config.email.clone(),
            &config.notifications.default_language,
            Arc::clone(&stores.notifications),
        )?;
        Ok(Self::with_email(stores, realtime, email, &config.notifications))
    }

    /// Build the services around an already configured email channel.
    pub fn with_email(
        stores: &Stores,
        realtime: Arc<dyn RealtimeChannel>,
        email: EmailChannel,
        config: &NotificationsConfig,
    ) -> Self {
        let preferences = PreferenceService::new(Arc::clone(&stores.preferences), config.clone());
        let orchestrator = NotificationOrchestrator::new(
            Arc::clone(&stores.notifications),
            RecipientResolver::new(Arc::clone(&stores.users)),
            preferences.clone(),
            Arc::clone(&realtime),
            email,
            config.fanout_concurrency,
        );

        Self {
            read_state: ReadStateManager::new(Arc::clone(&stores.notifications), realtime),
            triggers: NotificationTriggers::new(orchestrator.clone()),
            admin: NotificationAdminService::new(
                orchestrator.clone(),
                Arc::clone(&stores.notifications),
            ),
            preferences,
            orchestrator,
        }
    }
}
