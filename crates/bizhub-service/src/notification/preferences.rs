//! Per-(user, type) preference management.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use bizhub_core::config::NotificationsConfig;
use bizhub_core::error::AppError;
use bizhub_database::PreferenceStore;
use bizhub_entity::notification::{
    DEFAULT_THRESHOLDS, DefaultThreshold, NotificationPreference, NotificationType, Threshold,
};
use bizhub_entity::user::User;

use super::stock::StockAggregate;
use super::threshold::ResolvedThresholds;

/// A partial update of one preference row.
///
/// Omitted fields keep their current value. `"threshold": null` clears a
/// stored threshold so the type default applies again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceUpdate {
    #[serde(rename = "type")]
    pub kind: NotificationType,
    #[serde(default)]
    pub in_app_enabled: Option<bool>,
    #[serde(default)]
    pub email_enabled: Option<bool>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub threshold: Option<Option<Threshold>>,
    #[serde(default)]
    pub language: Option<String>,
}

fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Reads and writes notification preferences, materializing defaults lazily.
#[derive(Debug, Clone)]
pub struct PreferenceService {
    store: Arc<dyn PreferenceStore>,
    config: NotificationsConfig,
}

impl PreferenceService {
    /// Creates a new preference service.
    pub fn new(store: Arc<dyn PreferenceStore>, config: NotificationsConfig) -> Self {
        Self { store, config }
    }

    /// The default threshold table.
    pub fn default_thresholds(&self) -> &'static [DefaultThreshold] {
        &DEFAULT_THRESHOLDS
    }

    fn default_row(&self, user_id: Uuid, kind: NotificationType) -> NotificationPreference {
        NotificationPreference::defaults(user_id, kind, &self.config.default_language, Utc::now())
    }

    /// Fetch one preference, storing the defaults on first access.
    pub async fn get_or_create(
        &self,
        user_id: Uuid,
        kind: NotificationType,
    ) -> Result<NotificationPreference, AppError> {
        if let Some(pref) = self.store.get(user_id, kind).await? {
            return Ok(pref);
        }

        let defaults = self.default_row(user_id, kind);
        self.store
            .insert_defaults(std::slice::from_ref(&defaults))
            .await?;
        debug!(user_id = %user_id, notification_type = %kind, "Materialized default preference");

        // A concurrent writer may have won the insert.
        Ok(self.store.get(user_id, kind).await?.unwrap_or(defaults))
    }

    /// Every type's preference for one user, defaults materialized.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<NotificationPreference>, AppError> {
        let stored = self.store.list_for_user(user_id).await?;
        if stored.len() < NotificationType::ALL.len() {
            let missing: Vec<NotificationPreference> = NotificationType::ALL
                .into_iter()
                .filter(|kind| !stored.iter().any(|p| p.kind == *kind))
                .map(|kind| self.default_row(user_id, kind))
                .collect();
            self.store.insert_defaults(&missing).await?;
            let mut prefs = self.store.list_for_user(user_id).await?;
            prefs.sort_by_key(|p| p.kind);
            return Ok(prefs);
        }
        Ok(stored)
    }

    /// Store default preferences for every type (account creation).
    ///
    /// Existing rows are left untouched. Returns the number created.
    pub async fn initialize_defaults(&self, user_id: Uuid) -> Result<u64, AppError> {
        let rows: Vec<NotificationPreference> = NotificationType::ALL
            .into_iter()
            .map(|kind| self.default_row(user_id, kind))
            .collect();
        let created = self.store.insert_defaults(&rows).await?;
        info!(user_id = %user_id, created, "Initialized notification preferences");
        Ok(created)
    }

    /// Apply a batch of updates for one user.
    ///
    /// The whole batch is validated, then written in a single store call:
    /// either every row changes or none does.
    pub async fn update(
        &self,
        user_id: Uuid,
        updates: Vec<PreferenceUpdate>,
    ) -> Result<Vec<NotificationPreference>, AppError> {
        self.validate_updates(&updates)?;

        let now = Utc::now();
        let mut rows = Vec::with_capacity(updates.len());
        for update in updates {
            let mut pref = match self.store.get(user_id, update.kind).await? {
                Some(pref) => pref,
                None => self.default_row(user_id, update.kind),
            };
            if let Some(in_app) = update.in_app_enabled {
                pref.in_app_enabled = in_app;
            }
            if let Some(email) = update.email_enabled {
                pref.email_enabled = email;
            }
            if let Some(threshold) = update.threshold {
                pref.threshold = threshold;
            }
            if let Some(language) = update.language {
                pref.language = language;
            }
            pref.updated_at = now;
            rows.push(pref);
        }

        let saved = self.store.upsert_many(&rows).await?;
        info!(user_id = %user_id, updated = saved.len(), "Updated notification preferences");
        Ok(saved)
    }

    fn validate_updates(&self, updates: &[PreferenceUpdate]) -> Result<(), AppError> {
        let mut seen = HashMap::new();
        for update in updates {
            if seen.insert(update.kind, ()).is_some() {
                return Err(AppError::validation(format!(
                    "Duplicate preference entry for type '{}'",
                    update.kind
                )));
            }
            if let Some(Some(threshold)) = &update.threshold {
                threshold.validate_for(update.kind)?;
            }
            if let Some(language) = &update.language
                && !self.config.supported_languages.contains(language)
            {
                return Err(AppError::validation(format!(
                    "Unsupported language '{language}'. Supported: {}",
                    self.config.supported_languages.join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Thresholds that apply to one recipient for a `kind` decision.
    ///
    /// `pref` is the recipient's preference for `kind`; `stock_medium`
    /// additionally needs the same recipient's `stock_low` bound.
    pub async fn resolve_thresholds(
        &self,
        pref: &NotificationPreference,
    ) -> Result<ResolvedThresholds, AppError> {
        if pref.kind != NotificationType::StockMedium {
            return Ok(ResolvedThresholds::from_preferences([pref]));
        }
        let low = self.store.get(pref.user_id, NotificationType::StockLow).await?;
        Ok(ResolvedThresholds::from_preferences(
            std::iter::once(pref).chain(low.as_ref()),
        ))
    }

    async fn thresholds_by_user(
        &self,
        users: &[User],
        kinds: &[NotificationType],
    ) -> Result<Vec<ResolvedThresholds>, AppError> {
        let ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();
        let prefs = self.store.find_for_users(&ids, kinds).await?;

        let mut by_user: HashMap<Uuid, Vec<NotificationPreference>> = HashMap::new();
        for pref in prefs {
            by_user.entry(pref.user_id).or_default().push(pref);
        }
        Ok(ids
            .iter()
            .map(|id| {
                by_user
                    .get(id)
                    .map(|prefs| ResolvedThresholds::from_preferences(prefs))
                    .unwrap_or_default()
            })
            .collect())
    }

    /// Widest stock bands across `recipients` (defaults when there are none).
    pub async fn stock_aggregate(&self, recipients: &[User]) -> Result<StockAggregate, AppError> {
        let thresholds = self
            .thresholds_by_user(
                recipients,
                &[NotificationType::StockLow, NotificationType::StockMedium],
            )
            .await?;
        Ok(StockAggregate::from_thresholds(thresholds))
    }

    /// Most permissive (lowest) high-value amount across `recipients`.
    pub async fn min_amount_threshold(&self, recipients: &[User]) -> Result<f64, AppError> {
        let thresholds = self
            .thresholds_by_user(recipients, &[NotificationType::OrderHighValue])
            .await?;
        Ok(thresholds
            .into_iter()
            .map(|t| t.amount)
            .reduce(f64::min)
            .unwrap_or_else(|| ResolvedThresholds::default().amount))
    }
}
