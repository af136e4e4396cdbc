//! In-memory preference store using DashMap.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use bizhub_core::result::AppResult;
use bizhub_entity::notification::{NotificationPreference, NotificationType};

use crate::store::PreferenceStore;

/// In-memory [`PreferenceStore`] keyed by `(user_id, type)`.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    rows: DashMap<(Uuid, NotificationType), NotificationPreference>,
}

impl MemoryPreferenceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn get(
        &self,
        user_id: Uuid,
        kind: NotificationType,
    ) -> AppResult<Option<NotificationPreference>> {
        Ok(self.rows.get(&(user_id, kind)).map(|p| p.clone()))
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<NotificationPreference>> {
        let mut prefs: Vec<NotificationPreference> = self
            .rows
            .iter()
            .filter(|p| p.user_id == user_id)
            .map(|p| p.value().clone())
            .collect();
        prefs.sort_by_key(|p| p.kind);
        Ok(prefs)
    }

    async fn find_for_users(
        &self,
        user_ids: &[Uuid],
        kinds: &[NotificationType],
    ) -> AppResult<Vec<NotificationPreference>> {
        Ok(self
            .rows
            .iter()
            .filter(|p| user_ids.contains(&p.user_id) && kinds.contains(&p.kind))
            .map(|p| p.value().clone())
            .collect())
    }

    async fn upsert_many(
        &self,
        preferences: &[NotificationPreference],
    ) -> AppResult<Vec<NotificationPreference>> {
        // Nothing below can fail, so the batch lands whole.
        let stored = preferences
            .iter()
            .map(|preference| match self.rows.entry((preference.user_id, preference.kind)) {
                Entry::Occupied(mut slot) => {
                    let row = NotificationPreference {
                        created_at: slot.get().created_at,
                        ..preference.clone()
                    };
                    slot.insert(row.clone());
                    row
                }
                Entry::Vacant(slot) => slot.insert(preference.clone()).clone(),
            })
            .collect();
        Ok(stored)
    }

    async fn insert_defaults(&self, preferences: &[NotificationPreference]) -> AppResult<u64> {
        let mut inserted = 0;
        for p in preferences {
            if let Entry::Vacant(slot) = self.rows.entry((p.user_id, p.kind)) {
                slot.insert(p.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}
