//! In-memory user directory.

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use bizhub_core::result::AppResult;
use bizhub_entity::user::{User, UserRole};

use crate::store::UserDirectory;

/// In-memory [`UserDirectory`], seeded by the embedding application.
#[derive(Debug, Default)]
pub struct MemoryUserDirectory {
    users: DashMap<Uuid, User>,
}

impl MemoryUserDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user.
    pub fn upsert(&self, user: User) {
        self.users.insert(user.id, user);
    }

    /// Flip a user's active flag. Returns `false` if the user is unknown.
    pub fn set_active(&self, id: Uuid, active: bool) -> bool {
        match self.users.get_mut(&id) {
            Some(mut u) => {
                u.is_active = active;
                true
            }
            None => false,
        }
    }

    fn collect_sorted(&self, predicate: impl Fn(&User) -> bool) -> Vec<User> {
        let mut users: Vec<User> = self
            .users
            .iter()
            .filter(|u| u.is_active && predicate(u))
            .map(|u| u.value().clone())
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        users
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_active_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<User>> {
        Ok(self.collect_sorted(|u| ids.contains(&u.id)))
    }

    async fn find_active_by_roles(&self, roles: &[UserRole]) -> AppResult<Vec<User>> {
        Ok(self.collect_sorted(|u| roles.contains(&u.role)))
    }

    async fn find_all_active(&self) -> AppResult<Vec<User>> {
        Ok(self.collect_sorted(|_| true))
    }
}
