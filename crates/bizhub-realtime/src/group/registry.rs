//! Group registry: a concurrent keyed multi-map of connection ids.

use std::collections::HashSet;

use dashmap::DashMap;

use crate::connection::handle::ConnectionId;

/// Tracks which connections belong to which groups.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    /// Group name → member connection ids.
    members: DashMap<String, HashSet<ConnectionId>>,
    /// Connection id → group names (reverse index).
    memberships: DashMap<ConnectionId, HashSet<String>>,
}

impl GroupRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to a group.
    pub fn join(&self, group: String, conn_id: ConnectionId) {
        self.members
            .entry(group.clone())
            .or_default()
            .insert(conn_id);
        self.memberships.entry(conn_id).or_default().insert(group);
    }

    /// Removes a connection from every group it joined.
    pub fn leave_all(&self, conn_id: ConnectionId) -> HashSet<String> {
        let groups = self
            .memberships
            .remove(&conn_id)
            .map(|(_, groups)| groups)
            .unwrap_or_default();

        for group in &groups {
            if let Some(mut members) = self.members.get_mut(group) {
                members.remove(&conn_id);
                if members.is_empty() {
                    drop(members);
                    self.members.remove_if(group, |_, m| m.is_empty());
                }
            }
        }
        groups
    }

    /// Current members of a group.
    pub fn members(&self, group: &str) -> Vec<ConnectionId> {
        self.members
            .get(group)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default()
    }
}
