//! Connection manager: lifecycle, group membership and message routing.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use bizhub_core::config::RealtimeConfig;
use bizhub_entity::user::UserRole;
use bizhub_service::{RealtimeChannel, RealtimeEvent};

use crate::group::{GroupRegistry, role_group, user_group};
use crate::message::serializer::deserialize_inbound;
use crate::message::types::{InboundMessage, OutboundMessage};
use crate::message::validator::validate_inbound;
use crate::metrics::{MetricsSnapshot, RealtimeMetrics};

use super::authenticator::AuthenticatedConnection;
use super::handle::{ConnectionHandle, ConnectionId, SendOutcome};
use super::pool::ConnectionPool;

/// A read-state change requested by a client over its socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadRequest {
    MarkRead { user_id: Uuid, notification_id: Uuid },
    MarkAllRead { user_id: Uuid },
}

/// Manages all active WebSocket connections.
///
/// Constructed once at startup and shared; it is the process-wide
/// implementation of [`RealtimeChannel`].
#[derive(Debug)]
pub struct ConnectionManager {
    /// Connection pool.
    pool: ConnectionPool,
    /// `user:{id}` and `role:{role}` groups.
    groups: GroupRegistry,
    /// Metrics.
    metrics: Arc<RealtimeMetrics>,
    /// Configuration.
    config: RealtimeConfig,
}

impl ConnectionManager {
    /// Creates a new connection manager.
    pub fn new(config: RealtimeConfig) -> Self {
        Self {
            pool: ConnectionPool::new(),
            groups: GroupRegistry::new(),
            metrics: Arc::new(RealtimeMetrics::new()),
            config,
        }
    }

    /// Registers a new authenticated connection.
    ///
    /// Joins the user and role groups and queues the `connected`
    /// acknowledgement. Returns the handle and the receiver the writer task
    /// drains.
    pub fn register(
        &self,
        auth: &AuthenticatedConnection,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<OutboundMessage>) {
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size.max(1));
        let handle = Arc::new(ConnectionHandle::new(
            auth.user_id,
            auth.role,
            auth.username.clone(),
            tx,
        ));

        let evicted = self
            .pool
            .add(handle.clone(), self.config.max_connections_per_user);
        for old in evicted {
            warn!(
                conn_id = %old.id,
                user_id = %auth.user_id,
                max = self.config.max_connections_per_user,
                "User at max connections, evicting oldest"
            );
            self.groups.leave_all(old.id);
            old.close();
            self.metrics.connection_evicted();
            self.metrics.connection_closed();
        }

        self.groups.join(user_group(auth.user_id), handle.id);
        self.groups.join(role_group(auth.role), handle.id);
        self.metrics.connection_opened();

        handle.send(OutboundMessage::Connected {
            connection_id: handle.id,
            user_id: auth.user_id,
            role: auth.role,
            server_time: Utc::now(),
        });

        info!(
            conn_id = %handle.id,
            user_id = %auth.user_id,
            role = %auth.role,
            "WebSocket connection registered"
        );

        (handle, rx)
    }

    /// Unregisters a connection and removes it from every group.
    pub fn unregister(&self, conn_id: &ConnectionId) {
        if let Some(handle) = self.pool.remove(conn_id) {
            handle.close();
            self.groups.leave_all(*conn_id);
            self.metrics.connection_closed();

            info!(
                conn_id = %conn_id,
                user_id = %handle.user_id,
                username = %handle.username,
                connected_secs = (Utc::now() - handle.connected_at).num_seconds(),
                "WebSocket connection unregistered"
            );
        }
    }

    /// Processes an inbound text frame.
    ///
    /// Heartbeat replies are handled here; read-state requests are returned
    /// for the caller to apply. Malformed input is answered with an `error`
    /// message on the same connection.
    pub async fn handle_inbound(&self, conn_id: &ConnectionId, raw: &str) -> Option<ReadRequest> {
        let Some(handle) = self.pool.get(conn_id) else {
            warn!(conn_id = %conn_id, "Message from unknown connection");
            return None;
        };
        self.metrics.message_received();

        let parsed = validate_inbound(raw, self.config.max_message_size)
            .and_then(|()| deserialize_inbound(raw));
        let message = match parsed {
            Ok(message) => message,
            Err(e) => {
                debug!(conn_id = %conn_id, error = %e, "Rejected inbound message");
                self.deliver(&handle, OutboundMessage::error("INVALID_MESSAGE", e.message));
                return None;
            }
        };

        match message {
            InboundMessage::Pong { .. } => {
                handle.record_pong().await;
                None
            }
            InboundMessage::MarkRead { notification_id } => Some(ReadRequest::MarkRead {
                user_id: handle.user_id,
                notification_id,
            }),
            InboundMessage::MarkAllRead => Some(ReadRequest::MarkAllRead {
                user_id: handle.user_id,
            }),
        }
    }

    fn deliver(&self, handle: &ConnectionHandle, message: OutboundMessage) -> bool {
        match handle.send(message) {
            SendOutcome::Queued => {
                self.metrics.messages_sent(1);
                true
            }
            SendOutcome::Dropped => {
                self.metrics.message_dropped();
                false
            }
            SendOutcome::Closed => false,
        }
    }

    /// Sends a message to one connection.
    pub fn push_to_connection(&self, conn_id: &ConnectionId, message: OutboundMessage) -> bool {
        match self.pool.get(conn_id) {
            Some(handle) => self.deliver(&handle, message),
            None => false,
        }
    }

    /// Sends a message to every live member of a group.
    ///
    /// Returns the number of connections that accepted it.
    pub fn push_to_group(&self, group: &str, message: OutboundMessage) -> usize {
        let mut reached = 0;
        for conn_id in self.groups.members(group) {
            if let Some(handle) = self.pool.get(&conn_id)
                && self.deliver(&handle, message.clone())
            {
                reached += 1;
            }
        }
        debug!(group, message = message.kind(), reached, "Pushed to group");
        reached
    }

    /// Sends a message to all of a user's connections.
    pub fn push_to_user(&self, user_id: Uuid, message: OutboundMessage) -> usize {
        self.push_to_group(&user_group(user_id), message)
    }

    /// Sends a message to all connections of users holding `role`.
    pub fn push_to_role(&self, role: UserRole, message: OutboundMessage) -> usize {
        self.push_to_group(&role_group(role), message)
    }

    /// Closes all connections.
    pub fn close_all(&self) {
        let all = self.pool.all_connections();
        for conn in &all {
            self.unregister(&conn.id);
        }
        info!(count = all.len(), "All connections closed");
    }

    /// Returns the total connection count.
    pub fn connection_count(&self) -> usize {
        self.pool.connection_count()
    }

    /// Returns the number of unique connected users.
    pub fn user_count(&self) -> usize {
        self.pool.user_count()
    }

    /// Current metric counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Realtime configuration in effect.
    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }
}

impl RealtimeChannel for ConnectionManager {
    fn send_to_user(&self, user_id: Uuid, event: RealtimeEvent) -> usize {
        self.push_to_user(user_id, event.into())
    }

    fn send_to_role(&self, role: UserRole, event: RealtimeEvent) -> usize {
        self.push_to_role(role, event.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth(role: UserRole) -> AuthenticatedConnection {
        AuthenticatedConnection {
            user_id: Uuid::new_v4(),
            role,
            username: "sam".to_string(),
        }
    }

    fn drain(rx: &mut mpsc::Receiver<OutboundMessage>) -> Vec<OutboundMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn test_register_sends_connected_ack() {
        let manager = ConnectionManager::new(RealtimeConfig::default());
        let who = auth(UserRole::Manager);
        let (handle, mut rx) = manager.register(&who);

        match drain(&mut rx).as_slice() {
            [OutboundMessage::Connected {
                connection_id,
                user_id,
                role,
                ..
            }] => {
                assert_eq!(*connection_id, handle.id);
                assert_eq!(*user_id, who.user_id);
                assert_eq!(*role, UserRole::Manager);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_user_and_role_routing() {
        let manager = ConnectionManager::new(RealtimeConfig::default());
        let alice = auth(UserRole::Staff);
        let (_a1, mut rx1) = manager.register(&alice);
        let (_a2, mut rx2) = manager.register(&alice);
        let bob = auth(UserRole::Admin);
        let (_b, mut rx3) = manager.register(&bob);
        drain(&mut rx1);
        drain(&mut rx2);
        drain(&mut rx3);

        let event = RealtimeEvent::NotificationsAllRead {
            updated: 1,
            unread_count: 0,
        };
        assert_eq!(manager.send_to_user(alice.user_id, event.clone()), 2);
        assert_eq!(drain(&mut rx1).len(), 1);
        assert_eq!(drain(&mut rx2).len(), 1);
        assert!(drain(&mut rx3).is_empty());

        assert_eq!(manager.send_to_role(UserRole::Admin, event.clone()), 1);
        assert_eq!(manager.send_to_user(Uuid::new_v4(), event), 0);
    }

    #[test]
    fn test_unregister_leaves_groups() {
        let manager = ConnectionManager::new(RealtimeConfig::default());
        let alice = auth(UserRole::Staff);
        let (handle, _rx) = manager.register(&alice);
        manager.unregister(&handle.id);

        assert_eq!(manager.user_count(), 0);
        let event = RealtimeEvent::NotificationsAllRead {
            updated: 0,
            unread_count: 0,
        };
        assert_eq!(manager.send_to_user(alice.user_id, event), 0);
        assert_eq!(manager.push_to_role(UserRole::Staff, OutboundMessage::Ping { timestamp: 0 }), 0);
        let m = manager.metrics();
        assert_eq!(m.connections_opened, 1);
        assert_eq!(m.connections_active, 0);
    }

    #[test]
    fn test_cap_evicts_oldest_connection() {
        let config = RealtimeConfig {
            max_connections_per_user: 1,
            ..RealtimeConfig::default()
        };
        let manager = ConnectionManager::new(config);
        let alice = auth(UserRole::Staff);
        let (old, _rx_old) = manager.register(&alice);
        let (new, mut rx_new) = manager.register(&alice);
        drain(&mut rx_new);

        assert!(!old.is_alive());
        assert!(new.is_alive());
        assert_eq!(manager.connection_count(), 1);
        assert_eq!(manager.push_to_user(alice.user_id, OutboundMessage::Ping { timestamp: 0 }), 1);
        assert_eq!(manager.metrics().connections_evicted, 1);

        // The evicted socket's own cleanup must not disturb the survivor.
        manager.unregister(&old.id);
        assert_eq!(manager.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_inbound_routing() {
        let manager = ConnectionManager::new(RealtimeConfig::default());
        let alice = auth(UserRole::Staff);
        let (handle, mut rx) = manager.register(&alice);
        drain(&mut rx);

        let id = Uuid::new_v4();
        let raw = format!(r#"{{"type":"mark_read","notification_id":"{id}"}}"#);
        assert_eq!(
            manager.handle_inbound(&handle.id, &raw).await,
            Some(ReadRequest::MarkRead {
                user_id: alice.user_id,
                notification_id: id
            })
        );
        assert_eq!(
            manager.handle_inbound(&handle.id, r#"{"type":"mark_all_read"}"#).await,
            Some(ReadRequest::MarkAllRead { user_id: alice.user_id })
        );
        assert_eq!(manager.handle_inbound(&handle.id, r#"{"type":"pong"}"#).await, None);

        assert_eq!(manager.handle_inbound(&handle.id, "not json").await, None);
        match drain(&mut rx).as_slice() {
            [OutboundMessage::Error { code, .. }] => assert_eq!(code, "INVALID_MESSAGE"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
