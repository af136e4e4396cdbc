//! Top-level real-time engine that ties together all subsystems.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use bizhub_core::error::{AppError, ErrorKind};
use bizhub_service::ReadStateManager;

use crate::connection::authenticator::{AuthenticatedConnection, WsAuthenticator};
use crate::connection::handle::{ConnectionHandle, ConnectionId};
use crate::connection::heartbeat::{HeartbeatConfig, run_heartbeat};
use crate::connection::manager::{ConnectionManager, ReadRequest};
use crate::message::types::OutboundMessage;

/// Central real-time engine shared by the WebSocket handler.
#[derive(Debug, Clone)]
pub struct RealtimeEngine {
    /// Connection manager, also the process-wide realtime channel.
    pub connections: Arc<ConnectionManager>,
    authenticator: WsAuthenticator,
    read_state: ReadStateManager,
    heartbeat: HeartbeatConfig,
}

impl RealtimeEngine {
    /// Creates the engine around an existing connection manager.
    pub fn new(
        connections: Arc<ConnectionManager>,
        authenticator: WsAuthenticator,
        read_state: ReadStateManager,
    ) -> Self {
        let heartbeat = HeartbeatConfig::from(connections.config());
        info!(
            ping_interval = ?heartbeat.ping_interval,
            ping_timeout = ?heartbeat.ping_timeout,
            "Real-time engine initialized"
        );
        Self {
            connections,
            authenticator,
            read_state,
            heartbeat,
        }
    }

    /// Validate the token presented at the handshake.
    pub fn authenticate(&self, token: Option<&str>) -> Result<AuthenticatedConnection, AppError> {
        self.authenticator.authenticate(token)
    }

    /// Start the keepalive loop for a connection.
    pub fn spawn_heartbeat(&self, handle: Arc<ConnectionHandle>) -> JoinHandle<()> {
        tokio::spawn(run_heartbeat(handle, self.heartbeat))
    }

    /// Process one inbound text frame from a connection.
    ///
    /// Read-state requests are applied through the read-state manager, which
    /// pushes the resulting events to all of the user's connections. Failures
    /// are reported back on the originating connection only.
    pub async fn handle_text(&self, conn_id: &ConnectionId, raw: &str) {
        let Some(request) = self.connections.handle_inbound(conn_id, raw).await else {
            return;
        };

        let result = match request {
            ReadRequest::MarkRead {
                user_id,
                notification_id,
            } => self
                .read_state
                .mark_as_read(notification_id, user_id)
                .await
                .map(|_| ()),
            ReadRequest::MarkAllRead { user_id } => {
                self.read_state.mark_all_as_read(user_id).await.map(|_| ())
            }
        };

        if let Err(e) = result {
            warn!(conn_id = %conn_id, error = %e, "Read request over WebSocket failed");
            let code = match e.kind {
                ErrorKind::NotFound => "NOT_FOUND",
                _ => "REQUEST_FAILED",
            };
            self.connections
                .push_to_connection(conn_id, OutboundMessage::error(code, e.message));
        }
    }

    /// Initiates a graceful shutdown of the real-time engine.
    pub fn shutdown(&self) {
        info!(
            connections = self.connections.connection_count(),
            "Shutting down real-time engine"
        );
        self.connections.close_all();
    }
}
