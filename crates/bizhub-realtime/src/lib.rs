//! # bizhub-realtime
//!
//! Real-time WebSocket engine for BizHub notifications. Provides:
//!
//! - WebSocket connection management with JWT authentication
//! - Per-user and per-role connection groups
//! - Ping/pong keepalive with idle eviction
//! - Client-initiated read-state changes over the socket
//!
//! [`ConnectionManager`] implements the service layer's
//! [`bizhub_service::RealtimeChannel`], so fan-out reaches open sockets
//! without the service crate knowing about WebSockets.

pub mod connection;
pub mod group;
pub mod message;
pub mod metrics;
pub mod server;

pub use connection::manager::ConnectionManager;
pub use connection::{AuthenticatedConnection, ConnectionHandle, ReadRequest, WsAuthenticator};
pub use message::types::{InboundMessage, OutboundMessage};
pub use server::RealtimeEngine;
