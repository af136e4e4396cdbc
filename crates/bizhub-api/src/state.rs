//! Application state shared across all handlers.

use std::sync::Arc;

use bizhub_auth::JwtDecoder;
use bizhub_core::config::AppConfig;
use bizhub_database::Stores;
use bizhub_realtime::RealtimeEngine;
use bizhub_service::NotificationServices;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Notification, preference and user stores
    pub stores: Stores,
    /// JWT access token validator
    pub jwt_decoder: Arc<JwtDecoder>,
    /// WebSocket realtime engine
    pub realtime: RealtimeEngine,
    /// Notification services
    pub notifications: Arc<NotificationServices>,
}
