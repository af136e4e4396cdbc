//! Response DTOs.

use serde::{Deserialize, Serialize};

use bizhub_entity::notification::Notification;
use bizhub_service::FanOutOutcome;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Count response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountResponse {
    /// Count value.
    pub count: u64,
}

/// Simple message response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Message.
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status.
    pub status: String,
    /// Version.
    pub version: String,
    /// Open WebSocket connections.
    pub ws_connections: usize,
    /// Users with at least one open connection.
    pub online_users: usize,
}

/// Summary of a fan-out triggered through the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct FanOutResponse {
    pub notification: Notification,
    /// Recipients that received an in-app row.
    pub delivered: usize,
    /// Recipients resolved before preference filtering.
    pub recipients_considered: usize,
}

impl From<FanOutOutcome> for FanOutResponse {
    fn from(outcome: FanOutOutcome) -> Self {
        Self {
            delivered: outcome.deliveries.len(),
            recipients_considered: outcome.recipients_considered,
            notification: outcome.notification,
        }
    }
}
