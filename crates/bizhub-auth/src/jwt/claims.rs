//! Token payload naming the BizHub user a request or socket acts for.
//!
//! Notifications are addressed by user id and filtered by role, so those two
//! fields are what every consumer of the claims reads. The username only
//! travels along for logging and the admin test notification.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bizhub_entity::user::UserRole;

/// Payload carried by tokens the identity subsystem signs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Recipient id; inbox rows and realtime pushes are keyed on it.
    pub sub: Uuid,
    /// Role snapshot used for role-targeted fan-out and admin checks.
    pub role: UserRole,
    pub username: String,
    /// Only checked when `auth.jwt_issuer` is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
    pub token_type: TokenType,
}

/// Which half of the identity subsystem's token pair this is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Presented on REST calls and the `/ws` handshake.
    Access,
    /// Only the identity subsystem redeems these; the notification API refuses them.
    Refresh,
}

impl Claims {
    /// The user whose inbox this token opens.
    pub fn user_id(&self) -> Uuid {
        self.sub
    }

    /// Whether the notification API should accept this token at all.
    pub fn is_access(&self) -> bool {
        self.token_type == TokenType::Access
    }
}
