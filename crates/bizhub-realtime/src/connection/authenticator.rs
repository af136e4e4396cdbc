//! Handshake check for `/ws`: the socket is only upgraded once the
//! `?token=` query parameter resolves to a notification recipient.

use std::sync::Arc;

use uuid::Uuid;

use bizhub_auth::jwt::{Claims, JwtDecoder};
use bizhub_core::error::AppError;
use bizhub_entity::user::UserRole;

/// The recipient a realtime socket delivers to.
///
/// `role` decides which role groups the socket joins on register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedConnection {
    pub user_id: Uuid,
    pub role: UserRole,
    pub username: String,
}

impl From<Claims> for AuthenticatedConnection {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id(),
            role: claims.role,
            username: claims.username,
        }
    }
}

/// Resolves handshake tokens with the same decoder the REST extractor uses.
#[derive(Debug, Clone)]
pub struct WsAuthenticator {
    decoder: Arc<JwtDecoder>,
}

impl WsAuthenticator {
    pub fn new(decoder: Arc<JwtDecoder>) -> Self {
        Self { decoder }
    }

    /// Browsers cannot set headers on a WebSocket upgrade, so the access
    /// token rides in the query string instead of `Authorization`.
    pub fn authenticate(&self, token: Option<&str>) -> Result<AuthenticatedConnection, AppError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::authentication("Missing access token"))?;

        self.decoder
            .decode_access_token(token)
            .map(AuthenticatedConnection::from)
    }
}
