//! JWT token minting.
//!
//! Production tokens come from the identity subsystem. The encoder exists so
//! operators and integration tests can mint tokens signed with the shared
//! secret.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use bizhub_core::config::AuthConfig;
use bizhub_core::error::AppError;
use bizhub_entity::user::UserRole;

use super::claims::{Claims, TokenType};

/// Refresh tokens minted here are only ever used to test rejection.
const REFRESH_TTL_HOURS: i64 = 24;

/// Creates signed JWT tokens.
#[derive(Clone)]
pub struct JwtEncoder {
    encoding_key: EncodingKey,
    access_ttl_minutes: i64,
    issuer: Option<String>,
}

impl std::fmt::Debug for JwtEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtEncoder")
            .field("access_ttl_minutes", &self.access_ttl_minutes)
            .field("issuer", &self.issuer)
            .finish()
    }
}

impl JwtEncoder {
    /// Creates a new encoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_ttl_minutes: config.jwt_access_ttl_minutes as i64,
            issuer: config.jwt_issuer.clone(),
        }
    }

    /// Generates an access token for the given user.
    pub fn generate_access_token(
        &self,
        user_id: Uuid,
        role: UserRole,
        username: &str,
    ) -> Result<(String, DateTime<Utc>), AppError> {
        let exp = Utc::now() + Duration::minutes(self.access_ttl_minutes);
        let token = self.sign(user_id, role, username, exp, TokenType::Access)?;
        Ok((token, exp))
    }

    /// Generates a refresh token for the given user.
    pub fn generate_refresh_token(
        &self,
        user_id: Uuid,
        role: UserRole,
        username: &str,
    ) -> Result<String, AppError> {
        let exp = Utc::now() + Duration::hours(REFRESH_TTL_HOURS);
        self.sign(user_id, role, username, exp, TokenType::Refresh)
    }

    fn sign(
        &self,
        user_id: Uuid,
        role: UserRole,
        username: &str,
        exp: DateTime<Utc>,
        token_type: TokenType,
    ) -> Result<String, AppError> {
        let claims = Claims {
            sub: user_id,
            role,
            username: username.to_string(),
            iss: self.issuer.clone(),
            iat: Utc::now().timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4(),
            token_type,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to encode token: {e}")))
    }
}
