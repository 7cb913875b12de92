//! JWT token creation with configurable signing and TTL.

use chrono::{DateTime, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use chatsync_core::config::auth::AuthConfig;
use chatsync_core::error::SyncError;
use chatsync_core::types::id::UserId;

use super::claims::Claims;

/// Creates signed connection tokens.
#[derive(Clone)]
pub struct JwtIssuer {
    /// HMAC secret key for signing.
    encoding_key: EncodingKey,
    /// Token TTL in minutes.
    ttl_minutes: i64,
}

impl std::fmt::Debug for JwtIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtIssuer")
            .field("ttl_minutes", &self.ttl_minutes)
            .finish()
    }
}

impl JwtIssuer {
    /// Creates a new issuer from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            ttl_minutes: config.token_ttl_minutes,
        }
    }

    /// Generates a signed connection token for the given user.
    pub fn issue(&self, user_id: UserId) -> Result<(String, DateTime<Utc>), SyncError> {
        let now = Utc::now();
        let exp = now + chrono::Duration::minutes(self.ttl_minutes);

        let claims = Claims {
            sub: user_id.into_uuid(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| SyncError::internal(format!("Failed to encode token: {e}")))?;

        Ok((token, exp))
    }
}
