//! Token verification configuration.

use serde::{Deserialize, Serialize};

/// Authentication settings for connection-time token verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign and verify tokens.
    #[serde(default)]
    pub jwt_secret: String,
    /// Issued token lifetime in minutes.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_minutes: i64,
    /// Clock-skew leeway in seconds applied during validation.
    #[serde(default = "default_leeway")]
    pub leeway_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_minutes: default_token_ttl(),
            leeway_seconds: default_leeway(),
        }
    }
}

fn default_token_ttl() -> i64 {
    60
}

fn default_leeway() -> u64 {
    5
}
