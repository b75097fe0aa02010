//! Token issuance configuration.

use serde::{Deserialize, Serialize};

/// Lifetimes and signing material for every token kind the core issues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Secret key for access-token signing (HMAC-SHA256).
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Access token TTL in seconds.
    #[serde(default = "default_access_ttl")]
    pub access_ttl_seconds: u64,
    /// Refresh token TTL in days for a normal login.
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_days: u64,
    /// Refresh token TTL in days when the client asked to be remembered.
    #[serde(default = "default_remember_me_ttl")]
    pub remember_me_ttl_days: u64,
    /// Email-verification token TTL in hours.
    #[serde(default = "default_verification_ttl")]
    pub verification_ttl_hours: u64,
    /// Password-reset token TTL in minutes.
    #[serde(default = "default_reset_ttl")]
    pub reset_ttl_minutes: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            access_ttl_seconds: default_access_ttl(),
            refresh_ttl_days: default_refresh_ttl(),
            remember_me_ttl_days: default_remember_me_ttl(),
            verification_ttl_hours: default_verification_ttl(),
            reset_ttl_minutes: default_reset_ttl(),
        }
    }
}

fn default_jwt_secret() -> String {
    "CHANGE_ME_IN_PRODUCTION".to_string()
}

fn default_access_ttl() -> u64 {
    900
}

fn default_refresh_ttl() -> u64 {
    7
}

fn default_remember_me_ttl() -> u64 {
    30
}

fn default_verification_ttl() -> u64 {
    24
}

fn default_reset_ttl() -> u64 {
    60
}
