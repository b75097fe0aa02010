//! Access-token creation with configurable signing and TTL.

use chrono::{DateTime, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};

use moneta_core::config::tokens::TokenConfig;
use moneta_core::error::AuthError;
use moneta_core::types::{SessionId, UserId};

use super::claims::Claims;

/// Creates signed, short-lived access tokens.
///
/// A pure function of its inputs and the signing key; it never touches
/// storage, which keeps it unit-testable without a database.
#[derive(Clone)]
pub struct JwtEncoder {
    /// HMAC secret key for signing.
    encoding_key: EncodingKey,
    /// Access token TTL in seconds.
    access_ttl_seconds: i64,
}

impl std::fmt::Debug for JwtEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtEncoder")
            .field("access_ttl_seconds", &self.access_ttl_seconds)
            .finish()
    }
}

impl JwtEncoder {
    /// Creates a new encoder from token configuration.
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_ttl_seconds: config.access_ttl_seconds as i64,
        }
    }

    /// Mints a new access token for the given subject, session, and token
    /// version. Returns the signed string and its expiry.
    pub fn mint_access_token(
        &self,
        subject: UserId,
        session_id: SessionId,
        token_version: i32,
    ) -> Result<(String, DateTime<Utc>), AuthError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::seconds(self.access_ttl_seconds);

        let claims = Claims {
            sub: subject,
            sid: session_id,
            ver: token_version,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::internal(format!("Failed to encode access token: {e}")))?;

        Ok((token, expires_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minted_token_has_three_segments() {
        let encoder = JwtEncoder::new(&TokenConfig::default());
        let (token, _) = encoder
            .mint_access_token(UserId::new(), SessionId::new(), 0)
            .expect("mint");
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_expiry_matches_configured_ttl() {
        let config = TokenConfig {
            access_ttl_seconds: 900,
            ..TokenConfig::default()
        };
        let encoder = JwtEncoder::new(&config);
        let before = Utc::now();
        let (_, expires_at) = encoder
            .mint_access_token(UserId::new(), SessionId::new(), 0)
            .expect("mint");
        let ttl = (expires_at - before).num_seconds();
        assert!((899..=901).contains(&ttl), "unexpected ttl {ttl}");
    }
}
