//! Access-token verification.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use moneta_core::config::tokens::TokenConfig;
use moneta_core::error::AuthError;

use super::claims::Claims;

/// Verifies access-token signatures and expiry.
///
/// Every failure (malformed input, bad signature, expired token, wrong
/// claim shape) collapses into [`AuthError::InvalidToken`] so callers never
/// learn why verification failed. The token-version cross-check against the
/// account is deliberately *not* done here; that is the responsibility of
/// whatever consumes the codec.
#[derive(Clone)]
pub struct JwtDecoder {
    /// HMAC secret key for verification.
    decoding_key: DecodingKey,
    /// Validation configuration.
    validation: Validation,
}

impl std::fmt::Debug for JwtDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtDecoder")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtDecoder {
    /// Creates a new decoder from token configuration.
    pub fn new(config: &TokenConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 5; // 5 seconds leeway for clock skew

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Decodes and validates an access token string.
    pub fn verify_access_token(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::encoder::JwtEncoder;
    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use moneta_core::types::{SessionId, UserId};

    fn config() -> TokenConfig {
        TokenConfig {
            jwt_secret: "test-secret".to_string(),
            ..TokenConfig::default()
        }
    }

    #[test]
    fn test_roundtrip() {
        let cfg = config();
        let encoder = JwtEncoder::new(&cfg);
        let decoder = JwtDecoder::new(&cfg);

        let subject = UserId::new();
        let session = SessionId::new();
        let (token, _) = encoder.mint_access_token(subject, session, 3).expect("mint");

        let claims = decoder.verify_access_token(&token).expect("verify");
        assert_eq!(claims.sub, subject);
        assert_eq!(claims.sid, session);
        assert_eq!(claims.ver, 3);
    }

    #[test]
    fn test_expired_token_is_invalid() {
        let cfg = config();
        let decoder = JwtDecoder::new(&cfg);

        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: UserId::new(),
            sid: SessionId::new(),
            ver: 0,
            iat: now - 3600,
            exp: now - 1800,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(cfg.jwt_secret.as_bytes()),
        )
        .expect("encode");

        assert!(matches!(
            decoder.verify_access_token(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_wrong_key_is_invalid() {
        let encoder = JwtEncoder::new(&config());
        let decoder = JwtDecoder::new(&TokenConfig {
            jwt_secret: "other-secret".to_string(),
            ..TokenConfig::default()
        });

        let (token, _) = encoder
            .mint_access_token(UserId::new(), SessionId::new(), 0)
            .expect("mint");

        assert!(matches!(
            decoder.verify_access_token(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_garbage_is_invalid() {
        let decoder = JwtDecoder::new(&config());
        assert!(matches!(
            decoder.verify_access_token("not-a-jwt"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_tampered_payload_is_invalid() {
        let cfg = config();
        let encoder = JwtEncoder::new(&cfg);
        let decoder = JwtDecoder::new(&cfg);

        let (token, _) = encoder
            .mint_access_token(UserId::new(), SessionId::new(), 0)
            .expect("mint");

        let mut parts: Vec<&str> = token.split('.').collect();
        let swapped = parts[0];
        parts[1] = swapped;
        let tampered = parts.join(".");

        assert!(matches!(
            decoder.verify_access_token(&tampered),
            Err(AuthError::InvalidToken)
        ));
    }
}
