//! Issuance and consumption of single-use verification tokens.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use moneta_core::config::tokens::TokenConfig;
use moneta_core::error::AuthError;
use moneta_core::result::AuthResult;
use moneta_core::types::{UserId, VerificationTokenId};
use moneta_entity::verification::{TokenPurpose, VerificationToken};

use crate::store::VerificationTokenStore;
use crate::token::generate_opaque_token;

/// A freshly issued verification token, ready to be mailed to the owner.
#[derive(Debug, Clone)]
pub struct IssuedVerification {
    /// The opaque secret to embed in the link.
    pub secret: String,
    /// When the token expires.
    pub expires_at: DateTime<Utc>,
}

/// Issues and consumes single-use email-verification and password-reset
/// tokens. A separate namespace from refresh tokens; nothing here touches
/// the rotation machinery.
#[derive(Clone)]
pub struct VerificationTokenIssuer {
    /// Token persistence.
    store: Arc<dyn VerificationTokenStore>,
    /// TTL configuration.
    config: TokenConfig,
}

impl std::fmt::Debug for VerificationTokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationTokenIssuer").finish()
    }
}

impl VerificationTokenIssuer {
    /// Creates a new issuer.
    pub fn new(store: Arc<dyn VerificationTokenStore>, config: TokenConfig) -> Self {
        Self { store, config }
    }

    /// Issue a fresh token for the owner and purpose.
    ///
    /// Every prior unused token of the same purpose is invalidated first, so
    /// a stale link stops working the moment a newer one is issued.
    pub async fn issue(
        &self,
        owner_id: UserId,
        purpose: TokenPurpose,
    ) -> AuthResult<IssuedVerification> {
        let superseded = self
            .store
            .invalidate_unused_for_owner(owner_id, purpose)
            .await?;
        if superseded > 0 {
            debug!(
                owner_id = %owner_id,
                purpose = %purpose,
                superseded,
                "Invalidated prior unused tokens"
            );
        }

        let now = Utc::now();
        let ttl = match purpose {
            TokenPurpose::EmailVerification => {
                Duration::hours(self.config.verification_ttl_hours as i64)
            }
            TokenPurpose::PasswordReset => Duration::minutes(self.config.reset_ttl_minutes as i64),
        };

        let token = VerificationToken {
            id: VerificationTokenId::new(),
            owner_id,
            secret: generate_opaque_token(),
            purpose,
            expires_at: now + ttl,
            used_at: None,
            created_at: now,
        };
        self.store.save(&token).await?;

        info!(owner_id = %owner_id, purpose = %purpose, "Issued verification token");

        Ok(IssuedVerification {
            secret: token.secret,
            expires_at: token.expires_at,
        })
    }

    /// Consume a token, returning its owner.
    ///
    /// Classification order: unknown secret → `InvalidToken`; already used →
    /// `AlreadyUsed`; past expiry → `TokenExpired`; purpose mismatch →
    /// `InvalidToken`. Marking used and returning the owner is atomic: a
    /// second concurrent consumer loses the claim and sees `AlreadyUsed`.
    pub async fn consume(&self, secret: &str, expected: TokenPurpose) -> AuthResult<UserId> {
        let Some(token) = self.store.find_by_secret(secret).await? else {
            return Err(AuthError::InvalidToken);
        };

        if token.is_used() {
            return Err(AuthError::AlreadyUsed);
        }
        if token.is_expired() {
            return Err(AuthError::TokenExpired);
        }
        if token.purpose != expected {
            return Err(AuthError::InvalidToken);
        }

        if !self.store.mark_used_if_unused(token.id).await? {
            return Err(AuthError::AlreadyUsed);
        }

        Ok(token.owner_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryVerificationTokenStore;

    fn issuer() -> (VerificationTokenIssuer, Arc<MemoryVerificationTokenStore>) {
        let store = Arc::new(MemoryVerificationTokenStore::new());
        (
            VerificationTokenIssuer::new(store.clone(), TokenConfig::default()),
            store,
        )
    }

    #[tokio::test]
    async fn test_consume_returns_owner_once() {
        let (issuer, _) = issuer();
        let owner = UserId::new();
        let issued = issuer
            .issue(owner, TokenPurpose::PasswordReset)
            .await
            .unwrap();

        let consumed = issuer
            .consume(&issued.secret, TokenPurpose::PasswordReset)
            .await
            .unwrap();
        assert_eq!(consumed, owner);

        assert!(matches!(
            issuer
                .consume(&issued.secret, TokenPurpose::PasswordReset)
                .await,
            Err(AuthError::AlreadyUsed)
        ));
    }

    #[tokio::test]
    async fn test_unknown_secret_is_invalid() {
        let (issuer, _) = issuer();
        assert!(matches!(
            issuer.consume("no-such-secret", TokenPurpose::PasswordReset).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_purpose_mismatch_is_invalid() {
        let (issuer, _) = issuer();
        let issued = issuer
            .issue(UserId::new(), TokenPurpose::EmailVerification)
            .await
            .unwrap();

        assert!(matches!(
            issuer
                .consume(&issued.secret, TokenPurpose::PasswordReset)
                .await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_new_issue_invalidates_prior_unused() {
        let (issuer, _) = issuer();
        let owner = UserId::new();

        let first = issuer
            .issue(owner, TokenPurpose::PasswordReset)
            .await
            .unwrap();
        let second = issuer
            .issue(owner, TokenPurpose::PasswordReset)
            .await
            .unwrap();

        assert!(matches!(
            issuer
                .consume(&first.secret, TokenPurpose::PasswordReset)
                .await,
            Err(AuthError::AlreadyUsed)
        ));
        assert!(
            issuer
                .consume(&second.secret, TokenPurpose::PasswordReset)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_issue_of_other_purpose_does_not_invalidate() {
        let (issuer, _) = issuer();
        let owner = UserId::new();

        let reset = issuer
            .issue(owner, TokenPurpose::PasswordReset)
            .await
            .unwrap();
        issuer
            .issue(owner, TokenPurpose::EmailVerification)
            .await
            .unwrap();

        assert!(
            issuer
                .consume(&reset.secret, TokenPurpose::PasswordReset)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_expired_token_is_expired_not_invalid() {
        let (issuer, store) = issuer();
        let owner = UserId::new();
        let token = VerificationToken {
            id: VerificationTokenId::new(),
            owner_id: owner,
            secret: "expired-secret".to_string(),
            purpose: TokenPurpose::PasswordReset,
            expires_at: Utc::now() - Duration::minutes(1),
            used_at: None,
            created_at: Utc::now() - Duration::hours(2),
        };
        store.save(&token).await.unwrap();

        assert!(matches!(
            issuer
                .consume("expired-secret", TokenPurpose::PasswordReset)
                .await,
            Err(AuthError::TokenExpired)
        ));
    }
}
