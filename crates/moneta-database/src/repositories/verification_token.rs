//! Verification-token repository implementation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use moneta_core::error::AuthError;
use moneta_core::result::AuthResult;
use moneta_core::types::{UserId, VerificationTokenId};
use moneta_entity::verification::{TokenPurpose, VerificationToken};

/// Repository for single-use verification and password-reset tokens.
#[derive(Debug, Clone)]
pub struct VerificationTokenRepository {
    pool: PgPool,
}

impl VerificationTokenRepository {
    /// Create a new verification-token repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new token.
    pub async fn insert(&self, token: &VerificationToken) -> AuthResult<()> {
        sqlx::query(
            "INSERT INTO verification_tokens \
             (id, owner_id, secret, purpose, expires_at, used_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(token.id)
        .bind(token.owner_id)
        .bind(&token.secret)
        .bind(token.purpose)
        .bind(token.expires_at)
        .bind(token.used_at)
        .bind(token.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::infrastructure("Failed to insert verification token", e))?;
        Ok(())
    }

    /// Find a token by its secret.
    pub async fn find_by_secret(&self, secret: &str) -> AuthResult<Option<VerificationToken>> {
        sqlx::query_as::<_, VerificationToken>(
            "SELECT * FROM verification_tokens WHERE secret = $1",
        )
        .bind(secret)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::infrastructure("Failed to find verification token", e))
    }

    /// Atomically claim a token: mark it used only if it is still unused.
    ///
    /// Returns `true` when this call performed the claim, leaving no window
    /// in which a second consumer could also succeed.
    pub async fn mark_used_if_unused(
        &self,
        id: VerificationTokenId,
        at: DateTime<Utc>,
    ) -> AuthResult<bool> {
        let result = sqlx::query(
            "UPDATE verification_tokens SET used_at = $2 WHERE id = $1 AND used_at IS NULL",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::infrastructure("Failed to mark verification token used", e))?;

        Ok(result.rows_affected() > 0)
    }

    /// Invalidate every unused token of a purpose for an owner.
    pub async fn invalidate_unused_for_owner(
        &self,
        owner_id: UserId,
        purpose: TokenPurpose,
        at: DateTime<Utc>,
    ) -> AuthResult<u64> {
        let result = sqlx::query(
            "UPDATE verification_tokens SET used_at = $3 \
             WHERE owner_id = $1 AND purpose = $2 AND used_at IS NULL",
        )
        .bind(owner_id)
        .bind(purpose)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::infrastructure("Failed to invalidate prior tokens", e))?;

        Ok(result.rows_affected())
    }

    /// Delete tokens that expired or were consumed before the cutoff.
    pub async fn delete_stale(&self, cutoff: DateTime<Utc>) -> AuthResult<u64> {
        let result = sqlx::query(
            "DELETE FROM verification_tokens \
             WHERE expires_at < $1 OR (used_at IS NOT NULL AND used_at < $1)",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::infrastructure("Failed to delete stale tokens", e))?;

        Ok(result.rows_affected())
    }
}
