//! Refresh-token repository implementation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use moneta_core::error::AuthError;
use moneta_core::result::AuthResult;
use moneta_core::types::{FamilyId, SessionId, UserId};
use moneta_entity::token::{RefreshTokenRecord, RevocationReason};

/// Repository for refresh-token record CRUD and revocation.
///
/// Every revocation is a conditional `UPDATE ... WHERE revoked_at IS NULL`
/// so concurrent rotations of the same record serialise on the row: exactly
/// one caller observes `rows_affected == 1`.
#[derive(Debug, Clone)]
pub struct RefreshTokenRepository {
    pool: PgPool,
}

impl RefreshTokenRepository {
    /// Create a new refresh-token repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new record.
    pub async fn insert(&self, record: &RefreshTokenRecord) -> AuthResult<()> {
        sqlx::query(
            "INSERT INTO refresh_tokens \
             (id, owner_id, family_id, token_hash, ip_address, user_agent, \
              expires_at, revoked_at, revoked_reason, created_at, last_used_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(record.id)
        .bind(record.owner_id)
        .bind(record.family_id)
        .bind(&record.token_hash)
        .bind(&record.device.ip_address)
        .bind(&record.device.user_agent)
        .bind(record.expires_at)
        .bind(record.revoked_at)
        .bind(record.revoked_reason)
        .bind(record.created_at)
        .bind(record.last_used_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::infrastructure("Failed to insert refresh token", e))?;
        Ok(())
    }

    /// Find a record by its lookup hash.
    pub async fn find_by_hash(&self, token_hash: &str) -> AuthResult<Option<RefreshTokenRecord>> {
        sqlx::query_as::<_, RefreshTokenRecord>(
            "SELECT * FROM refresh_tokens WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::infrastructure("Failed to find refresh token by hash", e))
    }

    /// Find a record by session ID.
    pub async fn find_by_id(&self, id: SessionId) -> AuthResult<Option<RefreshTokenRecord>> {
        sqlx::query_as::<_, RefreshTokenRecord>("SELECT * FROM refresh_tokens WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::infrastructure("Failed to find refresh token", e))
    }

    /// Revoke a single record if it has not been revoked yet.
    ///
    /// Returns `true` when this call performed the revocation.
    pub async fn revoke_if_active(
        &self,
        id: SessionId,
        reason: RevocationReason,
        at: DateTime<Utc>,
    ) -> AuthResult<bool> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = $2, revoked_reason = $3, last_used_at = $2 \
             WHERE id = $1 AND revoked_at IS NULL",
        )
        .bind(id)
        .bind(at)
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::infrastructure("Failed to revoke refresh token", e))?;

        Ok(result.rows_affected() > 0)
    }

    /// Revoke every unrevoked record in a family. Idempotent.
    pub async fn revoke_family(
        &self,
        family_id: FamilyId,
        reason: RevocationReason,
        at: DateTime<Utc>,
    ) -> AuthResult<u64> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = $2, revoked_reason = $3 \
             WHERE family_id = $1 AND revoked_at IS NULL",
        )
        .bind(family_id)
        .bind(at)
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::infrastructure("Failed to revoke token family", e))?;

        Ok(result.rows_affected())
    }

    /// Revoke every unrevoked record belonging to an owner.
    pub async fn revoke_all_for_owner(
        &self,
        owner_id: UserId,
        reason: RevocationReason,
        at: DateTime<Utc>,
    ) -> AuthResult<u64> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = $2, revoked_reason = $3 \
             WHERE owner_id = $1 AND revoked_at IS NULL",
        )
        .bind(owner_id)
        .bind(at)
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::infrastructure("Failed to revoke owner tokens", e))?;

        Ok(result.rows_affected())
    }

    /// Count active (unrevoked, unexpired) records for an owner.
    pub async fn count_active_for_owner(&self, owner_id: UserId) -> AuthResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM refresh_tokens \
             WHERE owner_id = $1 AND revoked_at IS NULL AND expires_at > NOW()",
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AuthError::infrastructure("Failed to count active sessions", e))
    }

    /// Find the oldest active record for an owner (session-cap eviction).
    pub async fn find_oldest_active_for_owner(
        &self,
        owner_id: UserId,
    ) -> AuthResult<Option<RefreshTokenRecord>> {
        sqlx::query_as::<_, RefreshTokenRecord>(
            "SELECT * FROM refresh_tokens \
             WHERE owner_id = $1 AND revoked_at IS NULL AND expires_at > NOW() \
             ORDER BY created_at ASC LIMIT 1",
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::infrastructure("Failed to find oldest session", e))
    }

    /// List all active records for an owner, newest first.
    pub async fn find_active_for_owner(
        &self,
        owner_id: UserId,
    ) -> AuthResult<Vec<RefreshTokenRecord>> {
        sqlx::query_as::<_, RefreshTokenRecord>(
            "SELECT * FROM refresh_tokens \
             WHERE owner_id = $1 AND revoked_at IS NULL AND expires_at > NOW() \
             ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AuthError::infrastructure("Failed to list active sessions", e))
    }

    /// Delete records that expired or were revoked before the cutoff.
    pub async fn delete_expired(&self, cutoff: DateTime<Utc>) -> AuthResult<u64> {
        let result = sqlx::query(
            "DELETE FROM refresh_tokens \
             WHERE expires_at < $1 OR (revoked_at IS NOT NULL AND revoked_at < $1)",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::infrastructure("Failed to delete stale refresh tokens", e))?;

        Ok(result.rows_affected())
    }
}
