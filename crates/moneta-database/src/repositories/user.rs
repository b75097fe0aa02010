//! User repository implementation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use moneta_core::error::AuthError;
use moneta_core::result::AuthResult;
use moneta_core::types::UserId;
use moneta_entity::user::User;

/// Repository for account lookup and security-state updates.
///
/// Counter updates are single conditional `UPDATE ... RETURNING` statements
/// so concurrent logins or resets never lose an increment.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a user by email address.
    pub async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::infrastructure("Failed to find user by email", e))
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: UserId) -> AuthResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::infrastructure("Failed to find user", e))
    }

    /// Atomically increment the failed-login counter, returning the new value.
    pub async fn increment_failed_attempts(&self, id: UserId) -> AuthResult<i32> {
        sqlx::query_scalar::<_, i32>(
            "UPDATE users SET failed_login_attempts = failed_login_attempts + 1, \
             updated_at = NOW() WHERE id = $1 RETURNING failed_login_attempts",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AuthError::infrastructure("Failed to increment failed attempts", e))
    }

    /// Set the timed lock on an account.
    pub async fn lock_until(&self, id: UserId, until: DateTime<Utc>) -> AuthResult<()> {
        sqlx::query("UPDATE users SET locked_until = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(until)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::infrastructure("Failed to lock account", e))?;
        Ok(())
    }

    /// Clear the failed-login counter and any timed lock.
    pub async fn reset_failed_attempts(&self, id: UserId) -> AuthResult<()> {
        sqlx::query(
            "UPDATE users SET failed_login_attempts = 0, locked_until = NULL, \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::infrastructure("Failed to reset failed attempts", e))?;
        Ok(())
    }

    /// Atomically bump the token-version counter, returning the new value.
    ///
    /// The single-row `UPDATE` serialises concurrent bumps (logout-all racing
    /// a password reset) without an explicit lock.
    pub async fn bump_token_version(&self, id: UserId) -> AuthResult<i32> {
        sqlx::query_scalar::<_, i32>(
            "UPDATE users SET token_version = token_version + 1, updated_at = NOW() \
             WHERE id = $1 RETURNING token_version",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AuthError::infrastructure("Failed to bump token version", e))
    }

    /// Read the current token version for an account.
    pub async fn token_version(&self, id: UserId) -> AuthResult<Option<i32>> {
        sqlx::query_scalar::<_, i32>("SELECT token_version FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::infrastructure("Failed to read token version", e))
    }

    /// Replace the stored password hash.
    pub async fn set_password_hash(&self, id: UserId, password_hash: &str) -> AuthResult<()> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::infrastructure("Failed to update password hash", e))?;
        Ok(())
    }

    /// Mark the account's email address as verified.
    pub async fn set_email_verified(&self, id: UserId, at: DateTime<Utc>) -> AuthResult<()> {
        sqlx::query(
            "UPDATE users SET email_verified_at = $2, updated_at = NOW() \
             WHERE id = $1 AND email_verified_at IS NULL",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::infrastructure("Failed to mark email verified", e))?;
        Ok(())
    }

    /// Record a successful login time.
    pub async fn set_last_login(&self, id: UserId, at: DateTime<Utc>) -> AuthResult<()> {
        sqlx::query("UPDATE users SET last_login_at = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::infrastructure("Failed to record last login", e))?;
        Ok(())
    }
}
