//! User entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use moneta_core::types::UserId;

use super::status::UserStatus;

/// A registered account in the Moneta service.
///
/// Besides identity, the row carries the account's security state: the
/// consecutive failed-login counter, the timed lock, and the monotonic
/// `token_version` whose bump invalidates every outstanding access token.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique account identifier.
    pub id: UserId,
    /// Login email, unique.
    pub email: String,
    /// Argon2id password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Account status.
    pub status: UserStatus,
    /// When the email address was verified, if it has been.
    pub email_verified_at: Option<DateTime<Utc>>,
    /// Number of consecutive failed login attempts.
    pub failed_login_attempts: i32,
    /// Account locked until this time (if locked).
    pub locked_until: Option<DateTime<Utc>>,
    /// Generation counter embedded in every access token; a mismatch at
    /// verification time means the token was issued before a logout-all or
    /// password reset.
    pub token_version: i32,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
    /// Last successful login time.
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    /// Check whether the account is locked at this instant.
    pub fn is_locked(&self) -> bool {
        match self.locked_until {
            Some(locked_until) => Utc::now() < locked_until,
            None => false,
        }
    }

    /// Check whether the email address has been verified.
    pub fn is_email_verified(&self) -> bool {
        self.email_verified_at.is_some()
    }
}
