//! Refresh-token record entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use moneta_core::types::{FamilyId, SessionId, UserId};

use super::device::DeviceMetadata;

/// One link in a refresh-token rotation chain.
///
/// Records sharing a `family_id` descend from the same login. Under normal
/// operation at most one record per family is both unexpired and unrevoked;
/// a revoked record being presented again is the reuse-detection signal that
/// revokes the whole family.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RefreshTokenRecord {
    /// Session identifier; also embedded in access tokens minted alongside.
    pub id: SessionId,
    /// The account this session belongs to.
    pub owner_id: UserId,
    /// Rotation chain this record belongs to.
    pub family_id: FamilyId,
    /// SHA-256 lookup hash of the opaque secret. The secret itself is never
    /// persisted.
    #[serde(skip_serializing)]
    pub token_hash: String,
    /// Best-effort client description; informational only.
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub device: DeviceMetadata,
    /// When the record expires.
    pub expires_at: DateTime<Utc>,
    /// When the record was revoked, if it has been.
    pub revoked_at: Option<DateTime<Utc>>,
    /// Why the record was revoked. Informational: the reuse check keys on
    /// `revoked_at` alone.
    pub revoked_reason: Option<RevocationReason>,
    /// When the record was created (login or rotation time).
    pub created_at: DateTime<Utc>,
    /// When the record was last exchanged.
    pub last_used_at: Option<DateTime<Utc>>,
}

impl RefreshTokenRecord {
    /// Check whether the record has been revoked.
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Check whether the record has passed its expiry.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// Check whether the record is still exchangeable.
    pub fn is_active(&self) -> bool {
        !self.is_revoked() && !self.is_expired()
    }
}

/// Why a refresh-token record left the active state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "revocation_reason", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RevocationReason {
    /// Exchanged for a successor in the same family.
    Rotated,
    /// Explicit single-session logout.
    Logout,
    /// Account-wide logout.
    LogoutAll,
    /// Evicted to keep the account under its concurrent-session cap.
    SessionLimit,
    /// Family-wide revocation after an already-revoked token was replayed.
    ReuseDetected,
    /// Account password was reset.
    PasswordReset,
}

impl RevocationReason {
    /// Return the reason as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rotated => "rotated",
            Self::Logout => "logout",
            Self::LogoutAll => "logout_all",
            Self::SessionLimit => "session_limit",
            Self::ReuseDetected => "reuse_detected",
            Self::PasswordReset => "password_reset",
        }
    }
}

impl fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RevocationReason {
    type Err = moneta_core::AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rotated" => Ok(Self::Rotated),
            "logout" => Ok(Self::Logout),
            "logout_all" => Ok(Self::LogoutAll),
            "session_limit" => Ok(Self::SessionLimit),
            "reuse_detected" => Ok(Self::ReuseDetected),
            "password_reset" => Ok(Self::PasswordReset),
            _ => Err(moneta_core::AuthError::internal(format!(
                "Invalid revocation reason: '{s}'"
            ))),
        }
    }
}
