//! Claims embedded in every access token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use moneta_core::types::{SessionId, UserId};

/// JWT claims payload for an access token.
///
/// Validity is determined entirely by signature and expiry plus the caller's
/// cross-check that `ver` still matches the account's current token version;
/// nothing here is looked up in storage by the codec itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject — the account ID.
    pub sub: UserId,
    /// Session this token was minted for.
    pub sid: SessionId,
    /// Account token version at issuance time.
    pub ver: i32,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
}

impl Claims {
    /// Returns the account ID from the subject claim.
    pub fn user_id(&self) -> UserId {
        self.sub
    }

    /// Returns the session ID.
    pub fn session_id(&self) -> SessionId {
        self.sid
    }

    /// Returns the token version the token was minted with.
    pub fn token_version(&self) -> i32 {
        self.ver
    }

    /// Returns the expiration as a `DateTime<Utc>`.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }

    /// Checks whether this token has expired.
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}
