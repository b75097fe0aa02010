//! Verification token entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use moneta_core::types::{UserId, VerificationTokenId};

/// A single-use, short-lived token mailed to an account owner.
///
/// Lives in its own namespace, entirely separate from refresh tokens. A
/// non-null `used_at` makes the token permanently invalid even if unexpired.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VerificationToken {
    /// Unique token identifier.
    pub id: VerificationTokenId,
    /// The account this token was issued for.
    pub owner_id: UserId,
    /// The opaque secret mailed to the owner, unique.
    #[serde(skip_serializing)]
    pub secret: String,
    /// What consuming this token proves.
    pub purpose: TokenPurpose,
    /// When the token expires.
    pub expires_at: DateTime<Utc>,
    /// When the token was consumed (or superseded by a newer issue).
    pub used_at: Option<DateTime<Utc>>,
    /// When the token was created.
    pub created_at: DateTime<Utc>,
}

impl VerificationToken {
    /// Check whether the token has been consumed or superseded.
    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }

    /// Check whether the token has passed its expiry.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// The action a verification token authorises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "token_purpose", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    /// Proving ownership of the account's email address.
    EmailVerification,
    /// Authorising a password reset.
    PasswordReset,
}

impl TokenPurpose {
    /// Return the purpose as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmailVerification => "email_verification",
            Self::PasswordReset => "password_reset",
        }
    }
}

impl fmt::Display for TokenPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TokenPurpose {
    type Err = moneta_core::AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email_verification" => Ok(Self::EmailVerification),
            "password_reset" => Ok(Self::PasswordReset),
            _ => Err(moneta_core::AuthError::internal(format!(
                "Invalid token purpose: '{s}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_used_token_is_used_even_if_unexpired() {
        let token = VerificationToken {
            id: VerificationTokenId::new(),
            owner_id: UserId::new(),
            secret: "s".to_string(),
            purpose: TokenPurpose::PasswordReset,
            expires_at: Utc::now() + Duration::hours(1),
            used_at: Some(Utc::now()),
            created_at: Utc::now(),
        };
        assert!(token.is_used());
        assert!(!token.is_expired());
    }

    #[test]
    fn test_secret_not_serialized() {
        let token = VerificationToken {
            id: VerificationTokenId::new(),
            owner_id: UserId::new(),
            secret: "s3cret".to_string(),
            purpose: TokenPurpose::EmailVerification,
            expires_at: Utc::now(),
            used_at: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(token).expect("serialize");
        assert!(json.get("secret").is_none());
    }
}
