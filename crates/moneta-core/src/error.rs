//! Unified error types for Moneta.
//!
//! All crates map their internal failures into [`AuthError`] for consistent
//! propagation through the ? operator. Callers are expected to match on the
//! variant: the token-specific kinds are terminal for the presented
//! credential, while [`AuthError::Infrastructure`] is retryable with backoff.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// The unified error used throughout Moneta.
///
/// Token verification failures are deliberately coarse: malformed, unknown,
/// and bad-signature tokens all collapse into [`AuthError::InvalidToken`] so
/// a caller (or an attacker downstream of one) never learns *why* a
/// credential was rejected.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The presented token is unknown, malformed, or fails verification.
    #[error("invalid token")]
    InvalidToken,

    /// The token was once valid but its expiry has passed. Recoverable by
    /// re-authenticating.
    #[error("token expired")]
    TokenExpired,

    /// An already-revoked refresh token was presented again. The entire
    /// token family has been revoked as a side effect before this error was
    /// returned; the caller must treat every session of the account as dead.
    #[error("refresh token reuse detected")]
    TokenReuse,

    /// The account is locked; carries the time at which it unlocks.
    #[error("account locked until {locked_until}")]
    AccountLocked {
        /// When the lock expires.
        locked_until: DateTime<Utc>,
    },

    /// Unknown account or wrong password, deliberately indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// A single-use verification or reset token has already been consumed.
    #[error("token already used")]
    AlreadyUsed,

    /// The backing store is unavailable or timed out. Retryable by the
    /// caller with backoff; never conflated with a token-specific failure.
    #[error("infrastructure error: {message}")]
    Infrastructure {
        /// A human-readable description of the failure.
        message: String,
        /// The underlying cause, when one exists.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration could not be loaded or is inconsistent.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An invariant the core relies on did not hold.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Create a retryable infrastructure error with an underlying cause.
    pub fn infrastructure(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Infrastructure {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a retryable infrastructure error without a cause.
    pub fn infrastructure_msg(message: impl Into<String>) -> Self {
        Self::Infrastructure {
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the caller may retry the failed operation with backoff.
    ///
    /// Only infrastructure failures are retryable. Retrying a `rotate` after
    /// a *successful* rotation with the old secret would itself register as
    /// reuse, so callers must cache the result of a rotation attempt rather
    /// than replay the input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Infrastructure { .. })
    }
}

impl From<config::ConfigError> for AuthError {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration(format!("{err}"))
    }
}
