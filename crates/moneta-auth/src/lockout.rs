//! Failed-attempt counting and timed account locks.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use moneta_core::config::lockout::LockoutConfig;
use moneta_core::error::AuthError;
use moneta_core::result::AuthResult;
use moneta_core::types::UserId;
use moneta_entity::user::User;

use crate::store::AccountStore;

/// Tracks consecutive failed authentication attempts per account and imposes
/// a timed lock once the configured threshold is reached.
#[derive(Clone)]
pub struct LockoutTracker {
    /// Account persistence.
    accounts: Arc<dyn AccountStore>,
    /// Lockout configuration.
    config: LockoutConfig,
}

impl std::fmt::Debug for LockoutTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockoutTracker")
            .field("config", &self.config)
            .finish()
    }
}

impl LockoutTracker {
    /// Creates a new lockout tracker.
    pub fn new(accounts: Arc<dyn AccountStore>, config: LockoutConfig) -> Self {
        Self { accounts, config }
    }

    /// Gate a login attempt.
    ///
    /// While the lock is in the future this fails with `AccountLocked` and
    /// the caller must not perform any password comparison, so locked and
    /// unlocked attempts stay indistinguishable in timing. A lock whose
    /// window has passed clears the counter as a side effect and lets the
    /// attempt proceed.
    pub async fn check(&self, user: &User) -> AuthResult<()> {
        if let Some(locked_until) = user.locked_until {
            if locked_until > Utc::now() {
                return Err(AuthError::AccountLocked { locked_until });
            }
            info!(user_id = %user.id, "Lock window passed, clearing failed attempts");
            self.accounts.reset_failed_attempts(user.id).await?;
        }
        Ok(())
    }

    /// Record a failed password verification.
    ///
    /// At the threshold the account is locked for the configured duration;
    /// the counter is left at its current value.
    pub async fn record_failure(&self, user_id: UserId) -> AuthResult<()> {
        let count = self.accounts.increment_failed_attempts(user_id).await?;

        if count >= self.config.max_failed_attempts {
            let locked_until =
                Utc::now() + chrono::Duration::minutes(self.config.lockout_duration_minutes as i64);
            self.accounts.lock_until(user_id, locked_until).await?;
            warn!(
                user_id = %user_id,
                attempts = count,
                locked_until = %locked_until,
                "Account locked after consecutive failed login attempts"
            );
        }

        Ok(())
    }

    /// Record a successful authentication, resetting the counter to zero.
    /// No-op when the counter is already zero.
    pub async fn record_success(&self, user: &User) -> AuthResult<()> {
        if user.failed_login_attempts > 0 || user.locked_until.is_some() {
            self.accounts.reset_failed_attempts(user.id).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryAccountStore;
    use chrono::Duration;
    use moneta_entity::user::UserStatus;

    fn test_user() -> User {
        User {
            id: UserId::new(),
            email: "owner@example.com".to_string(),
            password_hash: "hash".to_string(),
            status: UserStatus::Active,
            email_verified_at: None,
            failed_login_attempts: 0,
            locked_until: None,
            token_version: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        }
    }

    fn tracker(accounts: Arc<MemoryAccountStore>) -> LockoutTracker {
        LockoutTracker::new(
            accounts,
            LockoutConfig {
                max_failed_attempts: 5,
                lockout_duration_minutes: 30,
            },
        )
    }

    #[tokio::test]
    async fn test_threshold_failures_lock_the_account() {
        let accounts = Arc::new(MemoryAccountStore::new());
        let user = test_user();
        accounts.insert(user.clone()).await;
        let tracker = tracker(accounts.clone());

        for _ in 0..4 {
            tracker.record_failure(user.id).await.unwrap();
        }
        let partial = accounts.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(partial.failed_login_attempts, 4);
        assert!(partial.locked_until.is_none());

        tracker.record_failure(user.id).await.unwrap();
        let locked = accounts.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(locked.failed_login_attempts, 5);
        assert!(locked.locked_until.expect("locked") > Utc::now());
    }

    #[tokio::test]
    async fn test_check_rejects_while_locked() {
        let accounts = Arc::new(MemoryAccountStore::new());
        let mut user = test_user();
        user.locked_until = Some(Utc::now() + Duration::minutes(10));
        accounts.insert(user.clone()).await;
        let tracker = tracker(accounts);

        match tracker.check(&user).await {
            Err(AuthError::AccountLocked { locked_until }) => {
                assert!(locked_until > Utc::now());
            }
            other => panic!("expected AccountLocked, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_expired_lock_clears_counter_and_proceeds() {
        let accounts = Arc::new(MemoryAccountStore::new());
        let mut user = test_user();
        user.failed_login_attempts = 5;
        user.locked_until = Some(Utc::now() - Duration::minutes(1));
        accounts.insert(user.clone()).await;
        let tracker = tracker(accounts.clone());

        tracker.check(&user).await.unwrap();

        let cleared = accounts.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(cleared.failed_login_attempts, 0);
        assert!(cleared.locked_until.is_none());
    }

    #[tokio::test]
    async fn test_success_resets_counter() {
        let accounts = Arc::new(MemoryAccountStore::new());
        let user = test_user();
        accounts.insert(user.clone()).await;
        let tracker = tracker(accounts.clone());

        for _ in 0..4 {
            tracker.record_failure(user.id).await.unwrap();
        }
        let current = accounts.find_by_id(user.id).await.unwrap().unwrap();
        tracker.record_success(&current).await.unwrap();

        let reset = accounts.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(reset.failed_login_attempts, 0);
        assert!(reset.locked_until.is_none());
    }
}
