//! Concurrent-session cap enforcement.

use std::sync::Arc;

use tracing::info;

use moneta_core::config::session::SessionConfig;
use moneta_core::result::AuthResult;
use moneta_core::types::{SessionId, UserId};
use moneta_entity::token::RevocationReason;

use crate::store::RefreshTokenStore;

/// Enforces the per-account concurrent-session cap by evicting the oldest
/// active session. Advisory: the new session always proceeds.
#[derive(Clone)]
pub struct SessionLimiter {
    /// Refresh-token persistence.
    store: Arc<dyn RefreshTokenStore>,
    /// Session configuration.
    config: SessionConfig,
}

impl std::fmt::Debug for SessionLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLimiter")
            .field("config", &self.config)
            .finish()
    }
}

impl SessionLimiter {
    /// Creates a new session limiter.
    pub fn new(store: Arc<dyn RefreshTokenStore>, config: SessionConfig) -> Self {
        Self { store, config }
    }

    /// Run before persisting a newly issued record. When the owner is at or
    /// above the cap, revokes exactly the single oldest active session and
    /// returns its ID.
    pub async fn enforce(&self, owner_id: UserId) -> AuthResult<Option<SessionId>> {
        let active = self.store.count_active_for_owner(owner_id).await?;
        if active < self.config.max_sessions_per_user as i64 {
            return Ok(None);
        }

        let Some(oldest) = self.store.find_oldest_active_for_owner(owner_id).await? else {
            return Ok(None);
        };

        self.store
            .revoke_if_active(oldest.id, RevocationReason::SessionLimit)
            .await?;

        info!(
            owner_id = %owner_id,
            evicted_session = %oldest.id,
            active,
            "Evicted oldest session to stay under the concurrent-session cap"
        );

        Ok(Some(oldest.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRefreshTokenStore;
    use chrono::{Duration, Utc};
    use moneta_core::types::FamilyId;
    use moneta_entity::token::{DeviceMetadata, RefreshTokenRecord};

    async fn seed(store: &MemoryRefreshTokenStore, owner: UserId, age_days: i64) -> SessionId {
        let record = RefreshTokenRecord {
            id: SessionId::new(),
            owner_id: owner,
            family_id: FamilyId::new(),
            token_hash: format!("hash-{age_days}"),
            device: DeviceMetadata::default(),
            expires_at: Utc::now() + Duration::days(7),
            revoked_at: None,
            revoked_reason: None,
            created_at: Utc::now() - Duration::days(age_days),
            last_used_at: None,
        };
        store.save(&record).await.unwrap();
        record.id
    }

    #[tokio::test]
    async fn test_under_cap_is_a_noop() {
        let store = Arc::new(MemoryRefreshTokenStore::new());
        let owner = UserId::new();
        seed(&store, owner, 1).await;

        let limiter = SessionLimiter::new(
            store.clone(),
            SessionConfig {
                max_sessions_per_user: 5,
            },
        );
        assert!(limiter.enforce(owner).await.unwrap().is_none());
        assert_eq!(store.count_active_for_owner(owner).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_at_cap_evicts_exactly_the_oldest() {
        let store = Arc::new(MemoryRefreshTokenStore::new());
        let owner = UserId::new();
        let oldest = seed(&store, owner, 5).await;
        seed(&store, owner, 3).await;
        seed(&store, owner, 1).await;

        let limiter = SessionLimiter::new(
            store.clone(),
            SessionConfig {
                max_sessions_per_user: 3,
            },
        );
        let evicted = limiter.enforce(owner).await.unwrap();
        assert_eq!(evicted, Some(oldest));

        assert_eq!(store.count_active_for_owner(owner).await.unwrap(), 2);
        let record = store.find_by_id(oldest).await.unwrap().unwrap();
        assert_eq!(record.revoked_reason, Some(RevocationReason::SessionLimit));
    }

    #[tokio::test]
    async fn test_other_owners_are_untouched() {
        let store = Arc::new(MemoryRefreshTokenStore::new());
        let owner = UserId::new();
        let bystander = UserId::new();
        seed(&store, owner, 2).await;
        seed(&store, bystander, 9).await;

        let limiter = SessionLimiter::new(
            store.clone(),
            SessionConfig {
                max_sessions_per_user: 1,
            },
        );
        limiter.enforce(owner).await.unwrap();

        assert_eq!(store.count_active_for_owner(bystander).await.unwrap(), 1);
    }
}
