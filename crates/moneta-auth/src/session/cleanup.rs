//! Garbage collection of stale token records.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::info;

use moneta_core::config::sweeper::SweeperConfig;
use moneta_core::result::AuthResult;

use crate::store::{RefreshTokenStore, VerificationTokenStore};

/// Counts from one sweep cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Refresh-token records deleted.
    pub refresh_deleted: u64,
    /// Verification tokens deleted.
    pub verification_deleted: u64,
}

/// Deletes token records once they are expired or revoked-and-stale.
///
/// Revoked refresh-token records are deliberately retained for the
/// configured window: a replayed secret must still find its (revoked) row so
/// the engine classifies it as reuse rather than as an unknown token.
#[derive(Clone)]
pub struct TokenSweeper {
    /// Refresh-token persistence.
    refresh_store: Arc<dyn RefreshTokenStore>,
    /// Verification-token persistence.
    verification_store: Arc<dyn VerificationTokenStore>,
    /// Sweeper configuration.
    config: SweeperConfig,
}

impl std::fmt::Debug for TokenSweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSweeper")
            .field("config", &self.config)
            .finish()
    }
}

impl TokenSweeper {
    /// Creates a new sweeper.
    pub fn new(
        refresh_store: Arc<dyn RefreshTokenStore>,
        verification_store: Arc<dyn VerificationTokenStore>,
        config: SweeperConfig,
    ) -> Self {
        Self {
            refresh_store,
            verification_store,
            config,
        }
    }

    /// Runs one sweep cycle, returning what was deleted.
    pub async fn run_sweep(&self) -> AuthResult<SweepReport> {
        let cutoff = Utc::now() - Duration::days(self.config.retention_days as i64);

        let refresh_deleted = self.refresh_store.delete_expired(cutoff).await?;
        let verification_deleted = self.verification_store.delete_stale(cutoff).await?;

        if refresh_deleted > 0 || verification_deleted > 0 {
            info!(
                refresh_deleted,
                verification_deleted,
                "Token sweep completed"
            );
        }

        Ok(SweepReport {
            refresh_deleted,
            verification_deleted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryRefreshTokenStore, MemoryVerificationTokenStore};
    use moneta_core::types::{FamilyId, SessionId, UserId, VerificationTokenId};
    use moneta_entity::token::{DeviceMetadata, RefreshTokenRecord};
    use moneta_entity::verification::{TokenPurpose, VerificationToken};

    #[tokio::test]
    async fn test_sweep_removes_only_stale_records() {
        let refresh = Arc::new(MemoryRefreshTokenStore::new());
        let verification = Arc::new(MemoryVerificationTokenStore::new());
        let owner = UserId::new();

        let stale = RefreshTokenRecord {
            id: SessionId::new(),
            owner_id: owner,
            family_id: FamilyId::new(),
            token_hash: "stale".to_string(),
            device: DeviceMetadata::default(),
            expires_at: Utc::now() - Duration::days(40),
            revoked_at: None,
            revoked_reason: None,
            created_at: Utc::now() - Duration::days(47),
            last_used_at: None,
        };
        let live = RefreshTokenRecord {
            id: SessionId::new(),
            token_hash: "live".to_string(),
            expires_at: Utc::now() + Duration::days(7),
            created_at: Utc::now(),
            ..stale.clone()
        };
        refresh.save(&stale).await.unwrap();
        refresh.save(&live).await.unwrap();

        let used_long_ago = VerificationToken {
            id: VerificationTokenId::new(),
            owner_id: owner,
            secret: "old".to_string(),
            purpose: TokenPurpose::PasswordReset,
            expires_at: Utc::now() - Duration::days(40),
            used_at: Some(Utc::now() - Duration::days(40)),
            created_at: Utc::now() - Duration::days(41),
        };
        verification.save(&used_long_ago).await.unwrap();

        let sweeper = TokenSweeper::new(
            refresh.clone(),
            verification.clone(),
            SweeperConfig {
                retention_days: 30,
                ..SweeperConfig::default()
            },
        );

        let report = sweeper.run_sweep().await.unwrap();
        assert_eq!(report.refresh_deleted, 1);
        assert_eq!(report.verification_deleted, 1);
        assert!(refresh.find_by_id(live.id).await.unwrap().is_some());
        assert!(refresh.find_by_id(stale.id).await.unwrap().is_none());
    }
}
