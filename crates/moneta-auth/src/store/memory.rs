//! In-memory store implementations using Tokio mutexes.
//!
//! Suitable for single-node deployments and as the test double the rotation
//! engine is exercised against. The mutex makes each operation atomic, which
//! is all the optimistic-claim contract requires.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use moneta_core::result::AuthResult;
use moneta_core::types::{FamilyId, SessionId, UserId, VerificationTokenId};
use moneta_entity::token::{RefreshTokenRecord, RevocationReason};
use moneta_entity::user::User;
use moneta_entity::verification::{TokenPurpose, VerificationToken};

use super::{AccountStore, RefreshTokenStore, VerificationTokenStore};

/// In-memory refresh-token store.
#[derive(Debug, Clone, Default)]
pub struct MemoryRefreshTokenStore {
    /// Records keyed by session ID.
    records: Arc<Mutex<HashMap<SessionId, RefreshTokenRecord>>>,
}

impl MemoryRefreshTokenStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held, regardless of state.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryRefreshTokenStore {
    async fn save(&self, record: &RefreshTokenRecord) -> AuthResult<()> {
        self.records.lock().await.insert(record.id, record.clone());
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> AuthResult<Option<RefreshTokenRecord>> {
        let records = self.records.lock().await;
        Ok(records.values().find(|r| r.token_hash == token_hash).cloned())
    }

    async fn find_by_id(&self, id: SessionId) -> AuthResult<Option<RefreshTokenRecord>> {
        Ok(self.records.lock().await.get(&id).cloned())
    }

    async fn revoke_if_active(&self, id: SessionId, reason: RevocationReason) -> AuthResult<bool> {
        let mut records = self.records.lock().await;
        match records.get_mut(&id) {
            Some(record) if record.revoked_at.is_none() => {
                let now = Utc::now();
                record.revoked_at = Some(now);
                record.revoked_reason = Some(reason);
                record.last_used_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_family(
        &self,
        family_id: FamilyId,
        reason: RevocationReason,
    ) -> AuthResult<u64> {
        let mut records = self.records.lock().await;
        let now = Utc::now();
        let mut revoked = 0u64;
        for record in records.values_mut() {
            if record.family_id == family_id && record.revoked_at.is_none() {
                record.revoked_at = Some(now);
                record.revoked_reason = Some(reason);
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn revoke_all_for_owner(
        &self,
        owner_id: UserId,
        reason: RevocationReason,
    ) -> AuthResult<u64> {
        let mut records = self.records.lock().await;
        let now = Utc::now();
        let mut revoked = 0u64;
        for record in records.values_mut() {
            if record.owner_id == owner_id && record.revoked_at.is_none() {
                record.revoked_at = Some(now);
                record.revoked_reason = Some(reason);
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn count_active_for_owner(&self, owner_id: UserId) -> AuthResult<i64> {
        let records = self.records.lock().await;
        Ok(records
            .values()
            .filter(|r| r.owner_id == owner_id && r.is_active())
            .count() as i64)
    }

    async fn find_oldest_active_for_owner(
        &self,
        owner_id: UserId,
    ) -> AuthResult<Option<RefreshTokenRecord>> {
        let records = self.records.lock().await;
        Ok(records
            .values()
            .filter(|r| r.owner_id == owner_id && r.is_active())
            .min_by_key(|r| r.created_at)
            .cloned())
    }

    async fn find_active_for_owner(
        &self,
        owner_id: UserId,
    ) -> AuthResult<Vec<RefreshTokenRecord>> {
        let records = self.records.lock().await;
        let mut active: Vec<_> = records
            .values()
            .filter(|r| r.owner_id == owner_id && r.is_active())
            .cloned()
            .collect();
        active.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(active)
    }

    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> AuthResult<u64> {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|_, r| {
            let stale_expiry = r.expires_at < cutoff;
            let stale_revocation = r.revoked_at.is_some_and(|at| at < cutoff);
            !(stale_expiry || stale_revocation)
        });
        Ok((before - records.len()) as u64)
    }
}

/// In-memory account store.
#[derive(Debug, Clone, Default)]
pub struct MemoryAccountStore {
    /// Accounts keyed by ID.
    users: Arc<Mutex<HashMap<UserId, User>>>,
}

impl MemoryAccountStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account into the store.
    pub async fn insert(&self, user: User) {
        self.users.lock().await.insert(user.id, user);
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let users = self.users.lock().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: UserId) -> AuthResult<Option<User>> {
        Ok(self.users.lock().await.get(&id).cloned())
    }

    async fn increment_failed_attempts(&self, id: UserId) -> AuthResult<i32> {
        let mut users = self.users.lock().await;
        match users.get_mut(&id) {
            Some(user) => {
                user.failed_login_attempts += 1;
                user.updated_at = Utc::now();
                Ok(user.failed_login_attempts)
            }
            None => Ok(0),
        }
    }

    async fn lock_until(&self, id: UserId, until: DateTime<Utc>) -> AuthResult<()> {
        let mut users = self.users.lock().await;
        if let Some(user) = users.get_mut(&id) {
            user.locked_until = Some(until);
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn reset_failed_attempts(&self, id: UserId) -> AuthResult<()> {
        let mut users = self.users.lock().await;
        if let Some(user) = users.get_mut(&id) {
            user.failed_login_attempts = 0;
            user.locked_until = None;
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn bump_token_version(&self, id: UserId) -> AuthResult<i32> {
        let mut users = self.users.lock().await;
        match users.get_mut(&id) {
            Some(user) => {
                user.token_version += 1;
                user.updated_at = Utc::now();
                Ok(user.token_version)
            }
            None => Ok(0),
        }
    }

    async fn token_version(&self, id: UserId) -> AuthResult<Option<i32>> {
        Ok(self.users.lock().await.get(&id).map(|u| u.token_version))
    }

    async fn set_password_hash(&self, id: UserId, password_hash: &str) -> AuthResult<()> {
        let mut users = self.users.lock().await;
        if let Some(user) = users.get_mut(&id) {
            user.password_hash = password_hash.to_string();
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_email_verified(&self, id: UserId, at: DateTime<Utc>) -> AuthResult<()> {
        let mut users = self.users.lock().await;
        if let Some(user) = users.get_mut(&id) {
            if user.email_verified_at.is_none() {
                user.email_verified_at = Some(at);
                user.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn set_last_login(&self, id: UserId, at: DateTime<Utc>) -> AuthResult<()> {
        let mut users = self.users.lock().await;
        if let Some(user) = users.get_mut(&id) {
            user.last_login_at = Some(at);
        }
        Ok(())
    }
}

/// In-memory verification-token store.
#[derive(Debug, Clone, Default)]
pub struct MemoryVerificationTokenStore {
    /// Tokens keyed by ID.
    tokens: Arc<Mutex<HashMap<VerificationTokenId, VerificationToken>>>,
}

impl MemoryVerificationTokenStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VerificationTokenStore for MemoryVerificationTokenStore {
    async fn save(&self, token: &VerificationToken) -> AuthResult<()> {
        self.tokens.lock().await.insert(token.id, token.clone());
        Ok(())
    }

    async fn find_by_secret(&self, secret: &str) -> AuthResult<Option<VerificationToken>> {
        let tokens = self.tokens.lock().await;
        Ok(tokens.values().find(|t| t.secret == secret).cloned())
    }

    async fn mark_used_if_unused(&self, id: VerificationTokenId) -> AuthResult<bool> {
        let mut tokens = self.tokens.lock().await;
        match tokens.get_mut(&id) {
            Some(token) if token.used_at.is_none() => {
                token.used_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn invalidate_unused_for_owner(
        &self,
        owner_id: UserId,
        purpose: TokenPurpose,
    ) -> AuthResult<u64> {
        let mut tokens = self.tokens.lock().await;
        let now = Utc::now();
        let mut invalidated = 0u64;
        for token in tokens.values_mut() {
            if token.owner_id == owner_id && token.purpose == purpose && token.used_at.is_none() {
                token.used_at = Some(now);
                invalidated += 1;
            }
        }
        Ok(invalidated)
    }

    async fn delete_stale(&self, cutoff: DateTime<Utc>) -> AuthResult<u64> {
        let mut tokens = self.tokens.lock().await;
        let before = tokens.len();
        tokens.retain(|_, t| {
            let stale_expiry = t.expires_at < cutoff;
            let stale_use = t.used_at.is_some_and(|at| at < cutoff);
            !(stale_expiry || stale_use)
        });
        Ok((before - tokens.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use moneta_entity::token::DeviceMetadata;

    fn record(owner_id: UserId, family_id: FamilyId, hash: &str) -> RefreshTokenRecord {
        RefreshTokenRecord {
            id: SessionId::new(),
            owner_id,
            family_id,
            token_hash: hash.to_string(),
            device: DeviceMetadata::default(),
            expires_at: Utc::now() + Duration::days(7),
            revoked_at: None,
            revoked_reason: None,
            created_at: Utc::now(),
            last_used_at: None,
        }
    }

    #[tokio::test]
    async fn test_revoke_if_active_claims_exactly_once() {
        let store = MemoryRefreshTokenStore::new();
        let rec = record(UserId::new(), FamilyId::new(), "h1");
        store.save(&rec).await.unwrap();

        assert!(
            store
                .revoke_if_active(rec.id, RevocationReason::Rotated)
                .await
                .unwrap()
        );
        assert!(
            !store
                .revoke_if_active(rec.id, RevocationReason::Rotated)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_revoke_family_skips_already_revoked() {
        let store = MemoryRefreshTokenStore::new();
        let owner = UserId::new();
        let family = FamilyId::new();
        let a = record(owner, family, "a");
        let b = record(owner, family, "b");
        store.save(&a).await.unwrap();
        store.save(&b).await.unwrap();

        store
            .revoke_if_active(a.id, RevocationReason::Rotated)
            .await
            .unwrap();

        let revoked = store
            .revoke_family(family, RevocationReason::ReuseDetected)
            .await
            .unwrap();
        assert_eq!(revoked, 1);

        // Idempotent: nothing left to revoke.
        let again = store
            .revoke_family(family, RevocationReason::ReuseDetected)
            .await
            .unwrap();
        assert_eq!(again, 0);
    }

    #[tokio::test]
    async fn test_oldest_active_ignores_revoked_and_expired() {
        let store = MemoryRefreshTokenStore::new();
        let owner = UserId::new();

        let mut expired = record(owner, FamilyId::new(), "old");
        expired.created_at = Utc::now() - Duration::days(10);
        expired.expires_at = Utc::now() - Duration::days(3);
        store.save(&expired).await.unwrap();

        let mut older = record(owner, FamilyId::new(), "older");
        older.created_at = Utc::now() - Duration::days(2);
        store.save(&older).await.unwrap();

        let newer = record(owner, FamilyId::new(), "newer");
        store.save(&newer).await.unwrap();

        let oldest = store
            .find_oldest_active_for_owner(owner)
            .await
            .unwrap()
            .expect("some record");
        assert_eq!(oldest.id, older.id);
    }

    #[tokio::test]
    async fn test_delete_expired_keeps_recent_revocations() {
        let store = MemoryRefreshTokenStore::new();
        let owner = UserId::new();

        let mut stale = record(owner, FamilyId::new(), "stale");
        stale.expires_at = Utc::now() - Duration::days(60);
        store.save(&stale).await.unwrap();

        let fresh_revoked = record(owner, FamilyId::new(), "revoked");
        store.save(&fresh_revoked).await.unwrap();
        store
            .revoke_if_active(fresh_revoked.id, RevocationReason::Logout)
            .await
            .unwrap();

        let deleted = store
            .delete_expired(Utc::now() - Duration::days(30))
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert!(store.find_by_id(fresh_revoked.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_mark_used_if_unused_claims_exactly_once() {
        let store = MemoryVerificationTokenStore::new();
        let token = VerificationToken {
            id: VerificationTokenId::new(),
            owner_id: UserId::new(),
            secret: "s".to_string(),
            purpose: TokenPurpose::PasswordReset,
            expires_at: Utc::now() + Duration::hours(1),
            used_at: None,
            created_at: Utc::now(),
        };
        store.save(&token).await.unwrap();

        assert!(store.mark_used_if_unused(token.id).await.unwrap());
        assert!(!store.mark_used_if_unused(token.id).await.unwrap());
    }
}
