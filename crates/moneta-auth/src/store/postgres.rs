//! Postgres-backed store implementations wrapping the database repositories.
//!
//! Per-record serialisation comes from the repositories' conditional
//! `UPDATE ... WHERE revoked_at IS NULL` statements; these wrappers only
//! supply timestamps and adapt signatures.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use moneta_core::result::AuthResult;
use moneta_core::types::{FamilyId, SessionId, UserId, VerificationTokenId};
use moneta_database::repositories::{
    RefreshTokenRepository, UserRepository, VerificationTokenRepository,
};
use moneta_entity::token::{RefreshTokenRecord, RevocationReason};
use moneta_entity::user::User;
use moneta_entity::verification::{TokenPurpose, VerificationToken};

use super::{AccountStore, RefreshTokenStore, VerificationTokenStore};

/// Postgres-backed refresh-token store.
#[derive(Debug, Clone)]
pub struct PostgresRefreshTokenStore {
    repo: Arc<RefreshTokenRepository>,
}

impl PostgresRefreshTokenStore {
    /// Creates a store over the given repository.
    pub fn new(repo: Arc<RefreshTokenRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl RefreshTokenStore for PostgresRefreshTokenStore {
    async fn save(&self, record: &RefreshTokenRecord) -> AuthResult<()> {
        self.repo.insert(record).await
    }

    async fn find_by_hash(&self, token_hash: &str) -> AuthResult<Option<RefreshTokenRecord>> {
        self.repo.find_by_hash(token_hash).await
    }

    async fn find_by_id(&self, id: SessionId) -> AuthResult<Option<RefreshTokenRecord>> {
        self.repo.find_by_id(id).await
    }

    async fn revoke_if_active(&self, id: SessionId, reason: RevocationReason) -> AuthResult<bool> {
        self.repo.revoke_if_active(id, reason, Utc::now()).await
    }

    async fn revoke_family(
        &self,
        family_id: FamilyId,
        reason: RevocationReason,
    ) -> AuthResult<u64> {
        self.repo.revoke_family(family_id, reason, Utc::now()).await
    }

    async fn revoke_all_for_owner(
        &self,
        owner_id: UserId,
        reason: RevocationReason,
    ) -> AuthResult<u64> {
        self.repo
            .revoke_all_for_owner(owner_id, reason, Utc::now())
            .await
    }

    async fn count_active_for_owner(&self, owner_id: UserId) -> AuthResult<i64> {
        self.repo.count_active_for_owner(owner_id).await
    }

    async fn find_oldest_active_for_owner(
        &self,
        owner_id: UserId,
    ) -> AuthResult<Option<RefreshTokenRecord>> {
        self.repo.find_oldest_active_for_owner(owner_id).await
    }

    async fn find_active_for_owner(
        &self,
        owner_id: UserId,
    ) -> AuthResult<Vec<RefreshTokenRecord>> {
        self.repo.find_active_for_owner(owner_id).await
    }

    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> AuthResult<u64> {
        self.repo.delete_expired(cutoff).await
    }
}

/// Postgres-backed account store.
#[derive(Debug, Clone)]
pub struct PostgresAccountStore {
    repo: Arc<UserRepository>,
}

impl PostgresAccountStore {
    /// Creates a store over the given repository.
    pub fn new(repo: Arc<UserRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl AccountStore for PostgresAccountStore {
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        self.repo.find_by_email(email).await
    }

    async fn find_by_id(&self, id: UserId) -> AuthResult<Option<User>> {
        self.repo.find_by_id(id).await
    }

    async fn increment_failed_attempts(&self, id: UserId) -> AuthResult<i32> {
        self.repo.increment_failed_attempts(id).await
    }

    async fn lock_until(&self, id: UserId, until: DateTime<Utc>) -> AuthResult<()> {
        self.repo.lock_until(id, until).await
    }

    async fn reset_failed_attempts(&self, id: UserId) -> AuthResult<()> {
        self.repo.reset_failed_attempts(id).await
    }

    async fn bump_token_version(&self, id: UserId) -> AuthResult<i32> {
        self.repo.bump_token_version(id).await
    }

    async fn token_version(&self, id: UserId) -> AuthResult<Option<i32>> {
        self.repo.token_version(id).await
    }

    async fn set_password_hash(&self, id: UserId, password_hash: &str) -> AuthResult<()> {
        self.repo.set_password_hash(id, password_hash).await
    }

    async fn set_email_verified(&self, id: UserId, at: DateTime<Utc>) -> AuthResult<()> {
        self.repo.set_email_verified(id, at).await
    }

    async fn set_last_login(&self, id: UserId, at: DateTime<Utc>) -> AuthResult<()> {
        self.repo.set_last_login(id, at).await
    }
}

/// Postgres-backed verification-token store.
#[derive(Debug, Clone)]
pub struct PostgresVerificationTokenStore {
    repo: Arc<VerificationTokenRepository>,
}

impl PostgresVerificationTokenStore {
    /// Creates a store over the given repository.
    pub fn new(repo: Arc<VerificationTokenRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl VerificationTokenStore for PostgresVerificationTokenStore {
    async fn save(&self, token: &VerificationToken) -> AuthResult<()> {
        self.repo.insert(token).await
    }

    async fn find_by_secret(&self, secret: &str) -> AuthResult<Option<VerificationToken>> {
        self.repo.find_by_secret(secret).await
    }

    async fn mark_used_if_unused(&self, id: VerificationTokenId) -> AuthResult<bool> {
        self.repo.mark_used_if_unused(id, Utc::now()).await
    }

    async fn invalidate_unused_for_owner(
        &self,
        owner_id: UserId,
        purpose: TokenPurpose,
    ) -> AuthResult<u64> {
        self.repo
            .invalidate_unused_for_owner(owner_id, purpose, Utc::now())
            .await
    }

    async fn delete_stale(&self, cutoff: DateTime<Utc>) -> AuthResult<u64> {
        self.repo.delete_stale(cutoff).await
    }
}
