//! Persistence traits consumed by the rotation engine.
//!
//! No business logic lives behind these traits; they are storage
//! abstractions so the engine is testable against the in-memory fakes in
//! [`memory`]. The Postgres implementations in [`postgres`] delegate to the
//! `moneta-database` repositories.
//!
//! Concurrency contract: `revoke_if_active` and `mark_used_if_unused` are
//! optimistic claims. Of any number of concurrent callers, exactly one
//! observes `true`; that single guarantee is what keeps two concurrent
//! rotations of the same secret from both succeeding.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use moneta_core::result::AuthResult;
use moneta_core::types::{FamilyId, SessionId, UserId, VerificationTokenId};
use moneta_entity::token::{RefreshTokenRecord, RevocationReason};
use moneta_entity::user::User;
use moneta_entity::verification::{TokenPurpose, VerificationToken};

pub use memory::{MemoryAccountStore, MemoryRefreshTokenStore, MemoryVerificationTokenStore};
pub use postgres::{PostgresAccountStore, PostgresRefreshTokenStore, PostgresVerificationTokenStore};

/// Persistence for refresh-token records, keyed by lookup hash.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync + 'static {
    /// Persist a freshly issued record.
    async fn save(&self, record: &RefreshTokenRecord) -> AuthResult<()>;

    /// Look up a record by its secret's lookup hash.
    async fn find_by_hash(&self, token_hash: &str) -> AuthResult<Option<RefreshTokenRecord>>;

    /// Look up a record by session ID.
    async fn find_by_id(&self, id: SessionId) -> AuthResult<Option<RefreshTokenRecord>>;

    /// Revoke a single record if it is not revoked yet. Returns `true` when
    /// this call performed the revocation; `false` means another caller got
    /// there first (or the record does not exist).
    async fn revoke_if_active(&self, id: SessionId, reason: RevocationReason) -> AuthResult<bool>;

    /// Revoke every unrevoked record in a family. Idempotent; returns the
    /// number of records this call revoked.
    async fn revoke_family(&self, family_id: FamilyId, reason: RevocationReason)
    -> AuthResult<u64>;

    /// Revoke every unrevoked record belonging to an owner.
    async fn revoke_all_for_owner(
        &self,
        owner_id: UserId,
        reason: RevocationReason,
    ) -> AuthResult<u64>;

    /// Count active (unrevoked, unexpired) records for an owner.
    async fn count_active_for_owner(&self, owner_id: UserId) -> AuthResult<i64>;

    /// Find the owner's oldest active record, if any.
    async fn find_oldest_active_for_owner(
        &self,
        owner_id: UserId,
    ) -> AuthResult<Option<RefreshTokenRecord>>;

    /// List the owner's active records, newest first.
    async fn find_active_for_owner(&self, owner_id: UserId)
    -> AuthResult<Vec<RefreshTokenRecord>>;

    /// Delete records expired or revoked before the cutoff. Returns the
    /// number deleted.
    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> AuthResult<u64>;
}

/// Persistence for accounts and their security state.
#[async_trait]
pub trait AccountStore: Send + Sync + 'static {
    /// Find an account by email.
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>>;

    /// Find an account by ID.
    async fn find_by_id(&self, id: UserId) -> AuthResult<Option<User>>;

    /// Atomically increment the failed-login counter; returns the new count.
    async fn increment_failed_attempts(&self, id: UserId) -> AuthResult<i32>;

    /// Set the timed lock on an account.
    async fn lock_until(&self, id: UserId, until: DateTime<Utc>) -> AuthResult<()>;

    /// Clear the failed-login counter and any timed lock.
    async fn reset_failed_attempts(&self, id: UserId) -> AuthResult<()>;

    /// Atomically bump the token-version counter; returns the new version.
    async fn bump_token_version(&self, id: UserId) -> AuthResult<i32>;

    /// Read the account's current token version.
    async fn token_version(&self, id: UserId) -> AuthResult<Option<i32>>;

    /// Replace the stored password hash.
    async fn set_password_hash(&self, id: UserId, password_hash: &str) -> AuthResult<()>;

    /// Mark the account's email as verified.
    async fn set_email_verified(&self, id: UserId, at: DateTime<Utc>) -> AuthResult<()>;

    /// Record a successful login time.
    async fn set_last_login(&self, id: UserId, at: DateTime<Utc>) -> AuthResult<()>;
}

/// Persistence for single-use verification and reset tokens.
#[async_trait]
pub trait VerificationTokenStore: Send + Sync + 'static {
    /// Persist a freshly issued token.
    async fn save(&self, token: &VerificationToken) -> AuthResult<()>;

    /// Look up a token by its secret.
    async fn find_by_secret(&self, secret: &str) -> AuthResult<Option<VerificationToken>>;

    /// Atomically claim a token: mark it used only if still unused. Returns
    /// `true` when this call performed the claim.
    async fn mark_used_if_unused(&self, id: VerificationTokenId) -> AuthResult<bool>;

    /// Invalidate every unused token of a purpose for an owner. Returns the
    /// number invalidated.
    async fn invalidate_unused_for_owner(
        &self,
        owner_id: UserId,
        purpose: TokenPurpose,
    ) -> AuthResult<u64>;

    /// Delete tokens expired or consumed before the cutoff.
    async fn delete_stale(&self, cutoff: DateTime<Utc>) -> AuthResult<u64>;
}
