//! The rotation engine: login, refresh rotation, reuse detection, and
//! account-wide revocation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use moneta_core::config::tokens::TokenConfig;
use moneta_core::error::AuthError;
use moneta_core::result::AuthResult;
use moneta_core::types::{FamilyId, SessionId, UserId};
use moneta_entity::token::{DeviceMetadata, RefreshTokenRecord, RevocationReason};
use moneta_entity::user::User;
use moneta_entity::verification::TokenPurpose;

use crate::email::EmailSender;
use crate::jwt::{Claims, JwtDecoder, JwtEncoder};
use crate::lockout::LockoutTracker;
use crate::password::PasswordHasher;
use crate::store::{AccountStore, RefreshTokenStore};
use crate::token::{RefreshSecret, generate_opaque_token};
use crate::verification::VerificationTokenIssuer;

use super::limiter::SessionLimiter;

/// Result of a successful login or rotation.
///
/// The refresh secret exists only here and in the client's hands; it is
/// never persisted or logged.
#[derive(Debug)]
pub struct IssuedTokens {
    /// Signed access token.
    pub access_token: String,
    /// Access-token expiry.
    pub access_expires_at: DateTime<Utc>,
    /// The opaque refresh secret, handed to the client exactly once.
    pub refresh_secret: RefreshSecret,
    /// Refresh-token expiry.
    pub refresh_expires_at: DateTime<Utc>,
    /// The session created by this issuance.
    pub session_id: SessionId,
}

/// Drives the refresh-token state machine.
///
/// Every record moves `ACTIVE → ROTATED | REVOKED | EXPIRED`, all terminal
/// for that record. What a subsequent presentation of the same secret means
/// depends on which terminal state it is in: a revoked record presented
/// again proves replay of an already-exchanged secret, and the whole family
/// is revoked before the error is returned; the caller cannot forget the
/// cleanup because it has already happened.
#[derive(Clone)]
pub struct SessionManager {
    /// Access-token minting.
    encoder: JwtEncoder,
    /// Access-token verification.
    decoder: JwtDecoder,
    /// Refresh-token persistence.
    refresh_store: Arc<dyn RefreshTokenStore>,
    /// Account persistence.
    accounts: Arc<dyn AccountStore>,
    /// Password capability.
    hasher: PasswordHasher,
    /// Concurrent-session cap enforcement.
    limiter: SessionLimiter,
    /// Failed-attempt bookkeeping.
    lockout: LockoutTracker,
    /// Verification/reset token issuance.
    verification: VerificationTokenIssuer,
    /// Outbound mail, fire-and-forget.
    mailer: Arc<dyn EmailSender>,
    /// Token lifetimes.
    config: TokenConfig,
    /// Hash verified on the unknown-account path so lookup misses cost the
    /// same as a wrong password.
    dummy_password_hash: String,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .finish()
    }
}

impl SessionManager {
    /// Creates a new session manager with all required dependencies.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        encoder: JwtEncoder,
        decoder: JwtDecoder,
        refresh_store: Arc<dyn RefreshTokenStore>,
        accounts: Arc<dyn AccountStore>,
        hasher: PasswordHasher,
        limiter: SessionLimiter,
        lockout: LockoutTracker,
        verification: VerificationTokenIssuer,
        mailer: Arc<dyn EmailSender>,
        config: TokenConfig,
    ) -> AuthResult<Self> {
        let dummy_password_hash = hasher.hash_password(&generate_opaque_token())?;

        Ok(Self {
            encoder,
            decoder,
            refresh_store,
            accounts,
            hasher,
            limiter,
            lockout,
            verification,
            mailer,
            config,
            dummy_password_hash,
        })
    }

    /// Performs the complete login flow:
    ///
    /// 1. Find the account
    /// 2. Lockout gate (no password comparison while locked)
    /// 3. Verify the password, with failed-attempt bookkeeping
    /// 4. Start a new token family and issue the first pair
    ///
    /// Unknown account and wrong password are indistinguishable to the
    /// caller, in both result and timing.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
        device: DeviceMetadata,
    ) -> AuthResult<IssuedTokens> {
        // Step 1: Find the account
        let Some(user) = self.accounts.find_by_email(email).await? else {
            // Burn a verification anyway so a lookup miss is not observable
            // through response timing.
            let _ = self.hasher.verify_password(password, &self.dummy_password_hash);
            return Err(AuthError::InvalidCredentials);
        };

        // Step 2: Lockout gate
        self.lockout.check(&user).await?;

        if !user.status.can_login() {
            return Err(AuthError::InvalidCredentials);
        }

        // Step 3: Verify the password
        if !self.hasher.verify_password(password, &user.password_hash)? {
            self.lockout.record_failure(user.id).await?;
            return Err(AuthError::InvalidCredentials);
        }

        self.lockout.record_success(&user).await?;
        let _ = self.accounts.set_last_login(user.id, Utc::now()).await;

        // Step 4: Issue the first pair in a fresh family
        let issued = self.issue_first(&user, remember_me, device).await?;

        info!(
            user_id = %user.id,
            session_id = %issued.session_id,
            "Login successful"
        );

        Ok(issued)
    }

    /// Starts a brand-new token family for an already-authenticated account.
    ///
    /// This is the login-time entry point, distinguished from rotation only
    /// by family creation.
    pub async fn issue_first(
        &self,
        user: &User,
        remember_me: bool,
        device: DeviceMetadata,
    ) -> AuthResult<IssuedTokens> {
        self.issue_in_family(user, FamilyId::new(), remember_me, device)
            .await
    }

    /// Exchanges a presented refresh secret for a fresh token pair.
    ///
    /// State classification, in order:
    /// - unknown hash → `InvalidToken`
    /// - revoked (for any reason, even if also expired) → reuse: the whole
    ///   family is revoked, then `TokenReuse`
    /// - expired but never rotated → `TokenExpired`; the record is left
    ///   as-is, since no successor exists there is nothing to revoke
    /// - active → the record is claimed and a successor is issued in the
    ///   same family
    pub async fn rotate(
        &self,
        presented_secret: &str,
        remember_me: bool,
        device: DeviceMetadata,
    ) -> AuthResult<IssuedTokens> {
        let hash = RefreshSecret::from_presented(presented_secret).lookup_hash();

        let Some(record) = self.refresh_store.find_by_hash(&hash).await? else {
            return Err(AuthError::InvalidToken);
        };

        if record.is_revoked() {
            return self.handle_reuse(&record).await;
        }

        if record.is_expired() {
            return Err(AuthError::TokenExpired);
        }

        // Claim the record. Losing this update means a concurrent rotation
        // consumed it first; the engine cannot tell that apart from replay
        // and must assume the worst.
        if !self
            .refresh_store
            .revoke_if_active(record.id, RevocationReason::Rotated)
            .await?
        {
            return self.handle_reuse(&record).await;
        }

        let user = self
            .accounts
            .find_by_id(record.owner_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        let issued = self
            .issue_in_family(&user, record.family_id, remember_me, device)
            .await?;

        info!(
            user_id = %user.id,
            old_session = %record.id,
            new_session = %issued.session_id,
            family_id = %record.family_id,
            "Refresh token rotated"
        );

        Ok(issued)
    }

    /// Verifies an access token, including the token-version cross-check
    /// against the account's current generation.
    pub async fn verify_access(&self, token: &str) -> AuthResult<Claims> {
        let claims = self.decoder.verify_access_token(token)?;

        let current = self
            .accounts
            .token_version(claims.sub)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if claims.ver != current {
            return Err(AuthError::InvalidToken);
        }

        Ok(claims)
    }

    /// Revokes a single session (logout). Idempotent.
    pub async fn revoke_one(&self, session_id: SessionId) -> AuthResult<()> {
        let revoked = self
            .refresh_store
            .revoke_if_active(session_id, RevocationReason::Logout)
            .await?;

        if revoked {
            info!(session_id = %session_id, "Session revoked");
        }

        Ok(())
    }

    /// Revokes every session for an account (logout-all) and bumps the
    /// token version so already-issued access tokens die immediately,
    /// without touching the refresh store again.
    pub async fn revoke_all_for_owner(&self, owner_id: UserId) -> AuthResult<()> {
        let revoked = self
            .refresh_store
            .revoke_all_for_owner(owner_id, RevocationReason::LogoutAll)
            .await?;
        let token_version = self.accounts.bump_token_version(owner_id).await?;

        info!(
            owner_id = %owner_id,
            revoked,
            token_version,
            "All sessions revoked"
        );

        Ok(())
    }

    /// Lists the account's active sessions for the security settings view.
    pub async fn list_sessions(&self, owner_id: UserId) -> AuthResult<Vec<RefreshTokenRecord>> {
        self.refresh_store.find_active_for_owner(owner_id).await
    }

    /// Issues a password-reset token and mails it to the account.
    ///
    /// Always succeeds from the caller's perspective; an unknown email is
    /// indistinguishable from a delivered reset link.
    pub async fn request_password_reset(&self, email: &str) -> AuthResult<()> {
        let Some(user) = self.accounts.find_by_email(email).await? else {
            return Ok(());
        };

        let issued = self
            .verification
            .issue(user.id, TokenPurpose::PasswordReset)
            .await?;

        self.send_mail_detached(
            user.email.clone(),
            "Reset your password".to_string(),
            format!(
                "Use this code to reset your password: {}\nIt expires at {}.",
                issued.secret, issued.expires_at
            ),
        );

        Ok(())
    }

    /// Consumes a reset token and installs the new password.
    ///
    /// Every outstanding credential dies with the old password: the token
    /// version is bumped and every refresh token is revoked.
    pub async fn reset_password(&self, reset_secret: &str, new_password: &str) -> AuthResult<()> {
        let owner_id = self
            .verification
            .consume(reset_secret, TokenPurpose::PasswordReset)
            .await?;

        let password_hash = self.hasher.hash_password(new_password)?;
        self.accounts
            .set_password_hash(owner_id, &password_hash)
            .await?;
        self.accounts.reset_failed_attempts(owner_id).await?;
        self.accounts.bump_token_version(owner_id).await?;
        self.refresh_store
            .revoke_all_for_owner(owner_id, RevocationReason::PasswordReset)
            .await?;

        info!(owner_id = %owner_id, "Password reset, all sessions revoked");

        Ok(())
    }

    /// Issues an email-verification token and mails it to the account.
    pub async fn request_email_verification(&self, owner_id: UserId) -> AuthResult<()> {
        let user = self
            .accounts
            .find_by_id(owner_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let issued = self
            .verification
            .issue(user.id, TokenPurpose::EmailVerification)
            .await?;

        self.send_mail_detached(
            user.email.clone(),
            "Verify your email address".to_string(),
            format!(
                "Use this code to verify your email address: {}\nIt expires at {}.",
                issued.secret, issued.expires_at
            ),
        );

        Ok(())
    }

    /// Consumes a verification token and marks the account's email verified.
    pub async fn verify_email(&self, secret: &str) -> AuthResult<UserId> {
        let owner_id = self
            .verification
            .consume(secret, TokenPurpose::EmailVerification)
            .await?;
        self.accounts.set_email_verified(owner_id, Utc::now()).await?;
        info!(owner_id = %owner_id, "Email address verified");
        Ok(owner_id)
    }

    /// Reuse response: revoke the entire family (idempotent), notify the
    /// owner out of band, and fail with the distinguished error. The
    /// attacker-facing result carries nothing beyond `TokenReuse`.
    async fn handle_reuse(&self, record: &RefreshTokenRecord) -> AuthResult<IssuedTokens> {
        let revoked = self
            .refresh_store
            .revoke_family(record.family_id, RevocationReason::ReuseDetected)
            .await?;

        warn!(
            owner_id = %record.owner_id,
            family_id = %record.family_id,
            revoked,
            "Revoked refresh token presented again; family revoked"
        );

        self.notify_reuse(record.owner_id);

        Err(AuthError::TokenReuse)
    }

    /// Creates a record in the given family and mints the access token.
    async fn issue_in_family(
        &self,
        user: &User,
        family_id: FamilyId,
        remember_me: bool,
        device: DeviceMetadata,
    ) -> AuthResult<IssuedTokens> {
        self.limiter.enforce(user.id).await?;

        let (refresh_secret, token_hash) = RefreshSecret::generate();
        let ttl_days = if remember_me {
            self.config.remember_me_ttl_days
        } else {
            self.config.refresh_ttl_days
        };

        let now = Utc::now();
        let record = RefreshTokenRecord {
            id: SessionId::new(),
            owner_id: user.id,
            family_id,
            token_hash,
            device,
            expires_at: now + chrono::Duration::days(ttl_days as i64),
            revoked_at: None,
            revoked_reason: None,
            created_at: now,
            last_used_at: None,
        };
        self.refresh_store.save(&record).await?;

        let (access_token, access_expires_at) =
            self.encoder
                .mint_access_token(user.id, record.id, user.token_version)?;

        Ok(IssuedTokens {
            access_token,
            access_expires_at,
            refresh_secret,
            refresh_expires_at: record.expires_at,
            session_id: record.id,
        })
    }

    /// Mails the owner that their sessions were terminated after a replay.
    /// Fire-and-forget: delivery failure is logged, never surfaced.
    fn notify_reuse(&self, owner_id: UserId) {
        let accounts = Arc::clone(&self.accounts);
        let mailer = Arc::clone(&self.mailer);

        tokio::spawn(async move {
            let email = match accounts.find_by_id(owner_id).await {
                Ok(Some(user)) => user.email,
                Ok(None) => return,
                Err(e) => {
                    error!(owner_id = %owner_id, error = %e, "Failed to load account for reuse notification");
                    return;
                }
            };

            if let Err(e) = mailer
                .send(
                    &email,
                    "Your sessions were signed out",
                    "A sign-in credential for your account was used in a way that \
                     suggests it may have been copied. All sessions have been signed \
                     out; please sign in again and consider changing your password.",
                )
                .await
            {
                error!(owner_id = %owner_id, error = %e, "Failed to send reuse notification");
            }
        });
    }

    /// Dispatches a message without blocking or failing the caller.
    fn send_mail_detached(&self, to: String, subject: String, body: String) {
        let mailer = Arc::clone(&self.mailer);
        tokio::spawn(async move {
            if let Err(e) = mailer.send(&to, &subject, &body).await {
                error!(error = %e, "Failed to send email");
            }
        });
    }
}
