//! Shared harness for integration tests: a session manager wired to the
//! in-memory stores.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use moneta_auth::email::EmailSender;
use moneta_auth::jwt::{JwtDecoder, JwtEncoder};
use moneta_auth::lockout::LockoutTracker;
use moneta_auth::password::PasswordHasher;
use moneta_auth::session::{SessionLimiter, SessionManager};
use moneta_auth::store::{
    MemoryAccountStore, MemoryRefreshTokenStore, MemoryVerificationTokenStore,
};
use moneta_auth::verification::VerificationTokenIssuer;
use moneta_core::config::lockout::LockoutConfig;
use moneta_core::config::session::SessionConfig;
use moneta_core::config::tokens::TokenConfig;
use moneta_core::result::AuthResult;
use moneta_core::types::UserId;
use moneta_entity::user::{User, UserStatus};

/// An [`EmailSender`] that records every message for assertions.
#[derive(Debug, Clone, Default)]
pub struct RecordingEmailSender {
    messages: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingEmailSender {
    pub async fn sent(&self) -> Vec<(String, String)> {
        self.messages.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> AuthResult<()> {
        self.messages
            .lock()
            .await
            .push((to.to_string(), subject.to_string()));
        Ok(())
    }
}

pub struct TestApp {
    pub manager: SessionManager,
    pub accounts: Arc<MemoryAccountStore>,
    pub refresh: Arc<MemoryRefreshTokenStore>,
    pub verification: VerificationTokenIssuer,
    pub mailer: RecordingEmailSender,
    pub hasher: PasswordHasher,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(LockoutConfig::default(), SessionConfig::default())
    }

    pub fn with_config(lockout: LockoutConfig, session: SessionConfig) -> Self {
        let tokens = TokenConfig {
            jwt_secret: "integration-test-secret".to_string(),
            ..TokenConfig::default()
        };

        let accounts = Arc::new(MemoryAccountStore::new());
        let refresh = Arc::new(MemoryRefreshTokenStore::new());
        let verification_store = Arc::new(MemoryVerificationTokenStore::new());
        let mailer = RecordingEmailSender::default();
        let hasher = PasswordHasher::new();

        let verification = VerificationTokenIssuer::new(verification_store, tokens.clone());
        let manager = SessionManager::new(
            JwtEncoder::new(&tokens),
            JwtDecoder::new(&tokens),
            refresh.clone(),
            accounts.clone(),
            hasher.clone(),
            SessionLimiter::new(refresh.clone(), session),
            LockoutTracker::new(accounts.clone(), lockout),
            verification.clone(),
            Arc::new(mailer.clone()),
            tokens,
        )
        .expect("manager");

        Self {
            manager,
            accounts,
            refresh,
            verification,
            mailer,
            hasher,
        }
    }

    pub async fn seed_user(&self, email: &str, password: &str) -> User {
        let user = User {
            id: UserId::new(),
            email: email.to_string(),
            password_hash: self.hasher.hash_password(password).expect("hash"),
            status: UserStatus::Active,
            email_verified_at: None,
            failed_login_attempts: 0,
            locked_until: None,
            token_version: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        };
        self.accounts.insert(user.clone()).await;
        user
    }
}
