//! Email dispatch contract.
//!
//! Delivery is an external collaborator. Call sites are fire-and-forget:
//! failures are logged and never fail the operation that triggered them.

use async_trait::async_trait;
use tracing::debug;

use moneta_core::result::AuthResult;

/// Sends a single email.
#[async_trait]
pub trait EmailSender: Send + Sync + 'static {
    /// Dispatch a message. Implementations should be quick to fail; callers
    /// do not retry.
    async fn send(&self, to: &str, subject: &str, body: &str) -> AuthResult<()>;
}

/// An [`EmailSender`] that logs instead of sending. Used in tests and in
/// deployments without an outbound mail path.
#[derive(Debug, Clone, Default)]
pub struct NoopEmailSender;

#[async_trait]
impl EmailSender for NoopEmailSender {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> AuthResult<()> {
        debug!(to = %to, subject = %subject, "Email dispatch skipped (noop sender)");
        Ok(())
    }
}
