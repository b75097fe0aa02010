//! Result alias used across the workspace.

use crate::error::AuthError;

/// Convenience alias for results carrying [`AuthError`].
pub type AuthResult<T> = Result<T, AuthError>;
