//! Account lockout configuration.

use serde::{Deserialize, Serialize};

/// Failed-login lockout configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockoutConfig {
    /// Consecutive failed login attempts before the account is locked.
    #[serde(default = "default_max_failed")]
    pub max_failed_attempts: i32,
    /// Lock duration in minutes once the threshold is reached.
    #[serde(default = "default_lockout")]
    pub lockout_duration_minutes: u64,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: default_max_failed(),
            lockout_duration_minutes: default_lockout(),
        }
    }
}

fn default_max_failed() -> i32 {
    5
}

fn default_lockout() -> u64 {
    30
}
