//! Concurrent-session configuration.

use serde::{Deserialize, Serialize};

/// Per-account session limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum active sessions per account. Issuing a session at the cap
    /// evicts the oldest active one rather than rejecting the new login.
    #[serde(default = "default_max_sessions")]
    pub max_sessions_per_user: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions_per_user: default_max_sessions(),
        }
    }
}

fn default_max_sessions() -> u32 {
    5
}
