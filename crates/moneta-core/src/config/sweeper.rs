//! Expired-record sweeper configuration.

use serde::{Deserialize, Serialize};

/// Settings for the periodic token garbage collector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// Whether the scheduled sweep is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Cron schedule (seconds-resolution, six fields) for the sweep.
    #[serde(default = "default_schedule")]
    pub schedule: String,
    /// How long expired or revoked records are retained before deletion.
    ///
    /// Revoked refresh-token records must outlive their natural expiry so a
    /// replayed secret is still classified as reuse rather than unknown.
    #[serde(default = "default_retention")]
    pub retention_days: u64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            schedule: default_schedule(),
            retention_days: default_retention(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_schedule() -> String {
    "0 */15 * * * *".to_string()
}

fn default_retention() -> u64 {
    30
}
