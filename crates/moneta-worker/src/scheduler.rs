//! Cron scheduler for periodic maintenance tasks.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing::{error, info};

use moneta_auth::session::TokenSweeper;
use moneta_core::config::sweeper::SweeperConfig;
use moneta_core::error::AuthError;

/// Cron-based scheduler for periodic background tasks.
pub struct MaintenanceScheduler {
    /// The underlying job scheduler.
    scheduler: JobScheduler,
    /// Sweeper configuration.
    config: SweeperConfig,
}

impl std::fmt::Debug for MaintenanceScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaintenanceScheduler")
            .field("config", &self.config)
            .finish()
    }
}

impl MaintenanceScheduler {
    /// Create a new scheduler.
    pub async fn new(config: SweeperConfig) -> Result<Self, AuthError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AuthError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self { scheduler, config })
    }

    /// Register the token sweep on the configured schedule.
    pub async fn register_token_sweep(&self, sweeper: Arc<TokenSweeper>) -> Result<(), AuthError> {
        if !self.config.enabled {
            info!("Token sweep disabled by configuration");
            return Ok(());
        }

        let job = CronJob::new_async(self.config.schedule.as_str(), move |_uuid, _lock| {
            let sweeper = Arc::clone(&sweeper);
            Box::pin(async move {
                match sweeper.run_sweep().await {
                    Ok(report) => {
                        if report.refresh_deleted > 0 || report.verification_deleted > 0 {
                            info!(
                                refresh_deleted = report.refresh_deleted,
                                verification_deleted = report.verification_deleted,
                                "Scheduled token sweep finished"
                            );
                        }
                    }
                    Err(e) => error!(error = %e, "Scheduled token sweep failed"),
                }
            })
        })
        .map_err(|e| AuthError::internal(format!("Failed to create sweep schedule: {e}")))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AuthError::internal(format!("Failed to add sweep schedule: {e}")))?;

        info!(schedule = %self.config.schedule, "Registered: token_sweep");
        Ok(())
    }

    /// Start the scheduler.
    pub async fn start(&self) -> Result<(), AuthError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AuthError::internal(format!("Failed to start scheduler: {e}")))?;

        info!("Maintenance scheduler started");
        Ok(())
    }

    /// Shut the scheduler down.
    pub async fn shutdown(&mut self) -> Result<(), AuthError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AuthError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        info!("Maintenance scheduler shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moneta_auth::store::{MemoryRefreshTokenStore, MemoryVerificationTokenStore};

    #[tokio::test]
    async fn test_register_and_shutdown() {
        let sweeper = Arc::new(TokenSweeper::new(
            Arc::new(MemoryRefreshTokenStore::new()),
            Arc::new(MemoryVerificationTokenStore::new()),
            SweeperConfig::default(),
        ));

        let mut scheduler = MaintenanceScheduler::new(SweeperConfig::default())
            .await
            .expect("scheduler");
        scheduler
            .register_token_sweep(sweeper)
            .await
            .expect("register");
        scheduler.start().await.expect("start");
        scheduler.shutdown().await.expect("shutdown");
    }

    #[tokio::test]
    async fn test_disabled_sweep_registers_nothing() {
        let sweeper = Arc::new(TokenSweeper::new(
            Arc::new(MemoryRefreshTokenStore::new()),
            Arc::new(MemoryVerificationTokenStore::new()),
            SweeperConfig::default(),
        ));

        let config = SweeperConfig {
            enabled: false,
            ..SweeperConfig::default()
        };
        let scheduler = MaintenanceScheduler::new(config).await.expect("scheduler");
        scheduler
            .register_token_sweep(sweeper)
            .await
            .expect("register");
    }
}
