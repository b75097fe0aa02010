//! Database migration runner.

use sqlx::PgPool;
use tracing::info;

use moneta_core::error::AuthError;

/// Run all pending database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AuthError> {
    info!("Running database migrations...");

    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(|e| AuthError::infrastructure("Failed to run migrations", e))?;

    info!("Database migrations completed successfully");
    Ok(())
}
