//! Database migration command.

use jobhub_core::config::AppConfig;
use jobhub_core::error::AppError;
use jobhub_database::DatabasePool;

use crate::output;

/// Apply all pending migrations
pub async fn execute(config: &AppConfig) -> Result<(), AppError> {
    let pool = DatabasePool::connect(&config.database).await?;

    println!("Running database migrations...");
    jobhub_database::migration::run_migrations(pool.pool()).await?;
    pool.close().await;

    output::print_success("All migrations applied successfully.");
    Ok(())
}
