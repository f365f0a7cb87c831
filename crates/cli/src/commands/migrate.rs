//! Database migration commands.
//!
//! Migrations live in `crates/storefront/migrations/` and are embedded at
//! compile time. The server never runs them on startup.

use sqlx::PgPool;

use super::CommandError;

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns `CommandError::Migration` if a migration fails to apply.
pub async fn storefront(pool: &PgPool) -> Result<(), CommandError> {
    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(pool).await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}
