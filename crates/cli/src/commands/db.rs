//! Database diagnostics.

use sqlx::PgPool;

use sweet_shop_storefront::db::accounts::AccountRepository;
use sweet_shop_storefront::db::carts::CartRepository;
use sweet_shop_storefront::db::sweets::SweetRepository;

use super::CommandError;

/// Verify connectivity and report table counts.
///
/// # Errors
///
/// Returns `CommandError::Database` if the database is unreachable and
/// `CommandError::Repository` if the schema is missing.
pub async fn check(pool: &PgPool) -> Result<(), CommandError> {
    let version: String = sqlx::query_scalar("SELECT version()")
        .fetch_one(pool)
        .await?;
    tracing::info!("Connected: {}", version);

    let accounts = AccountRepository::new(pool).count().await?;
    let sweets = SweetRepository::new(pool).count().await?;
    let carts = CartRepository::new(pool).count_active().await?;

    tracing::info!("Accounts: {}", accounts);
    tracing::info!("Sweets: {}", sweets);
    tracing::info!("Non-empty carts: {}", carts);
    Ok(())
}
