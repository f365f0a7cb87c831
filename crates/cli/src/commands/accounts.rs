//! Account inspection commands.

use sqlx::PgPool;

use sweet_shop_storefront::db::accounts::AccountRepository;

use super::CommandError;

/// Log every account with its role.
///
/// # Errors
///
/// Returns `CommandError::Repository` if the query fails.
pub async fn list(pool: &PgPool) -> Result<(), CommandError> {
    let accounts = AccountRepository::new(pool).list().await?;

    if accounts.is_empty() {
        tracing::info!("No accounts found");
        return Ok(());
    }

    tracing::info!("{} account(s):", accounts.len());
    for account in accounts {
        tracing::info!(
            "  #{} {} <{}> role={} created={}",
            account.id,
            account.username,
            account.email,
            account.role,
            account.created_at.format("%Y-%m-%d")
        );
    }
    Ok(())
}
