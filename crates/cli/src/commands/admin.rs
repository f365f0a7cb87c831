//! Admin account management commands.
//!
//! This is the only way to create the first admin: registration through the
//! API requires an existing admin.

use sqlx::PgPool;

use sweet_shop_core::{Email, Role, Username};
use sweet_shop_storefront::db::PgStorage;
use sweet_shop_storefront::services::auth::{create_account, validate_password};

use super::CommandError;

/// Create a new admin account.
///
/// # Returns
///
/// The ID of the created account.
///
/// # Errors
///
/// Returns `CommandError::InvalidArgument` for a malformed username, email or
/// password, and `CommandError::Account` if the email or username is taken.
pub async fn create(
    pool: &PgPool,
    username: &str,
    email: &str,
    password: &str,
) -> Result<i32, CommandError> {
    let username = Username::parse(username).map_err(|e| CommandError::InvalidArgument {
        field: "username",
        message: e.to_string(),
    })?;
    let email = Email::parse(email).map_err(|e| CommandError::InvalidArgument {
        field: "email",
        message: e.to_string(),
    })?;
    validate_password(password).map_err(|message| CommandError::InvalidArgument {
        field: "password",
        message,
    })?;

    tracing::info!("Creating admin account: {} ({})", username, email);

    let storage = PgStorage::new(pool.clone());
    let account = create_account(&storage, username, email, password, Role::Admin).await?;

    tracing::info!(
        "Admin account created successfully! ID: {}, Username: {}",
        account.id,
        account.username
    );
    Ok(account.id.as_i32())
}
