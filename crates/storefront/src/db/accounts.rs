//! Account repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use sweet_shop_core::{AccountId, Email, Role, Username};

use super::{RepositoryError, conflict_or_database};
use crate::models::{Account, NewAccount};

/// Conflict field reported when the email is already registered.
pub const EMAIL_FIELD: &str = "email";
/// Conflict field reported when the username is already taken.
pub const USERNAME_FIELD: &str = "username";

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: i32,
    username: String,
    email: String,
    role: Role,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    account: AccountRow,
    password_hash: String,
}

impl TryFrom<AccountRow> for Account {
    type Error = RepositoryError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let username = Username::parse(&row.username).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid username in database: {e}"))
        })?;

        Ok(Self {
            id: AccountId::new(row.id),
            username,
            email,
            role: row.role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn field_for_constraint(constraint: &str) -> Option<&'static str> {
    match constraint {
        "account_email_key" => Some(EMAIL_FIELD),
        "account_username_key" => Some(USERNAME_FIELD),
        _ => None,
    }
}

/// Repository for account database operations.
pub struct AccountRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AccountRepository<'a> {
    /// Create a new account repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an account by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(
            r"
            SELECT id, username, email, role, created_at, updated_at
            FROM storefront.account
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(Account::try_from).transpose()
    }

    /// Get an account and its password hash for login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(Account, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r"
            SELECT id, username, email, role, created_at, updated_at, password_hash
            FROM storefront.account
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some((Account::try_from(r.account)?, r.password_hash))),
            None => Ok(None),
        }
    }

    /// Create a new account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` naming the duplicated field.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, account: &NewAccount) -> Result<Account, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(
            r"
            INSERT INTO storefront.account (username, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, role, created_at, updated_at
            ",
        )
        .bind(account.username.as_str())
        .bind(account.email.as_str())
        .bind(&account.password_hash)
        .bind(account.role)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_or_database(e, field_for_constraint))?;

        Account::try_from(row)
    }

    /// List all accounts, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Account>, RepositoryError> {
        let rows = sqlx::query_as::<_, AccountRow>(
            r"
            SELECT id, username, email, role, created_at, updated_at
            FROM storefront.account
            ORDER BY id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Account::try_from).collect()
    }

    /// Count stored accounts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM storefront.account")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}
