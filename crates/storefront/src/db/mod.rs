//! Storage for accounts, the catalog and carts.
//!
//! # Database: `storefront` schema
//!
//! ## Tables
//!
//! - `account` - Credentials and role
//! - `sweet` - Catalog records with quantity on hand
//! - `cart` - One row per account
//! - `cart_item` - Cart lines with the captured unit price
//!
//! Services talk to storage through the [`Storage`] trait. [`PgStorage`] is
//! the production implementation; [`memory::MemoryStore`] backs tests.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p sweet-shop-cli -- migrate
//! ```

pub mod accounts;
pub mod carts;
#[cfg(any(test, feature = "test-fixtures"))]
pub mod memory;
pub mod sweets;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use sweet_shop_core::{AccountId, Email, SweetId};

use crate::models::{
    Account, Cart, CartCheckout, NewAccount, NewSweet, RestockOutcome, StockRequest, StockTake,
    Sweet, SweetFilter, SweetPatch,
};

pub use accounts::AccountRepository;
pub use carts::CartRepository;
pub use sweets::SweetRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation. Carries the name of the violated field.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Account persistence.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Store a new account.
    ///
    /// Returns `RepositoryError::Conflict` naming [`accounts::EMAIL_FIELD`] or
    /// [`accounts::USERNAME_FIELD`] when either is already taken.
    async fn insert_account(&self, account: NewAccount) -> Result<Account, RepositoryError>;

    async fn account_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError>;

    /// Look up an account together with its password hash.
    async fn credentials_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(Account, String)>, RepositoryError>;

    /// All accounts, oldest first.
    async fn list_accounts(&self) -> Result<Vec<Account>, RepositoryError>;
}

/// Catalog persistence, including the atomic stock primitives.
#[async_trait]
pub trait SweetStore: Send + Sync {
    async fn insert_sweet(
        &self,
        sweet: NewSweet,
        owner: AccountId,
    ) -> Result<Sweet, RepositoryError>;

    async fn sweet_by_id(&self, id: SweetId) -> Result<Option<Sweet>, RepositoryError>;

    /// Fetch several sweets. Missing ids are skipped.
    async fn sweets_by_ids(&self, ids: &[SweetId]) -> Result<Vec<Sweet>, RepositoryError>;

    /// Sweets matching `filter`, newest first.
    async fn list_sweets(&self, filter: &SweetFilter) -> Result<Vec<Sweet>, RepositoryError>;

    /// Apply `patch`. Returns `None` if the sweet does not exist.
    async fn update_sweet(
        &self,
        id: SweetId,
        patch: &SweetPatch,
    ) -> Result<Option<Sweet>, RepositoryError>;

    /// Delete a sweet and any cart lines that reference it.
    async fn delete_sweet(&self, id: SweetId) -> Result<Option<Sweet>, RepositoryError>;

    /// Atomically add `amount` units. Returns `None` if the sweet does not exist.
    ///
    /// An increment that would overflow the stored quantity changes nothing
    /// and reports [`RestockOutcome::WouldOverflow`].
    async fn restock(
        &self,
        id: SweetId,
        amount: i32,
    ) -> Result<Option<RestockOutcome>, RepositoryError>;

    /// Decrement every requested sweet, or none of them.
    async fn take_stock(&self, requests: &[StockRequest]) -> Result<StockTake, RepositoryError>;
}

/// Cart persistence.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Load the account's cart, creating an empty one on first use.
    async fn load_cart(&self, account: AccountId) -> Result<Cart, RepositoryError>;

    /// Replace the stored lines with `cart.items`.
    async fn save_cart(&self, cart: &Cart) -> Result<Cart, RepositoryError>;

    /// Take stock for every stored line of the account's cart and empty it,
    /// as one unit. The lines are read under the same lock as the stock, so
    /// a line added concurrently is either bought or left untouched.
    ///
    /// On `StockTake::Short` neither stock nor the cart is changed.
    async fn check_out(&self, account: AccountId) -> Result<CartCheckout, RepositoryError>;
}

/// Everything the storefront needs from storage.
#[async_trait]
pub trait Storage: AccountStore + SweetStore + CartStore {
    /// Verify the backend is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// `PostgreSQL`-backed [`Storage`].
#[derive(Debug, Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl AccountStore for PgStorage {
    async fn insert_account(&self, account: NewAccount) -> Result<Account, RepositoryError> {
        AccountRepository::new(&self.pool).create(&account).await
    }

    async fn account_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        AccountRepository::new(&self.pool).get_by_id(id).await
    }

    async fn credentials_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(Account, String)>, RepositoryError> {
        AccountRepository::new(&self.pool)
            .get_password_hash(email)
            .await
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, RepositoryError> {
        AccountRepository::new(&self.pool).list().await
    }
}

#[async_trait]
impl SweetStore for PgStorage {
    async fn insert_sweet(
        &self,
        sweet: NewSweet,
        owner: AccountId,
    ) -> Result<Sweet, RepositoryError> {
        SweetRepository::new(&self.pool).create(&sweet, owner).await
    }

    async fn sweet_by_id(&self, id: SweetId) -> Result<Option<Sweet>, RepositoryError> {
        SweetRepository::new(&self.pool).get_by_id(id).await
    }

    async fn sweets_by_ids(&self, ids: &[SweetId]) -> Result<Vec<Sweet>, RepositoryError> {
        SweetRepository::new(&self.pool).get_many(ids).await
    }

    async fn list_sweets(&self, filter: &SweetFilter) -> Result<Vec<Sweet>, RepositoryError> {
        SweetRepository::new(&self.pool).search(filter).await
    }

    async fn update_sweet(
        &self,
        id: SweetId,
        patch: &SweetPatch,
    ) -> Result<Option<Sweet>, RepositoryError> {
        SweetRepository::new(&self.pool).update(id, patch).await
    }

    async fn delete_sweet(&self, id: SweetId) -> Result<Option<Sweet>, RepositoryError> {
        SweetRepository::new(&self.pool).delete(id).await
    }

    async fn restock(
        &self,
        id: SweetId,
        amount: i32,
    ) -> Result<Option<RestockOutcome>, RepositoryError> {
        SweetRepository::new(&self.pool).restock(id, amount).await
    }

    async fn take_stock(&self, requests: &[StockRequest]) -> Result<StockTake, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let outcome = sweets::take_stock_in(&mut tx, requests).await?;
        finish(tx, &outcome).await?;
        Ok(outcome)
    }
}

#[async_trait]
impl CartStore for PgStorage {
    async fn load_cart(&self, account: AccountId) -> Result<Cart, RepositoryError> {
        CartRepository::new(&self.pool).get_or_create(account).await
    }

    async fn save_cart(&self, cart: &Cart) -> Result<Cart, RepositoryError> {
        CartRepository::new(&self.pool).replace_items(cart).await
    }

    async fn check_out(&self, account: AccountId) -> Result<CartCheckout, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let Some((cart_id, items)) = carts::lock_items_in(&mut tx, account).await? else {
            tx.rollback().await?;
            return Ok(CartCheckout {
                items: Vec::new(),
                stock: StockTake::Taken(Vec::new()),
            });
        };
        if items.is_empty() {
            tx.rollback().await?;
            return Ok(CartCheckout {
                items,
                stock: StockTake::Taken(Vec::new()),
            });
        }

        let requests = StockRequest::for_items(&items);
        let stock = sweets::take_stock_in(&mut tx, &requests).await?;
        if matches!(stock, StockTake::Taken(_)) {
            carts::clear_items_in(&mut tx, cart_id).await?;
        }
        finish(tx, &stock).await?;
        Ok(CartCheckout { items, stock })
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Commit a successful stock take, roll back a short one.
async fn finish(
    tx: sqlx::Transaction<'_, sqlx::Postgres>,
    outcome: &StockTake,
) -> Result<(), RepositoryError> {
    match outcome {
        StockTake::Taken(_) => tx.commit().await?,
        StockTake::Short(_) => tx.rollback().await?,
    }
    Ok(())
}

/// Map a unique violation to `RepositoryError::Conflict`.
pub(crate) fn conflict_or_database(
    error: sqlx::Error,
    field_for_constraint: impl Fn(&str) -> Option<&'static str>,
) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = error
        && db_err.is_unique_violation()
    {
        let field = db_err
            .constraint()
            .and_then(&field_for_constraint)
            .unwrap_or("record");
        return RepositoryError::Conflict(field.to_owned());
    }
    RepositoryError::Database(error)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
