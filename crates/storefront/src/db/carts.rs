//! Cart repository for database operations.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use sweet_shop_core::{AccountId, CartId, Price, SweetId};

use super::RepositoryError;
use crate::models::{Cart, CartItem};

#[derive(sqlx::FromRow)]
struct CartRow {
    id: i32,
    account_id: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct CartItemRow {
    sweet_id: i32,
    quantity: i32,
    price: Decimal,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = RepositoryError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid cart price snapshot: {e}"))
        })?;
        if row.quantity < 1 {
            return Err(RepositoryError::DataCorruption(format!(
                "cart line for sweet {} has quantity {}",
                row.sweet_id, row.quantity
            )));
        }

        Ok(Self {
            sweet_id: SweetId::new(row.sweet_id),
            quantity: row.quantity,
            price,
        })
    }
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the account's cart, creating it if this is the first access.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_or_create(&self, account: AccountId) -> Result<Cart, RepositoryError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let cart = sqlx::query_as::<_, CartRow>(
            r"
            INSERT INTO storefront.cart (account_id)
            VALUES ($1)
            ON CONFLICT (account_id) DO UPDATE SET account_id = EXCLUDED.account_id
            RETURNING id, account_id, created_at, updated_at
            ",
        )
        .bind(account.as_i32())
        .fetch_one(self.pool)
        .await?;

        let mut conn = self.pool.acquire().await?;
        let items = load_items(&mut conn, CartId::new(cart.id)).await?;

        Ok(assemble(cart, items))
    }

    /// Replace every line of the cart with `cart.items`, in order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the cart row is gone.
    /// Returns `RepositoryError::Database` if a statement fails.
    pub async fn replace_items(&self, cart: &Cart) -> Result<Cart, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, CartRow>(
            r"
            UPDATE storefront.cart
            SET updated_at = now()
            WHERE id = $1
            RETURNING id, account_id, created_at, updated_at
            ",
        )
        .bind(cart.id.as_i32())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        clear_items_in(&mut tx, cart.id).await?;

        for (position, item) in (0_i32..).zip(&cart.items) {
            sqlx::query(
                r"
                INSERT INTO storefront.cart_item (cart_id, sweet_id, quantity, price, position)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(cart.id.as_i32())
            .bind(item.sweet_id.as_i32())
            .bind(item.quantity)
            .bind(item.price.amount())
            .bind(position)
            .execute(&mut *tx)
            .await?;
        }

        let items = load_items(&mut tx, cart.id).await?;
        tx.commit().await?;

        Ok(assemble(row, items))
    }

    /// Count carts that currently hold at least one line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_active(&self) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(DISTINCT cart_id) FROM storefront.cart_item")
                .fetch_one(self.pool)
                .await?;
        Ok(count)
    }
}

/// Delete every line of a cart inside the caller's transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the delete fails.
pub async fn clear_items_in(
    tx: &mut Transaction<'_, Postgres>,
    cart: CartId,
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM storefront.cart_item WHERE cart_id = $1")
        .bind(cart.as_i32())
        .execute(&mut **tx)
        .await?;
    sqlx::query("UPDATE storefront.cart SET updated_at = now() WHERE id = $1")
        .bind(cart.as_i32())
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Lock the account's cart row and read its lines inside the caller's
/// transaction. Returns `None` if the account has no cart yet.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn lock_items_in(
    tx: &mut Transaction<'_, Postgres>,
    account: AccountId,
) -> Result<Option<(CartId, Vec<CartItem>)>, RepositoryError> {
    let cart_id: Option<i32> =
        sqlx::query_scalar("SELECT id FROM storefront.cart WHERE account_id = $1 FOR UPDATE")
            .bind(account.as_i32())
            .fetch_optional(&mut **tx)
            .await?;
    let Some(cart_id) = cart_id.map(CartId::new) else {
        return Ok(None);
    };

    let items = load_items(&mut **tx, cart_id).await?;
    Ok(Some((cart_id, items)))
}

async fn load_items(
    conn: &mut PgConnection,
    cart: CartId,
) -> Result<Vec<CartItem>, RepositoryError> {
    let rows = sqlx::query_as::<_, CartItemRow>(
        r"
        SELECT sweet_id, quantity, price
        FROM storefront.cart_item
        WHERE cart_id = $1
        ORDER BY position
        ",
    )
    .bind(cart.as_i32())
    .fetch_all(conn)
    .await?;

    rows.into_iter().map(CartItem::try_from).collect()
}

fn assemble(row: CartRow, items: Vec<CartItem>) -> Cart {
    Cart {
        id: CartId::new(row.id),
        account_id: AccountId::new(row.account_id),
        items,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}
