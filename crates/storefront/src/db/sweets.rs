//! Catalog repository for database operations.
//!
//! Stock changes are single conditional statements (`restock`) or run inside
//! a transaction that holds row locks on every affected sweet
//! ([`take_stock_in`]).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use sweet_shop_core::{AccountId, Category, Price, SweetId};

use super::RepositoryError;
use crate::models::{
    NewSweet, RestockOutcome, Restocked, StockRequest, StockShortfall, StockTake, Sweet,
    SweetFilter, SweetPatch,
};

const SWEET_COLUMNS: &str = "id, name, description, price, category, image_url, quantity, \
                             created_by, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct SweetRow {
    id: i32,
    name: String,
    description: String,
    price: Decimal,
    category: Category,
    image_url: String,
    quantity: i32,
    created_by: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct RestockRow {
    #[sqlx(flatten)]
    sweet: SweetRow,
    previous_quantity: i32,
}

impl TryFrom<SweetRow> for Sweet {
    type Error = RepositoryError;

    fn try_from(row: SweetRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price for sweet {}: {e}", row.id))
        })?;
        if row.quantity < 0 {
            return Err(RepositoryError::DataCorruption(format!(
                "negative quantity for sweet {}",
                row.id
            )));
        }

        Ok(Self {
            id: SweetId::new(row.id),
            name: row.name,
            description: row.description,
            price,
            category: row.category,
            image_url: row.image_url,
            quantity: row.quantity,
            created_by: AccountId::new(row.created_by),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Escape `LIKE` wildcards so user input matches literally.
fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Repository for catalog database operations.
pub struct SweetRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SweetRepository<'a> {
    /// Create a new sweet repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a sweet by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: SweetId) -> Result<Option<Sweet>, RepositoryError> {
        let row = sqlx::query_as::<_, SweetRow>(&format!(
            "SELECT {SWEET_COLUMNS} FROM storefront.sweet WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(Sweet::try_from).transpose()
    }

    /// Get several sweets by ID. Unknown IDs are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[SweetId]) -> Result<Vec<Sweet>, RepositoryError> {
        let ids: Vec<i32> = ids.iter().map(SweetId::as_i32).collect();
        let rows = sqlx::query_as::<_, SweetRow>(&format!(
            "SELECT {SWEET_COLUMNS} FROM storefront.sweet WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Sweet::try_from).collect()
    }

    /// Search the catalog, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(&self, filter: &SweetFilter) -> Result<Vec<Sweet>, RepositoryError> {
        let rows = sqlx::query_as::<_, SweetRow>(&format!(
            r"
            SELECT {SWEET_COLUMNS}
            FROM storefront.sweet
            WHERE ($1::text IS NULL OR name ILIKE $1)
              AND ($2::storefront.sweet_category IS NULL OR category = $2)
              AND ($3::numeric IS NULL OR price >= $3)
              AND ($4::numeric IS NULL OR price <= $4)
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(filter.name.as_deref().map(like_pattern))
        .bind(filter.category)
        .bind(filter.min_price.map(|p| p.amount()))
        .bind(filter.max_price.map(|p| p.amount()))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Sweet::try_from).collect()
    }

    /// Create a new sweet owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        sweet: &NewSweet,
        owner: AccountId,
    ) -> Result<Sweet, RepositoryError> {
        let row = sqlx::query_as::<_, SweetRow>(&format!(
            r"
            INSERT INTO storefront.sweet
                (name, description, price, category, image_url, quantity, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {SWEET_COLUMNS}
            "
        ))
        .bind(&sweet.name)
        .bind(&sweet.description)
        .bind(sweet.price.amount())
        .bind(sweet.category)
        .bind(&sweet.image_url)
        .bind(sweet.quantity)
        .bind(owner.as_i32())
        .fetch_one(self.pool)
        .await?;

        Sweet::try_from(row)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update(
        &self,
        id: SweetId,
        patch: &SweetPatch,
    ) -> Result<Option<Sweet>, RepositoryError> {
        let row = sqlx::query_as::<_, SweetRow>(&format!(
            r"
            UPDATE storefront.sweet
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                category = COALESCE($5, category),
                image_url = COALESCE($6, image_url),
                quantity = COALESCE($7, quantity),
                updated_at = now()
            WHERE id = $1
            RETURNING {SWEET_COLUMNS}
            "
        ))
        .bind(id.as_i32())
        .bind(patch.name.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.price.map(|p| p.amount()))
        .bind(patch.category)
        .bind(patch.image_url.as_deref())
        .bind(patch.quantity)
        .fetch_optional(self.pool)
        .await?;

        row.map(Sweet::try_from).transpose()
    }

    /// Delete a sweet. Cart lines referencing it cascade.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: SweetId) -> Result<Option<Sweet>, RepositoryError> {
        let row = sqlx::query_as::<_, SweetRow>(&format!(
            "DELETE FROM storefront.sweet WHERE id = $1 RETURNING {SWEET_COLUMNS}"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(Sweet::try_from).transpose()
    }

    /// Atomically add stock, returning the quantity before the increment.
    ///
    /// The increment only applies while the result fits in an `INTEGER`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn restock(
        &self,
        id: SweetId,
        amount: i32,
    ) -> Result<Option<RestockOutcome>, RepositoryError> {
        let row = sqlx::query_as::<_, RestockRow>(&format!(
            r"
            UPDATE storefront.sweet
            SET quantity = quantity + $2,
                updated_at = now()
            WHERE id = $1 AND quantity <= 2147483647 - $2
            RETURNING {SWEET_COLUMNS}, quantity - $2 AS previous_quantity
            "
        ))
        .bind(id.as_i32())
        .bind(amount)
        .fetch_optional(self.pool)
        .await?;

        if let Some(r) = row {
            return Ok(Some(RestockOutcome::Restocked(Restocked {
                previous_quantity: r.previous_quantity,
                sweet: Sweet::try_from(r.sweet)?,
            })));
        }

        // No row: either the sweet is gone or the increment would overflow.
        let current: Option<i32> =
            sqlx::query_scalar("SELECT quantity FROM storefront.sweet WHERE id = $1")
                .bind(id.as_i32())
                .fetch_optional(self.pool)
                .await?;
        Ok(current.map(|current| RestockOutcome::WouldOverflow { current }))
    }

    /// Count catalog records.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM storefront.sweet")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

/// Lock every requested sweet and decrement all of them, or none.
///
/// Rows are locked in id order so concurrent checkouts cannot deadlock. The
/// caller owns the transaction and must roll back on `StockTake::Short`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a statement fails.
pub async fn take_stock_in(
    tx: &mut Transaction<'_, Postgres>,
    requests: &[StockRequest],
) -> Result<StockTake, RepositoryError> {
    let conn: &mut PgConnection = tx;

    let ids: Vec<i32> = requests.iter().map(|r| r.sweet_id.as_i32()).collect();
    let rows = sqlx::query_as::<_, SweetRow>(&format!(
        "SELECT {SWEET_COLUMNS} FROM storefront.sweet WHERE id = ANY($1) ORDER BY id FOR UPDATE"
    ))
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut locked: HashMap<SweetId, Sweet> = HashMap::with_capacity(rows.len());
    for row in rows {
        let sweet = Sweet::try_from(row)?;
        locked.insert(sweet.id, sweet);
    }

    let mut shortfalls = Vec::new();
    for request in requests {
        match locked.get_mut(&request.sweet_id) {
            None => shortfalls.push(StockShortfall::missing(request.sweet_id, request.quantity)),
            Some(sweet) if !sweet.in_stock(request.quantity) => {
                shortfalls.push(StockShortfall::insufficient(sweet, request.quantity));
            }
            // Track what is left so repeated ids are checked cumulatively.
            Some(sweet) => sweet.quantity -= request.quantity,
        }
    }
    if !shortfalls.is_empty() {
        return Ok(StockTake::Short(shortfalls));
    }

    let mut taken = Vec::with_capacity(requests.len());
    for request in requests {
        let row = sqlx::query_as::<_, SweetRow>(&format!(
            r"
            UPDATE storefront.sweet
            SET quantity = quantity - $2,
                updated_at = now()
            WHERE id = $1 AND quantity >= $2
            RETURNING {SWEET_COLUMNS}
            "
        ))
        .bind(request.sweet_id.as_i32())
        .bind(request.quantity)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| RepositoryError::Conflict("quantity".to_owned()))?;

        taken.push(Sweet::try_from(row)?);
    }

    Ok(StockTake::Taken(taken))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("choc"), "%choc%");
        assert_eq!(like_pattern("100%_"), "%100\\%\\_%");
    }
}
