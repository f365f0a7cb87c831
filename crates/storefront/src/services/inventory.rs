//! Admin inventory operations.

use tracing::instrument;

use sweet_shop_core::SweetId;

use super::catalog::{require_admin, sweet_not_found};
use crate::db::Storage;
use crate::error::{AppError, Result};
use crate::models::{Account, AccountRef, RestockOutcome, RestockReport};

/// Inventory service.
pub struct InventoryService<'a> {
    storage: &'a dyn Storage,
}

impl<'a> InventoryService<'a> {
    #[must_use]
    pub const fn new(storage: &'a dyn Storage) -> Self {
        Self { storage }
    }

    /// Add `amount` units to a sweet's stock.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` unless `actor` is an admin,
    /// `AppError::InvalidInput` for an amount below 1 or one that would
    /// overflow stock, and `AppError::NotFound` for an unknown sweet.
    #[instrument(skip_all, fields(%sweet_id, amount, actor_id = %actor.id))]
    pub async fn restock(
        &self,
        sweet_id: SweetId,
        amount: i32,
        actor: &Account,
    ) -> Result<RestockReport> {
        require_admin(actor)?;
        if amount < 1 {
            return Err(AppError::InvalidInput(
                "Restock quantity must be at least 1.".to_owned(),
            ));
        }

        let restocked = match self
            .storage
            .restock(sweet_id, amount)
            .await?
            .ok_or_else(sweet_not_found)?
        {
            RestockOutcome::Restocked(restocked) => restocked,
            RestockOutcome::WouldOverflow { current } => {
                tracing::warn!(current, "Restock rejected");
                return Err(AppError::InvalidInput(
                    "Restock would exceed the maximum stock level.".to_owned(),
                ));
            }
        };

        let report = RestockReport {
            restocked_quantity: amount,
            previous_stock: restocked.previous_quantity,
            new_stock: restocked.sweet.quantity,
            restocked_by: AccountRef::from(actor),
            sweet: restocked.sweet,
        };

        tracing::info!(
            previous_stock = report.previous_stock,
            new_stock = report.new_stock,
            "Sweet restocked"
        );
        Ok(report)
    }
}
