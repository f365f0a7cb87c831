//! Purchases: whole-cart checkout and single-sweet direct purchase.
//!
//! Both paths go through the storage layer's all-or-nothing stock take, so
//! quantity on hand never goes negative and two buyers cannot both take the
//! last unit.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::instrument;

use sweet_shop_core::SweetId;

use super::cart::quantity_too_small;
use super::catalog::sweet_not_found;
use crate::db::Storage;
use crate::error::{AppError, Result, StockProblem};
use crate::models::{
    Account, AccountRef, DirectPurchase, Receipt, ReceiptLine, StockRequest, StockTake, order_id,
};

/// Checkout service.
pub struct CheckoutService<'a> {
    storage: &'a dyn Storage,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(storage: &'a dyn Storage) -> Self {
        Self { storage }
    }

    /// Buy everything in the buyer's cart and empty it.
    ///
    /// Lines are charged at their captured price.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidInput` for an empty cart and
    /// `AppError::InsufficientStock` listing every line that cannot be
    /// filled. Neither failure changes stock or the cart.
    #[instrument(skip_all, fields(account_id = %buyer.id))]
    pub async fn checkout_cart(&self, buyer: &Account) -> Result<Receipt> {
        let checkout = self.storage.check_out(buyer.id).await?;
        if checkout.items.is_empty() {
            return Err(AppError::InvalidInput("Cart is empty.".to_owned()));
        }

        let sweets = match checkout.stock {
            StockTake::Taken(sweets) => sweets,
            StockTake::Short(lines) => {
                tracing::warn!(short_lines = lines.len(), "Checkout rejected");
                return Err(AppError::InsufficientStock(StockProblem::Lines(lines)));
            }
        };

        let purchased_items: Vec<ReceiptLine> = checkout
            .items
            .iter()
            .zip(sweets)
            .map(|(item, sweet)| ReceiptLine {
                sweet_id: item.sweet_id,
                name: sweet.name,
                quantity: item.quantity,
                price_per_item: item.price,
                item_total: item.price.times(item.quantity),
            })
            .collect();

        let now = Utc::now();
        let receipt = Receipt {
            order_id: order_id(buyer.id, now),
            total_amount: purchased_items.iter().map(|line| line.item_total).sum(),
            total_items: purchased_items
                .iter()
                .map(|line| i64::from(line.quantity))
                .sum(),
            purchased_items,
            purchased_by: AccountRef::from(buyer),
            purchase_date: now,
        };

        tracing::info!(
            order_id = %receipt.order_id,
            total_items = receipt.total_items,
            total_amount = %receipt.total_amount,
            "Checkout completed"
        );
        Ok(receipt)
    }

    /// Buy `quantity` units of one sweet at its current price, bypassing the cart.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidInput` for a quantity below 1,
    /// `AppError::NotFound` for an unknown sweet and
    /// `AppError::InsufficientStock` if stock is too low.
    #[instrument(skip_all, fields(account_id = %buyer.id, %sweet_id, quantity))]
    pub async fn purchase_direct(
        &self,
        buyer: &Account,
        sweet_id: SweetId,
        quantity: i32,
    ) -> Result<DirectPurchase> {
        if quantity < 1 {
            return Err(quantity_too_small());
        }

        let request = StockRequest { sweet_id, quantity };
        let sweet = match self.storage.take_stock(&[request]).await? {
            StockTake::Taken(mut sweets) => sweets.pop().ok_or_else(sweet_not_found)?,
            StockTake::Short(mut lines) => {
                let Some(line) = lines.pop() else {
                    return Err(AppError::Internal("stock take reported no lines".to_owned()));
                };
                if line.name.is_none() {
                    return Err(sweet_not_found());
                }
                tracing::warn!(
                    available = line.available,
                    requested = line.requested,
                    "Purchase rejected"
                );
                return Err(AppError::InsufficientStock(StockProblem::Single {
                    available: line.available,
                    requested: line.requested,
                    in_cart: None,
                }));
            }
        };

        let total_price: Decimal = sweet.price.times(quantity);
        let purchase = DirectPurchase {
            order_id: order_id(buyer.id, Utc::now()),
            remaining_stock: sweet.quantity,
            purchased_quantity: quantity,
            total_price,
            purchased_by: AccountRef::from(buyer),
            sweet,
        };

        tracing::info!(
            order_id = %purchase.order_id,
            remaining_stock = purchase.remaining_stock,
            "Purchase completed"
        );
        Ok(purchase)
    }
}
