//! Purchase and restock receipts.
//!
//! Response payloads only. Nothing here is persisted.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use sweet_shop_core::{AccountId, Email, Price, SweetId, Username};

use super::{Account, Sweet};

/// The account a receipt or report is issued to.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccountRef {
    pub id: AccountId,
    pub username: Username,
    pub email: Email,
}

impl From<&Account> for AccountRef {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
        }
    }
}

/// Receipt for a cart checkout.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub order_id: String,
    pub purchased_items: Vec<ReceiptLine>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub total_items: i64,
    pub purchased_by: AccountRef,
    pub purchase_date: DateTime<Utc>,
}

/// One purchased cart line, priced at its snapshot.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptLine {
    pub sweet_id: SweetId,
    pub name: String,
    pub quantity: i32,
    pub price_per_item: Price,
    #[serde(with = "rust_decimal::serde::float")]
    pub item_total: Decimal,
}

/// Receipt for a single-sweet purchase that bypasses the cart.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectPurchase {
    pub order_id: String,
    /// The sweet after the decrement.
    pub sweet: Sweet,
    pub purchased_quantity: i32,
    pub remaining_stock: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
    pub purchased_by: AccountRef,
}

/// Report for an admin restock.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestockReport {
    pub sweet: Sweet,
    pub restocked_quantity: i32,
    pub previous_stock: i32,
    pub new_stock: i32,
    pub restocked_by: AccountRef,
}

/// Build an order id of the form `ORDER-<unix millis>-<6-digit account suffix>`.
#[must_use]
pub fn order_id(account: AccountId, at: DateTime<Utc>) -> String {
    format!(
        "ORDER-{}-{:06}",
        at.timestamp_millis(),
        account.as_i32().rem_euclid(1_000_000)
    )
}
