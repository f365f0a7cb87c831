//! Cart aggregate.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use sweet_shop_core::{AccountId, CartId, Price, SweetId};

use super::{StockTake, Sweet};

/// A shopper's cart. Exactly one per account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    pub id: CartId,
    pub account_id: AccountId,
    /// Lines in insertion order, at most one per sweet.
    pub items: Vec<CartItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartItem {
    pub sweet_id: SweetId,
    /// Always at least 1.
    pub quantity: i32,
    /// Unit price captured when the line was last added or updated.
    pub price: Price,
}

impl Cart {
    #[must_use]
    pub fn item(&self, sweet_id: SweetId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.sweet_id == sweet_id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Insert or replace the line for `item.sweet_id`, keeping its position.
    pub fn upsert(&mut self, item: CartItem) {
        match self.items.iter_mut().find(|i| i.sweet_id == item.sweet_id) {
            Some(existing) => *existing = item,
            None => self.items.push(item),
        }
    }

    /// Remove the line for `sweet_id`. Returns whether a line was removed.
    pub fn remove(&mut self, sweet_id: SweetId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.sweet_id != sweet_id);
        self.items.len() != before
    }

    /// Recompute the totals from the stored price snapshots.
    #[must_use]
    pub fn totals(&self) -> CartTotals {
        CartTotals {
            total_items: self.items.iter().map(|i| i64::from(i.quantity)).sum(),
            total_price: self.items.iter().map(|i| i.price.times(i.quantity)).sum(),
            item_count: self.items.len(),
        }
    }
}

/// The lines bought by a checkout, read under the same lock as the stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartCheckout {
    /// Stored lines at the moment of checkout. Empty if there was nothing to buy.
    pub items: Vec<CartItem>,
    /// Sweets in `items` order on success, or every short line.
    pub stock: StockTake,
}

/// Derived cart summary.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    /// Sum of line quantities.
    pub total_items: i64,
    /// Sum of snapshot price times quantity.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
    /// Number of distinct lines.
    pub item_count: usize,
}

/// A cart line populated with the current catalog record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub sweet: Sweet,
    pub quantity: i32,
    /// Captured unit price, which may differ from `sweet.price`.
    pub price: Price,
}

/// Cart as returned to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulatedCart {
    pub id: CartId,
    pub items: Vec<CartLine>,
    pub updated_at: DateTime<Utc>,
}

/// Response body for every cart endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub cart: PopulatedCart,
    pub summary: CartTotals,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn cart() -> Cart {
        let now = Utc::now();
        Cart {
            id: CartId::new(1),
            account_id: AccountId::new(1),
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn line(sweet: i32, quantity: i32, cents: i64) -> CartItem {
        CartItem {
            sweet_id: SweetId::new(sweet),
            quantity,
            price: Price::from_cents(cents).unwrap(),
        }
    }

    #[test]
    fn test_empty_totals() {
        let totals = cart().totals();
        assert_eq!(totals.total_items, 0);
        assert_eq!(totals.total_price, Decimal::ZERO);
        assert_eq!(totals.item_count, 0);
    }

    #[test]
    fn test_totals_sum_lines() {
        let mut cart = cart();
        cart.upsert(line(1, 3, 250));
        cart.upsert(line(2, 2, 199));

        let totals = cart.totals();
        assert_eq!(totals.total_items, 5);
        assert_eq!(totals.total_price, Decimal::new(1148, 2));
        assert_eq!(totals.item_count, 2);
    }

    #[test]
    fn test_upsert_keeps_position() {
        let mut cart = cart();
        cart.upsert(line(1, 1, 100));
        cart.upsert(line(2, 1, 100));
        cart.upsert(line(1, 4, 120));

        assert_eq!(cart.items[0].sweet_id, SweetId::new(1));
        assert_eq!(cart.items[0].quantity, 4);
        assert_eq!(cart.items.len(), 2);
    }

    #[test]
    fn test_remove_reports_absence() {
        let mut cart = cart();
        cart.upsert(line(1, 1, 100));
        assert!(cart.remove(SweetId::new(1)));
        assert!(!cart.remove(SweetId::new(1)));
    }

    #[test]
    fn test_totals_serialize_as_numbers() {
        let mut cart = cart();
        cart.upsert(line(1, 2, 125));
        let json = serde_json::to_value(cart.totals()).unwrap();
        assert_eq!(json["totalPrice"], serde_json::json!(2.5));
        assert_eq!(json["itemCount"], 1);
    }
}
