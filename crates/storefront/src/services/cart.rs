//! Cart operations.
//!
//! Every mutation loads the cart, edits it in memory and writes the full
//! line set back. Stock is checked here but only reserved at checkout.

use std::collections::HashMap;

use tracing::instrument;

use sweet_shop_core::{AccountId, SweetId};

use super::catalog::sweet_not_found;
use crate::db::Storage;
use crate::error::{AppError, Result, StockProblem};
use crate::models::{Cart, CartItem, CartLine, CartView, PopulatedCart, Sweet};

/// Cart service.
pub struct CartService<'a> {
    storage: &'a dyn Storage,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(storage: &'a dyn Storage) -> Self {
        Self { storage }
    }

    /// The account's cart, created empty on first access.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if storage fails.
    pub async fn get_or_create(&self, account: AccountId) -> Result<Cart> {
        Ok(self.storage.load_cart(account).await?)
    }

    /// Add `quantity` units of a sweet, merging with an existing line.
    ///
    /// The line's captured price is refreshed to the current catalog price.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidInput` for a quantity below 1,
    /// `AppError::NotFound` for an unknown sweet and
    /// `AppError::InsufficientStock` if the cart would exceed stock on hand.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        account: AccountId,
        sweet_id: SweetId,
        quantity: i32,
    ) -> Result<Cart> {
        if quantity < 1 {
            return Err(quantity_too_small());
        }
        let sweet = self.sweet(sweet_id).await?;
        let mut cart = self.storage.load_cart(account).await?;

        let in_cart = cart.item(sweet_id).map_or(0, |item| item.quantity);
        let wanted = in_cart
            .checked_add(quantity)
            .ok_or_else(|| AppError::InvalidInput("Quantity is too large.".to_owned()))?;
        if !sweet.in_stock(wanted) {
            tracing::warn!(
                available = sweet.quantity,
                in_cart,
                requested = quantity,
                "Add to cart rejected"
            );
            return Err(AppError::InsufficientStock(StockProblem::Single {
                available: sweet.quantity,
                requested: quantity,
                in_cart: Some(in_cart),
            }));
        }

        cart.upsert(CartItem {
            sweet_id,
            quantity: wanted,
            price: sweet.price,
        });
        Ok(self.storage.save_cart(&cart).await?)
    }

    /// Set a line's quantity. Zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidInput` for a negative quantity,
    /// `AppError::NotFound` if the line or sweet is missing and
    /// `AppError::InsufficientStock` if stock is too low.
    #[instrument(skip(self))]
    pub async fn set_item_quantity(
        &self,
        account: AccountId,
        sweet_id: SweetId,
        quantity: i32,
    ) -> Result<Cart> {
        if quantity < 0 {
            return Err(AppError::InvalidInput(
                "Quantity cannot be negative.".to_owned(),
            ));
        }
        let mut cart = self.storage.load_cart(account).await?;
        if cart.item(sweet_id).is_none() {
            return Err(line_not_found());
        }

        if quantity == 0 {
            cart.remove(sweet_id);
            return Ok(self.storage.save_cart(&cart).await?);
        }

        let sweet = self.sweet(sweet_id).await?;
        if !sweet.in_stock(quantity) {
            tracing::warn!(
                available = sweet.quantity,
                requested = quantity,
                "Cart update rejected"
            );
            return Err(AppError::InsufficientStock(StockProblem::Single {
                available: sweet.quantity,
                requested: quantity,
                in_cart: None,
            }));
        }

        cart.upsert(CartItem {
            sweet_id,
            quantity,
            price: sweet.price,
        });
        Ok(self.storage.save_cart(&cart).await?)
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the cart has no line for the sweet.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, account: AccountId, sweet_id: SweetId) -> Result<Cart> {
        let mut cart = self.storage.load_cart(account).await?;
        if !cart.remove(sweet_id) {
            return Err(line_not_found());
        }
        Ok(self.storage.save_cart(&cart).await?)
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if storage fails.
    #[instrument(skip(self))]
    pub async fn clear(&self, account: AccountId) -> Result<Cart> {
        let mut cart = self.storage.load_cart(account).await?;
        cart.items.clear();
        Ok(self.storage.save_cart(&cart).await?)
    }

    /// Populate each line with the current catalog record and compute totals.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if storage fails.
    pub async fn view(&self, cart: Cart) -> Result<CartView> {
        let ids: Vec<SweetId> = cart.items.iter().map(|item| item.sweet_id).collect();
        let mut sweets: HashMap<SweetId, Sweet> = self
            .storage
            .sweets_by_ids(&ids)
            .await?
            .into_iter()
            .map(|sweet| (sweet.id, sweet))
            .collect();

        let summary = cart.totals();
        let items = cart
            .items
            .iter()
            .filter_map(|item| {
                sweets.remove(&item.sweet_id).map(|sweet| CartLine {
                    sweet,
                    quantity: item.quantity,
                    price: item.price,
                })
            })
            .collect();

        Ok(CartView {
            cart: PopulatedCart {
                id: cart.id,
                items,
                updated_at: cart.updated_at,
            },
            summary,
        })
    }

    async fn sweet(&self, id: SweetId) -> Result<Sweet> {
        self.storage
            .sweet_by_id(id)
            .await?
            .ok_or_else(sweet_not_found)
    }
}

pub(crate) fn quantity_too_small() -> AppError {
    AppError::InvalidInput("Quantity must be at least 1.".to_owned())
}

fn line_not_found() -> AppError {
    AppError::NotFound("Item not found in cart.".to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::db::SweetStore;
    use crate::models::{NewSweet, SweetPatch};
    use rust_decimal::Decimal;
    use sweet_shop_core::{Category, Price};

    const SHOPPER: AccountId = AccountId::new(1);

    async fn stock(store: &MemoryStore, name: &str, cents: i64, quantity: i32) -> Sweet {
        store
            .insert_sweet(
                NewSweet {
                    name: name.to_owned(),
                    description: "tasty".to_owned(),
                    price: Price::from_cents(cents).unwrap(),
                    category: Category::Candy,
                    image_url: "/placeholder.svg".to_owned(),
                    quantity,
                },
                AccountId::new(99),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_or_create_is_stable() {
        let store = MemoryStore::new();
        let carts = CartService::new(&store);

        let first = carts.get_or_create(SHOPPER).await.unwrap();
        let second = carts.get_or_create(SHOPPER).await.unwrap();
        assert_eq!(first.id, second.id);
        assert!(first.is_empty());
    }

    #[tokio::test]
    async fn test_add_and_totals() {
        let store = MemoryStore::new();
        let carts = CartService::new(&store);
        let mint = stock(&store, "Mint", 250, 10).await;
        let gum = stock(&store, "Gum", 100, 10).await;

        let cart = carts.add_item(SHOPPER, mint.id, 2).await.unwrap();
        assert_eq!(cart.totals().total_price, Decimal::new(500, 2));

        carts.add_item(SHOPPER, mint.id, 1).await.unwrap();
        let cart = carts.add_item(SHOPPER, gum.id, 4).await.unwrap();
        let totals = cart.totals();
        assert_eq!(totals.item_count, 2);
        assert_eq!(totals.total_items, 7);
        assert_eq!(totals.total_price, Decimal::new(1150, 2));
    }

    #[tokio::test]
    async fn test_add_rejects_bad_quantity_and_unknown_sweet() {
        let store = MemoryStore::new();
        let carts = CartService::new(&store);
        let mint = stock(&store, "Mint", 250, 10).await;

        assert!(matches!(
            carts.add_item(SHOPPER, mint.id, 0).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            carts.add_item(SHOPPER, SweetId::new(404), 1).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_add_counts_existing_line_against_stock() {
        let store = MemoryStore::new();
        let carts = CartService::new(&store);
        let mint = stock(&store, "Mint", 250, 5).await;

        carts.add_item(SHOPPER, mint.id, 3).await.unwrap();
        let err = carts.add_item(SHOPPER, mint.id, 3).await.unwrap_err();
        let AppError::InsufficientStock(problem) = err else {
            panic!("expected insufficient stock");
        };
        assert_eq!(
            problem,
            StockProblem::Single {
                available: 5,
                requested: 3,
                in_cart: Some(3),
            }
        );
    }

    #[tokio::test]
    async fn test_set_quantity_zero_removes_line() {
        let store = MemoryStore::new();
        let carts = CartService::new(&store);
        let mint = stock(&store, "Mint", 250, 5).await;

        carts.add_item(SHOPPER, mint.id, 2).await.unwrap();
        let cart = carts.set_item_quantity(SHOPPER, mint.id, 0).await.unwrap();
        assert!(cart.is_empty());

        assert!(matches!(
            carts.remove_item(SHOPPER, mint.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            carts.set_item_quantity(SHOPPER, mint.id, 1).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_set_quantity_checks_stock() {
        let store = MemoryStore::new();
        let carts = CartService::new(&store);
        let mint = stock(&store, "Mint", 250, 5).await;

        carts.add_item(SHOPPER, mint.id, 1).await.unwrap();
        assert!(matches!(
            carts.set_item_quantity(SHOPPER, mint.id, 6).await,
            Err(AppError::InsufficientStock(_))
        ));
        let cart = carts.set_item_quantity(SHOPPER, mint.id, 5).await.unwrap();
        assert_eq!(cart.item(mint.id).unwrap().quantity, 5);
    }

    #[tokio::test]
    async fn test_price_snapshot_refreshes_only_when_touched() {
        let store = MemoryStore::new();
        let carts = CartService::new(&store);
        let mint = stock(&store, "Mint", 200, 10).await;

        carts.add_item(SHOPPER, mint.id, 2).await.unwrap();
        store
            .update_sweet(
                mint.id,
                &SweetPatch {
                    price: Some(Price::from_cents(300).unwrap()),
                    ..SweetPatch::default()
                },
            )
            .await
            .unwrap();

        let cart = carts.get_or_create(SHOPPER).await.unwrap();
        assert_eq!(cart.totals().total_price, Decimal::new(400, 2));

        let cart = carts.set_item_quantity(SHOPPER, mint.id, 2).await.unwrap();
        assert_eq!(cart.totals().total_price, Decimal::new(600, 2));
    }

    #[tokio::test]
    async fn test_clear_and_view() {
        let store = MemoryStore::new();
        let carts = CartService::new(&store);
        let mint = stock(&store, "Mint", 250, 5).await;

        let cart = carts.add_item(SHOPPER, mint.id, 2).await.unwrap();
        let view = carts.view(cart).await.unwrap();
        assert_eq!(view.cart.items.len(), 1);
        assert_eq!(view.cart.items[0].sweet.name, "Mint");
        assert_eq!(view.summary.total_items, 2);

        let cart = carts.clear(SHOPPER).await.unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_deleted_sweet_leaves_cart() {
        let store = MemoryStore::new();
        let carts = CartService::new(&store);
        let mint = stock(&store, "Mint", 250, 5).await;

        carts.add_item(SHOPPER, mint.id, 2).await.unwrap();
        store.delete_sweet(mint.id).await.unwrap();

        let cart = carts.get_or_create(SHOPPER).await.unwrap();
        assert!(cart.is_empty());
    }
}
