//! Catalog domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use sweet_shop_core::{AccountId, Category, Price, SweetId};

use super::CartItem;

/// Image shown when a sweet is created without one.
pub const DEFAULT_IMAGE_URL: &str = "/placeholder.svg";

/// A product in the catalog.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Sweet {
    pub id: SweetId,
    pub name: String,
    pub description: String,
    pub price: Price,
    pub category: Category,
    pub image_url: String,
    /// Quantity on hand. Never negative.
    pub quantity: i32,
    /// Account that created the sweet.
    pub created_by: AccountId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sweet {
    #[must_use]
    pub const fn in_stock(&self, quantity: i32) -> bool {
        self.quantity >= quantity
    }
}

/// A validated sweet ready to be stored.
#[derive(Debug, Clone)]
pub struct NewSweet {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub category: Category,
    pub image_url: String,
    pub quantity: i32,
}

/// Validated partial update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct SweetPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Price>,
    pub category: Option<Category>,
    pub image_url: Option<String>,
    pub quantity: Option<i32>,
}

impl SweetPatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.category.is_none()
            && self.image_url.is_none()
            && self.quantity.is_none()
    }

    /// Apply the patch to an in-memory record.
    pub fn apply_to(&self, sweet: &mut Sweet) {
        if let Some(name) = &self.name {
            sweet.name.clone_from(name);
        }
        if let Some(description) = &self.description {
            sweet.description.clone_from(description);
        }
        if let Some(price) = self.price {
            sweet.price = price;
        }
        if let Some(category) = self.category {
            sweet.category = category;
        }
        if let Some(image_url) = &self.image_url {
            sweet.image_url.clone_from(image_url);
        }
        if let Some(quantity) = self.quantity {
            sweet.quantity = quantity;
        }
    }
}

/// Catalog search criteria. All present criteria must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweetFilter {
    /// Case-insensitive substring of the name.
    pub name: Option<String>,
    pub category: Option<Category>,
    /// Inclusive lower price bound.
    pub min_price: Option<Price>,
    /// Inclusive upper price bound.
    pub max_price: Option<Price>,
}

impl SweetFilter {
    #[must_use]
    pub fn matches(&self, sweet: &Sweet) -> bool {
        if let Some(name) = &self.name
            && !sweet.name.to_lowercase().contains(&name.to_lowercase())
        {
            return false;
        }
        if self.category.is_some_and(|c| c != sweet.category) {
            return false;
        }
        if self.min_price.is_some_and(|min| sweet.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| sweet.price > max) {
            return false;
        }
        true
    }
}

/// Units to take from one sweet's stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockRequest {
    pub sweet_id: SweetId,
    pub quantity: i32,
}

impl StockRequest {
    /// One request per cart line, in line order.
    #[must_use]
    pub fn for_items(items: &[CartItem]) -> Vec<Self> {
        items
            .iter()
            .map(|item| Self {
                sweet_id: item.sweet_id,
                quantity: item.quantity,
            })
            .collect()
    }
}

/// One line that could not be satisfied by current stock.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StockShortfall {
    pub sweet_id: SweetId,
    /// `None` when the sweet no longer exists.
    pub name: Option<String>,
    pub available: i32,
    pub requested: i32,
    pub error: String,
}

impl StockShortfall {
    #[must_use]
    pub fn insufficient(sweet: &Sweet, requested: i32) -> Self {
        Self {
            sweet_id: sweet.id,
            name: Some(sweet.name.clone()),
            available: sweet.quantity,
            requested,
            error: "Insufficient stock".to_owned(),
        }
    }

    #[must_use]
    pub fn missing(sweet_id: SweetId, requested: i32) -> Self {
        Self {
            sweet_id,
            name: None,
            available: 0,
            requested,
            error: "Item no longer exists".to_owned(),
        }
    }
}

/// Outcome of an all-or-nothing stock decrement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockTake {
    /// Every request was satisfied. Records reflect the decremented stock,
    /// in request order.
    Taken(Vec<Sweet>),
    /// Nothing was decremented.
    Short(Vec<StockShortfall>),
}

/// Result of an atomic restock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restocked {
    pub previous_quantity: i32,
    pub sweet: Sweet,
}

/// Outcome of a restock against an existing sweet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestockOutcome {
    Restocked(Restocked),
    /// Stock would pass `i32::MAX`. Nothing changed.
    WouldOverflow { current: i32 },
}
