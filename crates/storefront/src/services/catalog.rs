//! Catalog service: create, search, read, update and delete sweets.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use sweet_shop_core::{Category, Price, SweetId};

use crate::db::Storage;
use crate::error::{AppError, Result};
use crate::models::{Account, NewSweet, Sweet, SweetFilter, SweetPatch, sweet::DEFAULT_IMAGE_URL};

const NAME_MIN: usize = 2;
const NAME_MAX: usize = 100;
const DESCRIPTION_MAX: usize = 500;
const IMAGE_URL_MAX: usize = 2048;

/// Create or update request body. On update every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweetInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub quantity: Option<i32>,
}

/// Search query string. Bounds stay textual so malformed numbers can be
/// reported as bad input instead of a generic rejection.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweetQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<String>,
}

/// Parse a path segment into a sweet id.
///
/// # Errors
///
/// Returns `AppError::InvalidInput` for anything but a positive integer.
pub fn parse_sweet_id(raw: &str) -> Result<SweetId> {
    raw.parse()
        .map_err(|_| AppError::InvalidInput("Invalid sweet ID.".to_owned()))
}

/// Catalog service.
pub struct CatalogService<'a> {
    storage: &'a dyn Storage,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(storage: &'a dyn Storage) -> Self {
        Self { storage }
    }

    /// Create a sweet owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidInput` if name, description, price or
    /// category is missing, and `AppError::Validation` if any field violates
    /// its constraints.
    #[instrument(skip_all, fields(owner = %owner.id))]
    pub async fn create(&self, input: SweetInput, owner: &Account) -> Result<Sweet> {
        let (Some(name), Some(description), Some(price), Some(category)) = (
            present(input.name.as_deref()),
            present(input.description.as_deref()),
            input.price,
            present(input.category.as_deref()),
        ) else {
            return Err(AppError::InvalidInput(
                "Please provide name, description, price, and category.".to_owned(),
            ));
        };

        let mut problems = Vec::new();
        let name = check_name(name, &mut problems);
        let description = check_description(description, &mut problems);
        let price = check_price(price, &mut problems);
        let category = check_category(category, &mut problems);
        let image_url = check_image_url(input.image_url.as_deref(), &mut problems);
        let quantity = check_quantity(input.quantity.unwrap_or(0), &mut problems);

        let (Some(name), Some(description), Some(price), Some(category), Some(quantity)) =
            (name, description, price, category, quantity)
        else {
            return Err(AppError::Validation(problems));
        };
        if !problems.is_empty() {
            return Err(AppError::Validation(problems));
        }

        let sweet = self
            .storage
            .insert_sweet(
                NewSweet {
                    name,
                    description,
                    price,
                    category,
                    image_url: image_url.unwrap_or_else(|| DEFAULT_IMAGE_URL.to_owned()),
                    quantity,
                },
                owner.id,
            )
            .await?;

        tracing::info!(sweet_id = %sweet.id, name = %sweet.name, "Sweet created");
        Ok(sweet)
    }

    /// Search the catalog, newest first.
    ///
    /// An unknown category matches nothing rather than failing.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidInput` for a malformed price bound.
    pub async fn list(&self, query: &SweetQuery) -> Result<Vec<Sweet>> {
        let mut filter = SweetFilter {
            name: present(query.name.as_deref()).map(str::to_owned),
            min_price: price_bound("minPrice", query.min_price.as_deref())?,
            max_price: price_bound("maxPrice", query.max_price.as_deref())?,
            ..SweetFilter::default()
        };

        if let Some(raw) = present(query.category.as_deref()) {
            match raw.parse::<Category>() {
                Ok(category) => filter.category = Some(category),
                Err(_) => return Ok(Vec::new()),
            }
        }

        Ok(self.storage.list_sweets(&filter).await?)
    }

    /// Fetch one sweet.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the sweet does not exist.
    pub async fn get(&self, id: SweetId) -> Result<Sweet> {
        self.storage
            .sweet_by_id(id)
            .await?
            .ok_or_else(sweet_not_found)
    }

    /// Apply the provided fields. Only the owner or an admin may update.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound`, `AppError::Forbidden` or
    /// `AppError::Validation`.
    #[instrument(skip_all, fields(sweet_id = %id, actor = %actor.id))]
    pub async fn update(&self, id: SweetId, input: SweetInput, actor: &Account) -> Result<Sweet> {
        let existing = self.get(id).await?;
        if !actor.is_admin() && existing.created_by != actor.id {
            return Err(AppError::Forbidden(
                "You can only update sweets you created.".to_owned(),
            ));
        }

        let mut problems = Vec::new();
        let patch = SweetPatch {
            name: input
                .name
                .as_deref()
                .and_then(|v| check_name(v, &mut problems)),
            description: input
                .description
                .as_deref()
                .and_then(|v| check_description(v, &mut problems)),
            price: input.price.and_then(|v| check_price(v, &mut problems)),
            category: input
                .category
                .as_deref()
                .and_then(|v| check_category(v, &mut problems)),
            image_url: match input.image_url.as_deref() {
                Some(raw) => Some(
                    check_image_url(Some(raw), &mut problems)
                        .unwrap_or_else(|| DEFAULT_IMAGE_URL.to_owned()),
                ),
                None => None,
            },
            quantity: input
                .quantity
                .and_then(|v| check_quantity(v, &mut problems)),
        };
        if !problems.is_empty() {
            return Err(AppError::Validation(problems));
        }
        if patch.is_empty() {
            return Ok(existing);
        }

        let sweet = self
            .storage
            .update_sweet(id, &patch)
            .await?
            .ok_or_else(sweet_not_found)?;

        tracing::info!("Sweet updated");
        Ok(sweet)
    }

    /// Delete a sweet. Admin only. Returns the deleted record.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` for non-admins and `AppError::NotFound`
    /// if the sweet does not exist.
    #[instrument(skip_all, fields(sweet_id = %id, actor = %actor.id))]
    pub async fn delete(&self, id: SweetId, actor: &Account) -> Result<Sweet> {
        require_admin(actor)?;

        let sweet = self
            .storage
            .delete_sweet(id)
            .await?
            .ok_or_else(sweet_not_found)?;

        tracing::info!(name = %sweet.name, "Sweet deleted");
        Ok(sweet)
    }
}

/// Reject non-admin actors.
///
/// # Errors
///
/// Returns `AppError::Forbidden` unless `actor` is an admin.
pub fn require_admin(actor: &Account) -> Result<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Access denied. Admin privileges required.".to_owned(),
        ))
    }
}

pub(crate) fn sweet_not_found() -> AppError {
    AppError::NotFound("Sweet not found.".to_owned())
}

/// Trimmed value, or `None` if absent or blank.
fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn price_bound(param: &str, raw: Option<&str>) -> Result<Option<Price>> {
    let Some(raw) = present(raw) else {
        return Ok(None);
    };
    // Bounds above the storable range match everything up to the top.
    raw.parse::<Decimal>()
        .ok()
        .and_then(|amount| Price::new(amount.min(Price::MAX.amount())).ok())
        .map(Some)
        .ok_or_else(|| AppError::InvalidInput(format!("{param} must be a non-negative number")))
}

fn check_name(raw: &str, problems: &mut Vec<String>) -> Option<String> {
    let name = raw.trim();
    let len = name.chars().count();
    if len < NAME_MIN {
        problems.push(format!("Name must be at least {NAME_MIN} characters"));
        return None;
    }
    if len > NAME_MAX {
        problems.push(format!("Name cannot exceed {NAME_MAX} characters"));
        return None;
    }
    Some(name.to_owned())
}

fn check_description(raw: &str, problems: &mut Vec<String>) -> Option<String> {
    let description = raw.trim();
    if description.is_empty() {
        problems.push("Description is required".to_owned());
        return None;
    }
    if description.chars().count() > DESCRIPTION_MAX {
        problems.push(format!(
            "Description cannot exceed {DESCRIPTION_MAX} characters"
        ));
        return None;
    }
    Some(description.to_owned())
}

fn check_price(raw: Decimal, problems: &mut Vec<String>) -> Option<Price> {
    Price::new(raw)
        .map_err(|e| problems.push(e.to_string()))
        .ok()
}

fn check_category(raw: &str, problems: &mut Vec<String>) -> Option<Category> {
    raw.parse::<Category>()
        .map_err(|e| problems.push(e.to_string()))
        .ok()
}

fn check_quantity(raw: i32, problems: &mut Vec<String>) -> Option<i32> {
    if raw < 0 {
        problems.push("Quantity cannot be negative".to_owned());
        return None;
    }
    Some(raw)
}

/// `None` means "use the default image".
fn check_image_url(raw: Option<&str>, problems: &mut Vec<String>) -> Option<String> {
    let url = present(raw)?;
    if url.len() > IMAGE_URL_MAX {
        problems.push(format!("Image URL cannot exceed {IMAGE_URL_MAX} characters"));
        return None;
    }
    Some(url.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::db::AccountStore;
    use crate::models::NewAccount;
    use sweet_shop_core::{Email, Role, Username};

    async fn account(store: &MemoryStore, name: &str, role: Role) -> Account {
        store
            .insert_account(NewAccount {
                username: Username::parse(name).unwrap(),
                email: Email::parse(&format!("{name}@example.com")).unwrap(),
                password_hash: String::new(),
                role,
            })
            .await
            .unwrap()
    }

    fn input(name: &str, cents: i64, category: &str) -> SweetInput {
        SweetInput {
            name: Some(name.to_owned()),
            description: Some(format!("{name}, freshly made")),
            price: Some(Decimal::new(cents, 2)),
            category: Some(category.to_owned()),
            image_url: None,
            quantity: Some(10),
        }
    }

    #[tokio::test]
    async fn test_create_applies_defaults() {
        let store = MemoryStore::new();
        let owner = account(&store, "maker", Role::User).await;
        let catalog = CatalogService::new(&store);

        let mut request = input("  Sea Salt Caramel ", 450, "Candy");
        request.quantity = None;
        let sweet = catalog.create(request, &owner).await.unwrap();

        assert_eq!(sweet.name, "Sea Salt Caramel");
        assert_eq!(sweet.category, Category::Candy);
        assert_eq!(sweet.image_url, DEFAULT_IMAGE_URL);
        assert_eq!(sweet.quantity, 0);
        assert_eq!(sweet.created_by, owner.id);
    }

    #[tokio::test]
    async fn test_create_missing_and_invalid() {
        let store = MemoryStore::new();
        let owner = account(&store, "maker", Role::User).await;
        let catalog = CatalogService::new(&store);

        let mut missing = input("Fudge", 100, "chocolate");
        missing.price = None;
        assert!(matches!(
            catalog.create(missing, &owner).await,
            Err(AppError::InvalidInput(_))
        ));

        let mut invalid = input("F", -100, "licorice");
        invalid.quantity = Some(-1);
        let Err(AppError::Validation(problems)) = catalog.create(invalid, &owner).await else {
            panic!("expected validation error");
        };
        assert_eq!(problems.len(), 4);
        assert!(problems.contains(&"licorice is not a valid category".to_owned()));
    }

    #[tokio::test]
    async fn test_create_rejects_unstorable_price() {
        let store = MemoryStore::new();
        let owner = account(&store, "maker", Role::User).await;
        let catalog = CatalogService::new(&store);

        let mut huge = input("Gold Leaf Truffle", 100, "chocolate");
        huge.price = Some(Decimal::from_scientific("1e28").unwrap());
        let Err(AppError::Validation(problems)) = catalog.create(huge, &owner).await else {
            panic!("expected validation error");
        };
        assert_eq!(problems, vec!["Price cannot exceed 9999999999.99".to_owned()]);
        assert!(catalog.list(&SweetQuery::default()).await.unwrap().is_empty());

        let top = catalog
            .create(input("Gold Leaf Truffle", 999_999_999_999, "chocolate"), &owner)
            .await
            .unwrap();
        let all = catalog
            .list(&SweetQuery {
                max_price: Some("99999999999999".to_owned()),
                ..SweetQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(all[0].id, top.id);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let store = MemoryStore::new();
        let owner = account(&store, "maker", Role::User).await;
        let catalog = CatalogService::new(&store);

        catalog.create(input("Dark Truffle", 300, "chocolate"), &owner).await.unwrap();
        catalog.create(input("Sour Worms", 150, "gummy"), &owner).await.unwrap();
        catalog.create(input("Milk Truffle", 250, "chocolate"), &owner).await.unwrap();

        let all = catalog.list(&SweetQuery::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].name, "Milk Truffle");

        let truffles = catalog
            .list(&SweetQuery {
                name: Some("TRUFFLE".to_owned()),
                max_price: Some("2.50".to_owned()),
                ..SweetQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(truffles.len(), 1);
        assert_eq!(truffles[0].name, "Milk Truffle");

        let gummies = catalog
            .list(&SweetQuery {
                category: Some("Gummy".to_owned()),
                ..SweetQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(gummies.len(), 1);

        let unknown = catalog
            .list(&SweetQuery {
                category: Some("licorice".to_owned()),
                ..SweetQuery::default()
            })
            .await
            .unwrap();
        assert!(unknown.is_empty());

        let bad = catalog
            .list(&SweetQuery {
                min_price: Some("cheap".to_owned()),
                ..SweetQuery::default()
            })
            .await;
        assert!(matches!(bad, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_update_ownership() {
        let store = MemoryStore::new();
        let owner = account(&store, "maker", Role::User).await;
        let stranger = account(&store, "stranger", Role::User).await;
        let admin = account(&store, "admin", Role::Admin).await;
        let catalog = CatalogService::new(&store);

        let sweet = catalog.create(input("Toffee", 200, "candy"), &owner).await.unwrap();
        let change = SweetInput {
            price: Some(Decimal::new(225, 2)),
            ..SweetInput::default()
        };

        assert!(matches!(
            catalog.update(sweet.id, change.clone(), &stranger).await,
            Err(AppError::Forbidden(_))
        ));
        let updated = catalog.update(sweet.id, change.clone(), &owner).await.unwrap();
        assert_eq!(updated.price, Price::from_cents(225).unwrap());
        assert_eq!(updated.name, "Toffee");
        assert!(catalog.update(sweet.id, change, &admin).await.is_ok());

        let invalid = SweetInput {
            name: Some("x".to_owned()),
            ..SweetInput::default()
        };
        assert!(matches!(
            catalog.update(sweet.id, invalid, &owner).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            catalog
                .update(SweetId::new(999), SweetInput::default(), &admin)
                .await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_requires_admin() {
        let store = MemoryStore::new();
        let owner = account(&store, "maker", Role::User).await;
        let admin = account(&store, "admin", Role::Admin).await;
        let catalog = CatalogService::new(&store);

        let sweet = catalog.create(input("Lolly", 50, "lollipop"), &owner).await.unwrap();

        assert!(matches!(
            catalog.delete(sweet.id, &owner).await,
            Err(AppError::Forbidden(_))
        ));
        let deleted = catalog.delete(sweet.id, &admin).await.unwrap();
        assert_eq!(deleted.id, sweet.id);
        assert!(matches!(
            catalog.delete(sweet.id, &admin).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_parse_sweet_id() {
        assert_eq!(parse_sweet_id("12").unwrap(), SweetId::new(12));
        assert!(matches!(
            parse_sweet_id("abc"),
            Err(AppError::InvalidInput(_))
        ));
    }
}
