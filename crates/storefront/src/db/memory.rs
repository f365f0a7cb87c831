//! In-memory [`Storage`] for tests.
//!
//! Enabled by the `test-fixtures` feature. All state sits behind one async
//! mutex, so every operation is atomic with respect to the others, which
//! gives the same all-or-nothing stock semantics as the `PostgreSQL`
//! implementation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use sweet_shop_core::{AccountId, CartId, Email, SweetId};

use super::accounts::{EMAIL_FIELD, USERNAME_FIELD};
use super::{AccountStore, CartStore, RepositoryError, Storage, SweetStore};
use crate::models::{
    Account, Cart, CartCheckout, CartItem, NewAccount, NewSweet, RestockOutcome, Restocked,
    StockRequest, StockShortfall, StockTake, Sweet, SweetFilter, SweetPatch,
};

#[derive(Default)]
struct State {
    accounts: BTreeMap<AccountId, (Account, String)>,
    sweets: BTreeMap<SweetId, Sweet>,
    carts: BTreeMap<AccountId, Cart>,
    next_account: i32,
    next_sweet: i32,
    next_cart: i32,
}

impl State {
    fn take_stock(&mut self, requests: &[StockRequest]) -> StockTake {
        let mut remaining: BTreeMap<SweetId, i32> = BTreeMap::new();
        let mut shortfalls = Vec::new();

        for request in requests {
            let Some(sweet) = self.sweets.get(&request.sweet_id) else {
                shortfalls.push(StockShortfall::missing(request.sweet_id, request.quantity));
                continue;
            };
            let left = remaining.entry(sweet.id).or_insert(sweet.quantity);
            if *left < request.quantity {
                let mut seen = sweet.clone();
                seen.quantity = *left;
                shortfalls.push(StockShortfall::insufficient(&seen, request.quantity));
            } else {
                *left -= request.quantity;
            }
        }
        if !shortfalls.is_empty() {
            return StockTake::Short(shortfalls);
        }

        let now = Utc::now();
        let mut taken = Vec::with_capacity(requests.len());
        for request in requests {
            if let Some(sweet) = self.sweets.get_mut(&request.sweet_id) {
                sweet.quantity -= request.quantity;
                sweet.updated_at = now;
                taken.push(sweet.clone());
            }
        }
        StockTake::Taken(taken)
    }
}

/// Mutex-guarded maps standing in for the database.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn insert_account(&self, account: NewAccount) -> Result<Account, RepositoryError> {
        let mut state = self.state.lock().await;

        if state.accounts.values().any(|(a, _)| a.email == account.email) {
            return Err(RepositoryError::Conflict(EMAIL_FIELD.to_owned()));
        }
        if state
            .accounts
            .values()
            .any(|(a, _)| a.username == account.username)
        {
            return Err(RepositoryError::Conflict(USERNAME_FIELD.to_owned()));
        }

        state.next_account += 1;
        let now = Utc::now();
        let stored = Account {
            id: AccountId::new(state.next_account),
            username: account.username,
            email: account.email,
            role: account.role,
            created_at: now,
            updated_at: now,
        };
        state
            .accounts
            .insert(stored.id, (stored.clone(), account.password_hash));
        Ok(stored)
    }

    async fn account_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.accounts.get(&id).map(|(a, _)| a.clone()))
    }

    async fn credentials_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(Account, String)>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .accounts
            .values()
            .find(|(a, _)| &a.email == email)
            .cloned())
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.accounts.values().map(|(a, _)| a.clone()).collect())
    }
}

#[async_trait]
impl SweetStore for MemoryStore {
    async fn insert_sweet(
        &self,
        sweet: NewSweet,
        owner: AccountId,
    ) -> Result<Sweet, RepositoryError> {
        let mut state = self.state.lock().await;
        state.next_sweet += 1;
        let now = Utc::now();
        let stored = Sweet {
            id: SweetId::new(state.next_sweet),
            name: sweet.name,
            description: sweet.description,
            price: sweet.price,
            category: sweet.category,
            image_url: sweet.image_url,
            quantity: sweet.quantity,
            created_by: owner,
            created_at: now,
            updated_at: now,
        };
        state.sweets.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn sweet_by_id(&self, id: SweetId) -> Result<Option<Sweet>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.sweets.get(&id).cloned())
    }

    async fn sweets_by_ids(&self, ids: &[SweetId]) -> Result<Vec<Sweet>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.sweets.get(id).cloned())
            .collect())
    }

    async fn list_sweets(&self, filter: &SweetFilter) -> Result<Vec<Sweet>, RepositoryError> {
        let state = self.state.lock().await;
        // Ids grow with creation time, so reverse id order is newest first.
        Ok(state
            .sweets
            .values()
            .rev()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect())
    }

    async fn update_sweet(
        &self,
        id: SweetId,
        patch: &SweetPatch,
    ) -> Result<Option<Sweet>, RepositoryError> {
        let mut state = self.state.lock().await;
        Ok(state.sweets.get_mut(&id).map(|sweet| {
            patch.apply_to(sweet);
            sweet.updated_at = Utc::now();
            sweet.clone()
        }))
    }

    async fn delete_sweet(&self, id: SweetId) -> Result<Option<Sweet>, RepositoryError> {
        let mut state = self.state.lock().await;
        let removed = state.sweets.remove(&id);
        if removed.is_some() {
            for cart in state.carts.values_mut() {
                cart.remove(id);
            }
        }
        Ok(removed)
    }

    async fn restock(
        &self,
        id: SweetId,
        amount: i32,
    ) -> Result<Option<RestockOutcome>, RepositoryError> {
        let mut state = self.state.lock().await;
        let Some(sweet) = state.sweets.get_mut(&id) else {
            return Ok(None);
        };

        let previous_quantity = sweet.quantity;
        let Some(quantity) = previous_quantity.checked_add(amount) else {
            return Ok(Some(RestockOutcome::WouldOverflow {
                current: previous_quantity,
            }));
        };
        sweet.quantity = quantity;
        sweet.updated_at = Utc::now();

        Ok(Some(RestockOutcome::Restocked(Restocked {
            previous_quantity,
            sweet: sweet.clone(),
        })))
    }

    async fn take_stock(&self, requests: &[StockRequest]) -> Result<StockTake, RepositoryError> {
        let mut state = self.state.lock().await;
        Ok(state.take_stock(requests))
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn load_cart(&self, account: AccountId) -> Result<Cart, RepositoryError> {
        let mut state = self.state.lock().await;
        if let Some(cart) = state.carts.get(&account) {
            return Ok(cart.clone());
        }

        state.next_cart += 1;
        let now = Utc::now();
        let cart = Cart {
            id: CartId::new(state.next_cart),
            account_id: account,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        state.carts.insert(account, cart.clone());
        Ok(cart)
    }

    async fn save_cart(&self, cart: &Cart) -> Result<Cart, RepositoryError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        // Lines whose sweet was deleted meanwhile are dropped, like the FK cascade.
        let items: Vec<CartItem> = cart
            .items
            .iter()
            .filter(|item| state.sweets.contains_key(&item.sweet_id))
            .copied()
            .collect();

        let stored = state
            .carts
            .get_mut(&cart.account_id)
            .filter(|stored| stored.id == cart.id)
            .ok_or(RepositoryError::NotFound)?;
        stored.items = items;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn check_out(&self, account: AccountId) -> Result<CartCheckout, RepositoryError> {
        let mut state = self.state.lock().await;
        let items = state
            .carts
            .get(&account)
            .map(|cart| cart.items.clone())
            .unwrap_or_default();
        if items.is_empty() {
            return Ok(CartCheckout {
                items,
                stock: StockTake::Taken(Vec::new()),
            });
        }

        let stock = state.take_stock(&StockRequest::for_items(&items));
        if matches!(stock, StockTake::Taken(_))
            && let Some(stored) = state.carts.get_mut(&account)
        {
            stored.items.clear();
            stored.updated_at = Utc::now();
        }
        Ok(CartCheckout { items, stock })
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
