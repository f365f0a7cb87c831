//! Domain models for the storefront.
//!
//! These are validated domain objects, separate from the database row types
//! in [`crate::db`]. Receipt types are response payloads only and are never
//! persisted.

pub mod account;
pub mod cart;
pub mod receipt;
pub mod sweet;

pub use account::{Account, AccountSummary, NewAccount};
pub use cart::{Cart, CartCheckout, CartItem, CartLine, CartTotals, CartView, PopulatedCart};
pub use receipt::{AccountRef, DirectPurchase, Receipt, ReceiptLine, RestockReport, order_id};
pub use sweet::{
    NewSweet, RestockOutcome, Restocked, StockRequest, StockShortfall, StockTake, Sweet, SweetFilter, SweetPatch,
};
