//! Business logic services for the storefront.
//!
//! Each service borrows the storage backend for the duration of one request.
//!
//! - `auth` - Registration, login and bearer tokens
//! - `catalog` - Sweet CRUD and search
//! - `cart` - Per-account cart editing
//! - `checkout` - Cart checkout and direct purchase
//! - `inventory` - Admin restocking

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod inventory;
