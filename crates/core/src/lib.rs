//! Sweet Shop Core - Shared domain types.
//!
//! This crate provides the types used across all Sweet Shop components:
//! - `storefront` - JSON API for the catalog, carts and checkout
//! - `cli` - Migrations and account administration
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database
//! access, no HTTP. The optional `postgres` feature adds `sqlx` encoding.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, emails, usernames, prices, roles and categories

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
