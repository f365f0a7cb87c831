//! Cart route handlers.
//!
//! Every cart endpoint answers with the populated cart and its totals.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tracing::instrument;

use super::{ApiResponse, IdInput, JsonBody, json_or_default};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::{Cart, CartView, Receipt};
use crate::services::cart::CartService;
use crate::services::catalog::parse_sweet_id;
use crate::services::checkout::CheckoutService;
use crate::state::AppState;

/// Add-to-cart body. Quantity defaults to 1.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemBody {
    pub sweet_id: Option<IdInput>,
    pub quantity: Option<i32>,
}

/// Set-quantity body.
#[derive(Debug, Default, Deserialize)]
pub struct SetQuantityBody {
    pub quantity: Option<i32>,
}

/// GET /api/cart
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(account): RequireAuth,
) -> Result<ApiResponse<CartView>> {
    let carts = CartService::new(state.storage());
    let cart = carts.get_or_create(account.id).await?;
    Ok(ApiResponse::ok(carts.view(cart).await?))
}

/// POST /api/cart
#[instrument(skip_all)]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(account): RequireAuth,
    body: JsonBody<AddItemBody>,
) -> Result<ApiResponse<CartView>> {
    let Json(body) = body?;
    let sweet_id = body
        .sweet_id
        .ok_or_else(|| AppError::InvalidInput("Sweet ID is required.".to_owned()))?
        .sweet_id()?;

    let carts = CartService::new(state.storage());
    let cart = carts
        .add_item(account.id, sweet_id, body.quantity.unwrap_or(1))
        .await?;

    let sweet = sweet_id.to_string();
    add_breadcrumb("cart", "Item added", Some(&[("sweet_id", sweet.as_str())]));
    respond(&carts, cart, "Item added to cart successfully").await
}

/// DELETE /api/cart
#[instrument(skip_all)]
pub async fn clear(
    State(state): State<AppState>,
    RequireAuth(account): RequireAuth,
) -> Result<ApiResponse<CartView>> {
    let carts = CartService::new(state.storage());
    let cart = carts.clear(account.id).await?;
    respond(&carts, cart, "Cart cleared successfully").await
}

/// Set a line's quantity. Zero removes the line.
///
/// PUT /api/cart/{sweetId}
#[instrument(skip_all)]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(account): RequireAuth,
    Path(sweet_id): Path<String>,
    body: JsonBody<SetQuantityBody>,
) -> Result<ApiResponse<CartView>> {
    let quantity = json_or_default(body)?
        .quantity
        .ok_or_else(|| AppError::InvalidInput("Valid quantity is required.".to_owned()))?;
    let sweet_id = parse_sweet_id(&sweet_id)?;

    let carts = CartService::new(state.storage());
    let cart = carts
        .set_item_quantity(account.id, sweet_id, quantity)
        .await?;

    let message = if quantity == 0 {
        "Item removed from cart"
    } else {
        "Cart updated successfully"
    };
    respond(&carts, cart, message).await
}

/// DELETE /api/cart/{sweetId}
#[instrument(skip_all)]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(account): RequireAuth,
    Path(sweet_id): Path<String>,
) -> Result<ApiResponse<CartView>> {
    let sweet_id = parse_sweet_id(&sweet_id)?;
    let carts = CartService::new(state.storage());
    let cart = carts.remove_item(account.id, sweet_id).await?;
    respond(&carts, cart, "Item removed from cart successfully").await
}

/// Buy everything in the cart.
///
/// POST /api/cart/checkout
#[instrument(skip_all)]
pub async fn checkout(
    State(state): State<AppState>,
    RequireAuth(account): RequireAuth,
) -> Result<ApiResponse<Receipt>> {
    let receipt = CheckoutService::new(state.storage())
        .checkout_cart(&account)
        .await?;

    add_breadcrumb(
        "checkout",
        "Cart checked out",
        Some(&[("order_id", receipt.order_id.as_str())]),
    );
    Ok(ApiResponse::ok(receipt).message("Purchase completed successfully"))
}

async fn respond(
    carts: &CartService<'_>,
    cart: Cart,
    message: &str,
) -> Result<ApiResponse<CartView>> {
    Ok(ApiResponse::ok(carts.view(cart).await?).message(message))
}
