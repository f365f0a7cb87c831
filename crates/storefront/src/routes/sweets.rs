//! Catalog, purchase and restock route handlers.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
};
use serde::Deserialize;
use tracing::instrument;

use sweet_shop_core::SweetId;

use super::{ApiResponse, IdInput, JsonBody, json_or_default};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::{Account, DirectPurchase, RestockReport, Sweet};
use crate::services::catalog::{CatalogService, SweetInput, SweetQuery, parse_sweet_id};
use crate::services::checkout::CheckoutService;
use crate::services::inventory::InventoryService;
use crate::state::AppState;

/// Quantity body for purchase and restock. Purchases default to 1.
#[derive(Debug, Default, Deserialize)]
pub struct QuantityBody {
    pub quantity: Option<i32>,
}

/// Legacy purchase body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyPurchaseBody {
    pub sweet_id: Option<IdInput>,
    pub quantity: Option<i32>,
}

/// List sweets, newest first.
///
/// GET /api/sweets
pub async fn index(
    State(state): State<AppState>,
    query: std::result::Result<Query<SweetQuery>, QueryRejection>,
) -> Result<ApiResponse<Vec<Sweet>>> {
    let Query(query) = query?;
    let sweets = CatalogService::new(state.storage()).list(&query).await?;
    let count = sweets.len();
    Ok(ApiResponse::ok(sweets).count(count))
}

/// Search sweets, echoing the applied filters.
///
/// GET /api/sweets/search
pub async fn search(
    State(state): State<AppState>,
    query: std::result::Result<Query<SweetQuery>, QueryRejection>,
) -> Result<ApiResponse<Vec<Sweet>>> {
    let Query(query) = query?;
    let sweets = CatalogService::new(state.storage()).list(&query).await?;
    let count = sweets.len();
    let echo = serde_json::to_value(&query).map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(ApiResponse::ok(sweets).count(count).query(echo))
}

/// GET /api/sweets/{id}
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Sweet>> {
    let id = parse_sweet_id(&id)?;
    let sweet = CatalogService::new(state.storage()).get(id).await?;
    Ok(ApiResponse::ok(sweet))
}

/// Create a sweet owned by the caller.
///
/// POST /api/sweets
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(account): RequireAuth,
    body: JsonBody<SweetInput>,
) -> Result<ApiResponse<Sweet>> {
    let Json(input) = body?;
    let sweet = CatalogService::new(state.storage())
        .create(input, &account)
        .await?;
    Ok(ApiResponse::created(sweet).message("Sweet created successfully"))
}

/// PUT /api/sweets/{id}
#[instrument(skip_all)]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(account): RequireAuth,
    Path(id): Path<String>,
    body: JsonBody<SweetInput>,
) -> Result<ApiResponse<Sweet>> {
    let id = parse_sweet_id(&id)?;
    let Json(input) = body?;
    let sweet = CatalogService::new(state.storage())
        .update(id, input, &account)
        .await?;
    Ok(ApiResponse::ok(sweet).message("Sweet updated successfully"))
}

/// DELETE /api/sweets/{id}
#[instrument(skip_all)]
pub async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(account): RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<Sweet>> {
    let id = parse_sweet_id(&id)?;
    let sweet = CatalogService::new(state.storage())
        .delete(id, &account)
        .await?;
    Ok(ApiResponse::ok(sweet).message("Sweet deleted successfully"))
}

/// Buy units of one sweet directly.
///
/// POST /api/sweets/{id}/purchase
#[instrument(skip_all)]
pub async fn purchase(
    State(state): State<AppState>,
    RequireAuth(account): RequireAuth,
    Path(id): Path<String>,
    body: JsonBody<QuantityBody>,
) -> Result<ApiResponse<DirectPurchase>> {
    let id = parse_sweet_id(&id)?;
    let quantity = json_or_default(body)?.quantity.unwrap_or(1);
    purchase_response(&state, &account, id, quantity).await
}

/// Legacy direct purchase with the sweet ID in the body.
///
/// POST /api/purchase
#[instrument(skip_all)]
pub async fn legacy_purchase(
    State(state): State<AppState>,
    RequireAuth(account): RequireAuth,
    body: JsonBody<LegacyPurchaseBody>,
) -> Result<ApiResponse<DirectPurchase>> {
    let body = json_or_default(body)?;
    let id = body
        .sweet_id
        .ok_or_else(|| AppError::InvalidInput("Sweet ID is required.".to_owned()))?
        .sweet_id()?;
    purchase_response(&state, &account, id, body.quantity.unwrap_or(1)).await
}

async fn purchase_response(
    state: &AppState,
    account: &Account,
    id: SweetId,
    quantity: i32,
) -> Result<ApiResponse<DirectPurchase>> {
    let purchase = CheckoutService::new(state.storage())
        .purchase_direct(account, id, quantity)
        .await?;

    add_breadcrumb(
        "purchase",
        "Direct purchase",
        Some(&[("order_id", purchase.order_id.as_str())]),
    );
    let message = format!(
        "Successfully purchased {} {}(s)",
        purchase.purchased_quantity, purchase.sweet.name
    );
    Ok(ApiResponse::ok(purchase).message(message))
}

/// Add stock to a sweet.
///
/// POST /api/sweets/{id}/restock
#[instrument(skip_all)]
pub async fn restock(
    State(state): State<AppState>,
    RequireAdmin(account): RequireAdmin,
    Path(id): Path<String>,
    body: JsonBody<QuantityBody>,
) -> Result<ApiResponse<RestockReport>> {
    let id = parse_sweet_id(&id)?;
    let amount = json_or_default(body)?.quantity.unwrap_or(0);
    let report = InventoryService::new(state.storage())
        .restock(id, amount, &account)
        .await?;

    let message = format!(
        "Successfully restocked {} {}(s)",
        report.restocked_quantity, report.sweet.name
    );
    Ok(ApiResponse::ok(report).message(message))
}
