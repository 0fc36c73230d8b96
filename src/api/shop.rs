//! `/api/shop` handlers.

use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use crate::api::extract::{AuthUser, JsonBody, QueryParams, blocking};
use crate::api::game::PageQuery;
use crate::api::{ApiError, ApiResponse};
use crate::db::PurchaseReceipt;
use crate::services::{DEFAULT_HISTORY_LIMIT, PurchaseHistory, PurchaseRequest};
use crate::state::AppState;

/// Catalogue filter.
#[derive(Debug, Default, Deserialize)]
pub struct ItemsQuery {
    status: Option<String>,
    item_type: Option<String>,
}

/// `GET /api/shop/items`
#[instrument(skip(state))]
pub async fn items(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ItemsQuery>,
) -> Result<ApiResponse<Value>, ApiError> {
    let items = blocking(&state, move |s| {
        s.shop()
            .items(query.status.as_deref(), query.item_type.as_deref())
    })
    .await
    .map_err(|e| e.context("Error fetching shop items"))?;

    Ok(ApiResponse::ok(json!({ "count": items.len(), "items": items })))
}

/// `POST /api/shop/purchase`
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn purchase(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(request): JsonBody<PurchaseRequest>,
) -> Result<ApiResponse<PurchaseReceipt>, ApiError> {
    let user_id = *user.id();
    let receipt = blocking(&state, move |s| s.shop().purchase(user_id, request))
        .await
        .map_err(|e| e.context("Error processing purchase"))?;
    Ok(ApiResponse::ok(receipt).with_message("Purchase successful"))
}

/// `GET /api/shop/purchases`
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn purchases(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    QueryParams(query): QueryParams<PageQuery>,
) -> Result<ApiResponse<PurchaseHistory>, ApiError> {
    let user_id = *user.id();
    let page = query.page(DEFAULT_HISTORY_LIMIT);
    let history = blocking(&state, move |s| s.shop().purchases(user_id, page))
        .await
        .map_err(|e| e.context("Error fetching purchases"))?;
    Ok(ApiResponse::ok(history))
}

/// `GET /api/shop/inventory`
#[instrument(skip_all, fields(user_id = user.id()))]
pub async fn inventory(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<ApiResponse<Value>, ApiError> {
    let user_id = *user.id();
    let inventory = blocking(&state, move |s| s.shop().inventory(user_id))
        .await
        .map_err(|e| e.context("Error fetching inventory"))?;
    Ok(ApiResponse::ok(json!({ "count": inventory.len(), "inventory": inventory })))
}
