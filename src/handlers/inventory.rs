use axum::{
    extract::{Json, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::{
    entities::{inventory, product},
    errors::ApiError,
    handlers::common::{map_service_error, success_response, validate_input},
    services::{
        inventory::{AdjustDirection, AdjustInventoryCommand},
        restock::RestockItem,
    },
    AppState,
};

#[derive(Debug, Serialize)]
pub struct InventoryRow {
    #[serde(flatten)]
    pub inventory: inventory::Model,
    pub product: Option<product::Model>,
}

#[derive(Debug, Deserialize)]
pub struct InventoryListQuery {
    pub branch_id: i64,
}

async fn list_inventory(
    State(state): State<Arc<AppState>>,
    Query(query): Query<InventoryListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state
        .services
        .inventory
        .list_for_branch(query.branch_id)
        .await
        .map_err(map_service_error)?;

    let rows: Vec<InventoryRow> = rows
        .into_iter()
        .map(|(inventory, product)| InventoryRow { inventory, product })
        .collect();

    Ok(success_response(rows))
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdjustInventoryRequest {
    pub branch_id: i64,
    pub product_id: i64,
    /// Magnitude of the adjustment, in `unit_id` units when given.
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub unit_id: Option<i64>,
    pub direction: AdjustDirection,
}

async fn adjust_inventory(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AdjustInventoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let stock = state
        .services
        .inventory
        .adjust(AdjustInventoryCommand {
            branch_id: payload.branch_id,
            product_id: payload.product_id,
            quantity: payload.quantity,
            unit_id: payload.unit_id,
            direction: payload.direction,
        })
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "stock": stock })))
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct RestockItemRequest {
    pub product_id: i64,
    #[validate(range(min = 0))]
    pub stock: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DailyRestockRequest {
    pub branch_id: i64,
    #[validate(length(min = 1))]
    pub items: Vec<RestockItemRequest>,
}

async fn daily_restock(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DailyRestockRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let items: Vec<RestockItem> = payload
        .items
        .into_iter()
        .map(|i| RestockItem {
            product_id: i.product_id,
            stock: i.stock,
        })
        .collect();

    let imported = state
        .services
        .restock
        .import_daily_stock(payload.branch_id, items)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "imported": imported })))
}

pub fn inventory_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_inventory))
        .route("/adjust", post(adjust_inventory))
        .route("/daily-restock", post(daily_restock))
}
