use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::{
    errors::ApiError,
    handlers::common::{
        default_page, default_per_page, map_service_error, success_response, PaginationMeta,
    },
    services::sales::SalesFilter,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct SalesListQuery {
    pub branch_id: Option<i64>,
    pub date: Option<NaiveDate>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

async fn list_sales(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SalesListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = SalesFilter {
        branch_id: query.branch_id,
        date: query.date,
    };

    let (sales, total, revenue) = state
        .services
        .sales
        .list(&filter, query.page, query.per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "items": sales,
        "total_revenue": revenue,
        "pagination": PaginationMeta::new(query.page, query.per_page, total),
    })))
}

async fn get_sale(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let receipt = state
        .services
        .sales
        .get_receipt(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(receipt))
}

pub fn sales_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_sales))
        .route("/:id", get(get_sale))
}
