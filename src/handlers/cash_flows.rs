use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{delete, get},
    Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::{
    entities::cash_flow::CashFlowType,
    errors::ApiError,
    handlers::common::{
        created_response, default_page, default_per_page, map_service_error, no_content_response,
        success_response, validate_input, PaginationMeta,
    },
    services::cash_flow::{CashFlowFilter, NewCashFlowEntry},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct CashFlowListQuery {
    pub r#type: Option<CashFlowType>,
    pub category: Option<String>,
    pub branch_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

async fn list_cash_flows(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CashFlowListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = CashFlowFilter {
        r#type: query.r#type,
        category: query.category,
        branch_id: query.branch_id,
        start_date: query.start_date,
        end_date: query.end_date,
    };

    let (entries, total) = state
        .services
        .cash_flows
        .list(&filter, query.page, query.per_page)
        .await
        .map_err(map_service_error)?;
    let summary = state
        .services
        .cash_flows
        .summary(&filter)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({
        "items": entries,
        "summary": summary,
        "pagination": PaginationMeta::new(query.page, query.per_page, total),
    })))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCashFlowRequest {
    pub branch_id: Option<i64>,
    pub user_id: Option<i64>,
    pub r#type: CashFlowType,
    #[validate(length(min = 1))]
    pub category: String,
    pub amount: Decimal,
    pub description: Option<String>,
    pub transaction_date: NaiveDate,
}

async fn create_cash_flow(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateCashFlowRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let entry = state
        .services
        .cash_flows
        .append(NewCashFlowEntry {
            branch_id: payload.branch_id,
            user_id: payload.user_id,
            r#type: payload.r#type,
            category: payload.category,
            amount: payload.amount,
            description: payload.description,
            transaction_date: payload.transaction_date,
        })
        .await
        .map_err(map_service_error)?;

    Ok(created_response(entry))
}

async fn delete_cash_flow(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .cash_flows
        .delete(id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

pub fn cash_flow_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_cash_flows).post(create_cash_flow))
        .route("/:id", delete(delete_cash_flow))
}
