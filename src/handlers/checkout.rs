use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::post,
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::{
    entities::transaction::PaymentMethod,
    errors::ApiError,
    handlers::common::{created_response, map_service_error, validate_input},
    services::{
        checkout::{CartLineInput, CheckoutCommand},
        recipe::IngredientLineInput,
    },
    AppState,
};

#[derive(Debug, Deserialize, Serialize)]
pub struct IngredientLineRequest {
    pub product_id: i64,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CheckoutItemRequest {
    pub menu_id: i64,
    pub quantity: i32,
    /// Composition override; only meaningful for flexible menus.
    #[serde(default)]
    pub details: Vec<IngredientLineRequest>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    pub branch_id: i64,
    pub cashier_id: i64,
    pub payment_method: PaymentMethod,
    pub amount_paid: Decimal,
    #[validate(length(min = 1))]
    pub items: Vec<CheckoutItemRequest>,
}

async fn checkout(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let command = CheckoutCommand {
        branch_id: payload.branch_id,
        cashier_id: payload.cashier_id,
        payment_method: payload.payment_method,
        amount_paid: payload.amount_paid,
        items: payload
            .items
            .into_iter()
            .map(|item| CartLineInput {
                menu_id: item.menu_id,
                quantity: item.quantity,
                details: item
                    .details
                    .into_iter()
                    .map(|d| IngredientLineInput {
                        product_id: d.product_id,
                        quantity: d.quantity,
                    })
                    .collect(),
            })
            .collect(),
    };

    let receipt = state
        .services
        .checkout
        .checkout(command)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(receipt))
}

pub fn checkout_routes() -> Router<Arc<AppState>> {
    Router::new().route("/", post(checkout))
}
