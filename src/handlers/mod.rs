pub mod cash_flows;
pub mod checkout;
pub mod common;
pub mod inventory;
pub mod sales;

use crate::db::DbPool;
use crate::events::EventSender;
use axum::Router;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub checkout: Arc<crate::services::checkout::CheckoutService>,
    pub inventory: Arc<crate::services::inventory::InventoryService>,
    pub restock: Arc<crate::services::restock::RestockService>,
    pub cash_flows: Arc<crate::services::cash_flow::CashFlowService>,
    pub sales: Arc<crate::services::sales::SalesService>,
}

impl AppServices {
    /// Wires every service against one pool and one event channel.
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        let units = Arc::new(crate::services::units::UnitConversionService::new(
            db_pool.clone(),
        ));
        let recipes = Arc::new(crate::services::recipe::RecipeService::new(db_pool.clone()));

        let checkout = Arc::new(crate::services::checkout::CheckoutService::new(
            db_pool.clone(),
            event_sender.clone(),
            recipes,
        ));
        let inventory = Arc::new(crate::services::inventory::InventoryService::new(
            db_pool.clone(),
            event_sender.clone(),
            units,
        ));
        let restock = Arc::new(crate::services::restock::RestockService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let cash_flows = Arc::new(crate::services::cash_flow::CashFlowService::new(
            db_pool.clone(),
            event_sender,
        ));
        let sales = Arc::new(crate::services::sales::SalesService::new(db_pool));

        Self {
            checkout,
            inventory,
            restock,
            cash_flows,
            sales,
        }
    }
}

/// Versioned API surface consumed by the POS frontend.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/checkout", checkout::checkout_routes())
        .nest("/sales", sales::sales_routes())
        .nest("/inventory", inventory::inventory_routes())
        .nest("/cash-flows", cash_flows::cash_flow_routes())
}
