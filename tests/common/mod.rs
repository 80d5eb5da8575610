#![allow(dead_code)] // each test binary uses a subset of these helpers

use std::sync::Arc;

use chrono::Utc;
use kasir_api::{
    db::{self, DbConfig},
    entities::{branch, menu, menu_item, product, product_unit, unit},
    events,
    handlers::AppServices,
    services::inventory::InventoryService,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

/// Test harness backed by a fresh in-memory SQLite database.
///
/// The pool is pinned to a single connection: every pooled connection gets
/// its own `:memory:` database, so more than one would see an empty schema.
pub struct TestApp {
    pub db: Arc<DatabaseConnection>,
    pub services: AppServices,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let config = DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let pool = db::establish_connection_with_config(&config)
            .await
            .expect("db connect");
        db::run_migrations(&pool).await.expect("migrations");

        let db = Arc::new(pool);
        let (event_sender, event_rx) = events::channel(100);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(db.clone(), event_sender);

        Self {
            db,
            services,
            _event_task: event_task,
        }
    }

    pub async fn create_branch(&self, name: &str) -> i64 {
        let now = Utc::now();
        branch::ActiveModel {
            name: Set(name.to_string()),
            address: Set(None),
            phone: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .expect("insert branch")
        .id
    }

    pub async fn create_unit(&self, name: &str) -> i64 {
        let now = Utc::now();
        unit::ActiveModel {
            name: Set(name.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .expect("insert unit")
        .id
    }

    pub async fn create_product(&self, name: &str, base_unit_id: Option<i64>) -> product::Model {
        let now = Utc::now();
        product::ActiveModel {
            name: Set(name.to_string()),
            sku: Set(None),
            price: Set(Decimal::ZERO),
            category: Set(None),
            base_unit_id: Set(base_unit_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .expect("insert product")
    }

    pub async fn create_conversion(&self, product_id: i64, unit_id: i64, conversion_value: i32) {
        let now = Utc::now();
        product_unit::ActiveModel {
            product_id: Set(product_id),
            unit_id: Set(unit_id),
            conversion_value: Set(conversion_value),
            selling_price: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .expect("insert conversion");
    }

    /// Creates a menu with the given recipe lines (product id, quantity per
    /// sale). For flexible menus the recipe acts as the default composition.
    pub async fn create_menu(
        &self,
        name: &str,
        price: Decimal,
        is_flexible: bool,
        default_quantity: i32,
        recipe: &[(i64, i32)],
    ) -> menu::Model {
        let now = Utc::now();
        let menu = menu::ActiveModel {
            name: Set(name.to_string()),
            price: Set(price),
            category: Set(None),
            is_flexible: Set(is_flexible),
            default_quantity: Set(default_quantity),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .expect("insert menu");

        for (product_id, quantity) in recipe {
            menu_item::ActiveModel {
                menu_id: Set(menu.id),
                product_id: Set(*product_id),
                quantity: Set(*quantity),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&*self.db)
            .await
            .expect("insert menu item");
        }

        menu
    }

    /// Seeds stock through the same absolute-overwrite path restock uses.
    pub async fn set_stock(&self, branch_id: i64, product_id: i64, stock: i32) {
        InventoryService::set_absolute(&*self.db, branch_id, product_id, stock)
            .await
            .expect("set stock");
    }

    pub async fn stock(&self, branch_id: i64, product_id: i64) -> i32 {
        self.services
            .inventory
            .get_stock(branch_id, product_id)
            .await
            .expect("get stock")
    }
}
