pub use sea_orm_migration::prelude::*;

mod m20260222_000001_create_branches_table;
mod m20260222_000002_create_units_table;
mod m20260222_000003_create_products_tables;
mod m20260222_000004_create_menus_tables;
mod m20260222_000005_create_inventories_table;
mod m20260222_000006_create_transactions_tables;
mod m20260222_000007_create_cash_flows_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260222_000001_create_branches_table::Migration),
            Box::new(m20260222_000002_create_units_table::Migration),
            Box::new(m20260222_000003_create_products_tables::Migration),
            Box::new(m20260222_000004_create_menus_tables::Migration),
            Box::new(m20260222_000005_create_inventories_table::Migration),
            Box::new(m20260222_000006_create_transactions_tables::Migration),
            Box::new(m20260222_000007_create_cash_flows_table::Migration),
        ]
    }
}
