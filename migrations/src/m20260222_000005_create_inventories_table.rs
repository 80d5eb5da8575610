use sea_orm_migration::prelude::*;

use crate::m20260222_000001_create_branches_table::Branches;
use crate::m20260222_000003_create_products_tables::Products;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Inventories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Inventories::Id)
                            .big_integer()
                            .auto_increment()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Inventories::BranchId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Inventories::ProductId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Inventories::Stock)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Inventories::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Inventories::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-inventories-branch_id")
                            .from(Inventories::Table, Inventories::BranchId)
                            .to(Branches::Table, Branches::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-inventories-product_id")
                            .from(Inventories::Table, Inventories::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One stock row per branch per product; the upsert paths rely on this.
        manager
            .create_index(
                Index::create()
                    .name("idx-inventories-branch-product")
                    .table(Inventories::Table)
                    .col(Inventories::BranchId)
                    .col(Inventories::ProductId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Inventories::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Inventories {
    Table,
    Id,
    BranchId,
    ProductId,
    Stock,
    CreatedAt,
    UpdatedAt,
}
