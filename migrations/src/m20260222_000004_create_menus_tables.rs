use sea_orm_migration::prelude::*;

use crate::m20260222_000003_create_products_tables::Products;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Menus::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Menus::Id)
                            .big_integer()
                            .auto_increment()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Menus::Name).string().not_null())
                    .col(
                        ColumnDef::new(Menus::Price)
                            .decimal_len(12, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Menus::Category).string().null())
                    .col(
                        ColumnDef::new(Menus::IsFlexible)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Menus::DefaultQuantity)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(Menus::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Menus::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MenuItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MenuItems::Id)
                            .big_integer()
                            .auto_increment()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MenuItems::MenuId).big_integer().not_null())
                    .col(
                        ColumnDef::new(MenuItems::ProductId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MenuItems::Quantity).integer().not_null())
                    .col(ColumnDef::new(MenuItems::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(MenuItems::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-menu_items-menu_id")
                            .from(MenuItems::Table, MenuItems::MenuId)
                            .to(Menus::Table, Menus::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-menu_items-product_id")
                            .from(MenuItems::Table, MenuItems::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MenuItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Menus::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Menus {
    Table,
    Id,
    Name,
    Price,
    Category,
    IsFlexible,
    DefaultQuantity,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum MenuItems {
    Table,
    Id,
    MenuId,
    ProductId,
    Quantity,
    CreatedAt,
    UpdatedAt,
}
