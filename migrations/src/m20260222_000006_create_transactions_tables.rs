use sea_orm_migration::prelude::*;

use crate::m20260222_000001_create_branches_table::Branches;
use crate::m20260222_000003_create_products_tables::Products;
use crate::m20260222_000004_create_menus_tables::Menus;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .big_integer()
                            .auto_increment()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::InvoiceNumber)
                            .string_len(50)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Transactions::BranchId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::Total)
                            .decimal_len(14, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::PaymentMethod)
                            .string_len(16)
                            .not_null()
                            .default("cash"),
                    )
                    .col(
                        ColumnDef::new(Transactions::AmountPaid)
                            .decimal_len(14, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::Change)
                            .decimal_len(14, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-branch_id")
                            .from(Transactions::Table, Transactions::BranchId)
                            .to(Branches::Table, Branches::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-created_at")
                    .table(Transactions::Table)
                    .col(Transactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TransactionItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TransactionItems::Id)
                            .big_integer()
                            .auto_increment()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TransactionItems::TransactionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TransactionItems::MenuId).big_integer().null())
                    .col(
                        ColumnDef::new(TransactionItems::MenuName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TransactionItems::Price)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TransactionItems::Quantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TransactionItems::Subtotal)
                            .decimal_len(14, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TransactionItems::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TransactionItems::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transaction_items-transaction_id")
                            .from(TransactionItems::Table, TransactionItems::TransactionId)
                            .to(Transactions::Table, Transactions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transaction_items-menu_id")
                            .from(TransactionItems::Table, TransactionItems::MenuId)
                            .to(Menus::Table, Menus::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TransactionItemDetails::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TransactionItemDetails::Id)
                            .big_integer()
                            .auto_increment()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TransactionItemDetails::TransactionItemId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TransactionItemDetails::ProductId)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(TransactionItemDetails::ProductName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TransactionItemDetails::UnitId)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(TransactionItemDetails::Quantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TransactionItemDetails::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TransactionItemDetails::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transaction_item_details-transaction_item_id")
                            .from(
                                TransactionItemDetails::Table,
                                TransactionItemDetails::TransactionItemId,
                            )
                            .to(TransactionItems::Table, TransactionItems::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transaction_item_details-product_id")
                            .from(
                                TransactionItemDetails::Table,
                                TransactionItemDetails::ProductId,
                            )
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(TransactionItemDetails::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(TransactionItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Transactions {
    Table,
    Id,
    InvoiceNumber,
    BranchId,
    UserId,
    Total,
    PaymentMethod,
    AmountPaid,
    Change,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum TransactionItems {
    Table,
    Id,
    TransactionId,
    MenuId,
    MenuName,
    Price,
    Quantity,
    Subtotal,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum TransactionItemDetails {
    Table,
    Id,
    TransactionItemId,
    ProductId,
    ProductName,
    UnitId,
    Quantity,
    CreatedAt,
    UpdatedAt,
}
