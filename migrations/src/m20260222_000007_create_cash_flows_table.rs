use sea_orm_migration::prelude::*;

use crate::m20260222_000001_create_branches_table::Branches;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CashFlows::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CashFlows::Id)
                            .big_integer()
                            .auto_increment()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CashFlows::BranchId).big_integer().null())
                    .col(ColumnDef::new(CashFlows::UserId).big_integer().null())
                    .col(ColumnDef::new(CashFlows::Type).string_len(16).not_null())
                    .col(ColumnDef::new(CashFlows::Category).string().not_null())
                    .col(
                        ColumnDef::new(CashFlows::Amount)
                            .decimal_len(15, 2)
                            .not_null(),
                    )
                    .col(ColumnDef::new(CashFlows::Description).text().null())
                    .col(ColumnDef::new(CashFlows::TransactionDate).date().not_null())
                    .col(ColumnDef::new(CashFlows::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(CashFlows::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-cash_flows-branch_id")
                            .from(CashFlows::Table, CashFlows::BranchId)
                            .to(Branches::Table, Branches::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-cash_flows-transaction_date")
                    .table(CashFlows::Table)
                    .col(CashFlows::TransactionDate)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CashFlows::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum CashFlows {
    Table,
    Id,
    BranchId,
    UserId,
    Type,
    Category,
    Amount,
    Description,
    TransactionDate,
    CreatedAt,
    UpdatedAt,
}
