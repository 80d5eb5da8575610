use crate::{
    db::DbPool,
    entities::{
        cash_flow::{self, CashFlowType},
        CashFlow,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

/// Reserved category for ledger rows generated by the checkout engine.
/// These rows mirror a sale and may only disappear together with it.
pub const SALES_CATEGORY: &str = "penjualan_kasir";

/// A manual ledger entry.
#[derive(Debug, Clone)]
pub struct NewCashFlowEntry {
    pub branch_id: Option<i64>,
    pub user_id: Option<i64>,
    pub r#type: CashFlowType,
    pub category: String,
    pub amount: Decimal,
    pub description: Option<String>,
    pub transaction_date: NaiveDate,
}

/// Filters shared by the list and summary queries.
#[derive(Debug, Clone, Default)]
pub struct CashFlowFilter {
    pub r#type: Option<CashFlowType>,
    pub category: Option<String>,
    pub branch_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CashFlowSummary {
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub net_flow: Decimal,
}

/// Append-mostly financial ledger. Manual entries come in through
/// `append`; the checkout engine writes through `record_sale` inside its
/// own transaction.
#[derive(Clone)]
pub struct CashFlowService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl CashFlowService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Appends a manual ledger entry. The sales category is reserved for
    /// system-generated rows and rejected here.
    #[instrument(skip(self, entry), fields(category = %entry.category))]
    pub async fn append(&self, entry: NewCashFlowEntry) -> Result<cash_flow::Model, ServiceError> {
        if entry.category == SALES_CATEGORY {
            return Err(ServiceError::ValidationError(format!(
                "Category '{}' is reserved for system-generated entries",
                SALES_CATEGORY
            )));
        }
        if entry.amount < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Amount must not be negative".to_string(),
            ));
        }

        let now = Utc::now();
        let model = cash_flow::ActiveModel {
            branch_id: Set(entry.branch_id),
            user_id: Set(entry.user_id),
            r#type: Set(entry.r#type),
            category: Set(entry.category),
            amount: Set(entry.amount),
            description: Set(entry.description),
            transaction_date: Set(entry.transaction_date),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let saved = model.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CashFlowRecorded {
                entry_id: saved.id,
                r#type: saved.r#type,
                category: saved.category.clone(),
                amount: saved.amount,
                transaction_date: saved.transaction_date,
            })
            .await;

        Ok(saved)
    }

    /// Ledger write for a completed sale, called from inside the checkout
    /// transaction so the sale and its ledger mirror commit together.
    pub async fn record_sale<C: ConnectionTrait>(
        conn: &C,
        branch_id: i64,
        user_id: i64,
        total: Decimal,
        invoice_number: &str,
    ) -> Result<cash_flow::Model, ServiceError> {
        let now = Utc::now();
        let model = cash_flow::ActiveModel {
            branch_id: Set(Some(branch_id)),
            user_id: Set(Some(user_id)),
            r#type: Set(CashFlowType::Income),
            category: Set(SALES_CATEGORY.to_string()),
            amount: Set(total),
            description: Set(Some(format!(
                "Automatic cashier sale (Invoice: {})",
                invoice_number
            ))),
            transaction_date: Set(now.date_naive()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let saved = model.insert(conn).await?;
        Ok(saved)
    }

    /// Newest-first filtered page of ledger entries with the total row count.
    pub async fn list(
        &self,
        filter: &CashFlowFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<cash_flow::Model>, u64), ServiceError> {
        let query = apply_filter(CashFlow::find(), filter)
            .order_by_desc(cash_flow::Column::TransactionDate)
            .order_by_desc(cash_flow::Column::Id);

        let paginator = query.paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let entries = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((entries, total))
    }

    /// Income/expense/net totals under the given filters; the `type` filter
    /// is ignored here since both sides are always reported.
    pub async fn summary(&self, filter: &CashFlowFilter) -> Result<CashFlowSummary, ServiceError> {
        let total_income = self.sum_of(filter, CashFlowType::Income).await?;
        let total_expense = self.sum_of(filter, CashFlowType::Expense).await?;

        Ok(CashFlowSummary {
            total_income,
            total_expense,
            net_flow: total_income - total_expense,
        })
    }

    async fn sum_of(
        &self,
        filter: &CashFlowFilter,
        r#type: CashFlowType,
    ) -> Result<Decimal, ServiceError> {
        let filter = CashFlowFilter {
            r#type: Some(r#type),
            ..filter.clone()
        };

        let total = apply_filter(CashFlow::find(), &filter)
            .select_only()
            .column_as(Expr::col(cash_flow::Column::Amount).sum(), "total")
            .into_tuple::<Option<Decimal>>()
            .one(&*self.db)
            .await?;

        Ok(total.flatten().unwrap_or(Decimal::ZERO))
    }

    /// Deletes a manual ledger entry. Rows in the sales category are the
    /// financial mirror of a sale and are refused with `ProtectedEntry`;
    /// they go away only when the originating sale is purged.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        let entry = CashFlow::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cash flow entry {} not found", id)))?;

        if entry.category == SALES_CATEGORY {
            return Err(ServiceError::ProtectedEntry(format!(
                "Entries in category '{}' can only be removed by deleting their sale",
                SALES_CATEGORY
            )));
        }

        let category = entry.category.clone();
        entry.delete(&*self.db).await?;

        info!(id, category = %category, "Cash flow entry deleted");

        self.event_sender
            .send_or_log(Event::CashFlowDeleted {
                entry_id: id,
                category,
            })
            .await;

        Ok(())
    }
}

fn apply_filter(
    query: Select<CashFlow>,
    filter: &CashFlowFilter,
) -> Select<CashFlow> {
    let mut query = query;
    if let Some(t) = filter.r#type {
        query = query.filter(cash_flow::Column::Type.eq(t));
    }
    if let Some(category) = &filter.category {
        query = query.filter(cash_flow::Column::Category.eq(category.clone()));
    }
    if let Some(branch_id) = filter.branch_id {
        query = query.filter(cash_flow::Column::BranchId.eq(branch_id));
    }
    if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
        query = query.filter(cash_flow::Column::TransactionDate.between(start, end));
    }
    query
}
