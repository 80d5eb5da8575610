use crate::{
    db::DbPool,
    entities::{
        transaction, transaction_item, transaction_item_detail, Transaction, TransactionItem,
        TransactionItemDetail,
    },
    errors::ServiceError,
};
use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Select,
};
use serde::Serialize;
use std::sync::Arc;

/// One sale line with its ingredient-usage snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct SaleLineReceipt {
    #[serde(flatten)]
    pub item: transaction_item::Model,
    pub details: Vec<transaction_item_detail::Model>,
}

/// A persisted sale with everything receipt rendering needs.
#[derive(Debug, Clone, Serialize)]
pub struct SaleReceipt {
    #[serde(flatten)]
    pub transaction: transaction::Model,
    pub items: Vec<SaleLineReceipt>,
}

#[derive(Debug, Clone, Default)]
pub struct SalesFilter {
    pub branch_id: Option<i64>,
    pub date: Option<NaiveDate>,
}

/// Read-only projections over completed sales: single receipts and the
/// sales-history listing.
#[derive(Clone)]
pub struct SalesService {
    db: Arc<DbPool>,
}

impl SalesService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Full receipt projection for one sale.
    pub async fn get_receipt(&self, transaction_id: i64) -> Result<SaleReceipt, ServiceError> {
        let sale = Transaction::find_by_id(transaction_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Transaction {} not found", transaction_id))
            })?;

        load_receipt(&*self.db, sale).await
    }

    /// Newest-first page of sales plus the revenue total under the same
    /// filters (the history screen shows both).
    pub async fn list(
        &self,
        filter: &SalesFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<transaction::Model>, u64, Decimal), ServiceError> {
        let query = apply_filter(Transaction::find(), filter);

        let revenue = apply_filter(Transaction::find(), filter)
            .select_only()
            .column_as(Expr::col(transaction::Column::Total).sum(), "total")
            .into_tuple::<Option<Decimal>>()
            .one(&*self.db)
            .await?
            .flatten()
            .unwrap_or(Decimal::ZERO);

        let paginator = query
            .order_by_desc(transaction::Column::CreatedAt)
            .order_by_desc(transaction::Column::Id)
            .paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let sales = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((sales, total, revenue))
    }
}

/// Attaches items and ingredient details to a sale row. Shared with the
/// checkout engine, which builds the same projection from inside its
/// transaction.
pub async fn load_receipt<C: ConnectionTrait>(
    conn: &C,
    sale: transaction::Model,
) -> Result<SaleReceipt, ServiceError> {
    let items = TransactionItem::find()
        .filter(transaction_item::Column::TransactionId.eq(sale.id))
        .order_by_asc(transaction_item::Column::Id)
        .all(conn)
        .await?;

    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let details = TransactionItemDetail::find()
            .filter(transaction_item_detail::Column::TransactionItemId.eq(item.id))
            .order_by_asc(transaction_item_detail::Column::Id)
            .all(conn)
            .await?;
        lines.push(SaleLineReceipt { item, details });
    }

    Ok(SaleReceipt {
        transaction: sale,
        items: lines,
    })
}

fn apply_filter(
    query: Select<Transaction>,
    filter: &SalesFilter,
) -> Select<Transaction> {
    let mut query = query;
    if let Some(branch_id) = filter.branch_id {
        query = query.filter(transaction::Column::BranchId.eq(branch_id));
    }
    if let Some(date) = filter.date {
        let start = Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN));
        let end = start + chrono::Duration::days(1);
        query = query
            .filter(transaction::Column::CreatedAt.gte(start))
            .filter(transaction::Column::CreatedAt.lt(end));
    }
    query
}
