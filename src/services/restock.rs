use crate::{
    db::DbPool,
    entities::{product, Product},
    errors::ServiceError,
    events::{Event, EventSender},
    services::inventory::InventoryService,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, TransactionError, TransactionTrait};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};

/// One absolute stock count from the shift-start sheet.
#[derive(Debug, Clone)]
pub struct RestockItem {
    pub product_id: i64,
    pub stock: i32,
}

/// Bulk importer for the daily opening stock count. Overwrites stock
/// absolutely — it is a statement of what is on the shelf, not a delta —
/// and commits the whole sheet or none of it. Meant to run before the
/// first checkout of the day; it offers no protection against a sale
/// mutating the same rows mid-import.
#[derive(Clone)]
pub struct RestockService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl RestockService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, items), fields(item_count = items.len()))]
    pub async fn import_daily_stock(
        &self,
        branch_id: i64,
        items: Vec<RestockItem>,
    ) -> Result<usize, ServiceError> {
        if items.is_empty() {
            return Err(ServiceError::ValidationError(
                "Restock sheet must contain at least one item".to_string(),
            ));
        }
        if let Some(bad) = items.iter().find(|i| i.stock < 0) {
            return Err(ServiceError::ValidationError(format!(
                "Stock for product {} must not be negative",
                bad.product_id
            )));
        }

        // Reject unknown products up front so the batch fails before any write.
        let ids: HashSet<i64> = items.iter().map(|i| i.product_id).collect();
        let known: HashSet<i64> = Product::find()
            .filter(product::Column::Id.is_in(ids.iter().copied().collect::<Vec<_>>()))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();
        if let Some(missing) = ids.difference(&known).next() {
            return Err(ServiceError::NotFound(format!(
                "Product {} not found",
                missing
            )));
        }

        let count = items.len();
        self.db
            .transaction::<_, (), ServiceError>(move |txn| {
                Box::pin(async move {
                    for item in items {
                        InventoryService::set_absolute(
                            txn,
                            branch_id,
                            item.product_id,
                            item.stock,
                        )
                        .await?;
                    }
                    Ok(())
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(branch_id, count, "Daily stock imported");

        self.event_sender
            .send_or_log(Event::DailyStockImported {
                branch_id,
                item_count: count,
            })
            .await;

        Ok(count)
    }
}
