use crate::{
    db::DbPool,
    entities::{inventory, product, Inventory, Product},
    errors::ServiceError,
    events::{Event, EventSender},
    services::units::UnitConversionService,
};
use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionError, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use strum::Display;
use tracing::{info, instrument};

/// Direction of a manual stock adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AdjustDirection {
    In,
    Out,
}

/// Manual stock correction from the inventory screen. The quantity may be
/// expressed in an alternate unit; it is converted to base units first.
#[derive(Debug, Clone)]
pub struct AdjustInventoryCommand {
    pub branch_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub unit_id: Option<i64>,
    pub direction: AdjustDirection,
}

/// Per-branch stock ledger. Two write paths with deliberately different
/// semantics: `adjust` clamps at zero and never fails (manual corrections),
/// while `reserve_and_commit_decrement` is the strict guard used inside the
/// checkout transaction.
#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DbPool>,
    event_sender: EventSender,
    units: Arc<UnitConversionService>,
}

impl InventoryService {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: EventSender,
        units: Arc<UnitConversionService>,
    ) -> Self {
        Self {
            db,
            event_sender,
            units,
        }
    }

    /// Current stock for (branch, product); 0 when no row exists yet.
    pub async fn get_stock(&self, branch_id: i64, product_id: i64) -> Result<i32, ServiceError> {
        stock_of(&*self.db, branch_id, product_id).await
    }

    /// All stock rows for a branch, with their product.
    pub async fn list_for_branch(
        &self,
        branch_id: i64,
    ) -> Result<Vec<(inventory::Model, Option<product::Model>)>, ServiceError> {
        let rows = Inventory::find()
            .filter(inventory::Column::BranchId.eq(branch_id))
            .order_by_asc(inventory::Column::ProductId)
            .find_also_related(Product)
            .all(&*self.db)
            .await?;
        Ok(rows)
    }

    /// Soft adjustment: `in` adds the converted quantity, `out` subtracts at
    /// most the current stock. Creates the stock row at zero on first use.
    /// Decrements below zero are silently clamped, matching the manual
    /// correction semantics — checkout never goes through here.
    #[instrument(skip(self))]
    pub async fn adjust(&self, command: AdjustInventoryCommand) -> Result<i32, ServiceError> {
        let magnitude = command.quantity.abs();
        if magnitude == 0 {
            return Err(ServiceError::ValidationError(
                "Adjustment quantity must not be zero".to_string(),
            ));
        }

        let product = Product::find_by_id(command.product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", command.product_id))
            })?;

        let delta = self
            .units
            .to_base_units_or_raw(&product, command.unit_id, magnitude)
            .await?;

        let branch_id = command.branch_id;
        let product_id = command.product_id;
        let direction = command.direction;

        let (old_stock, new_stock) = self
            .db
            .transaction::<_, (i32, i32), ServiceError>(move |txn| {
                Box::pin(async move {
                    let now = Utc::now();
                    let row = Inventory::find()
                        .filter(inventory::Column::BranchId.eq(branch_id))
                        .filter(inventory::Column::ProductId.eq(product_id))
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    let row = match row {
                        Some(row) => row,
                        None => {
                            // lazily created at zero on first adjustment
                            inventory::ActiveModel {
                                branch_id: Set(branch_id),
                                product_id: Set(product_id),
                                stock: Set(0),
                                created_at: Set(now),
                                updated_at: Set(now),
                                ..Default::default()
                            }
                            .insert(txn)
                            .await
                            .map_err(ServiceError::db_error)?
                        }
                    };

                    let old_stock = row.stock;
                    let new_stock = match direction {
                        AdjustDirection::In => old_stock + delta,
                        AdjustDirection::Out => old_stock - delta.min(old_stock),
                    };

                    let mut active: inventory::ActiveModel = row.into();
                    active.stock = Set(new_stock);
                    active.updated_at = Set(now);
                    active.update(txn).await.map_err(ServiceError::db_error)?;

                    Ok((old_stock, new_stock))
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(
            branch_id,
            product_id,
            old_stock,
            new_stock,
            direction = %direction,
            "Inventory adjusted"
        );

        self.event_sender
            .send_or_log(Event::InventoryAdjusted {
                branch_id,
                product_id,
                old_stock,
                new_stock,
                reason: "manual_adjustment".to_string(),
            })
            .await;

        Ok(new_stock)
    }

    /// Strict decrement used inside the checkout transaction. The guard is
    /// the conditional update itself (`stock >= quantity` in the WHERE
    /// clause), so concurrent checkouts cannot drive stock negative no
    /// matter what the earlier read-phase saw. Zero rows affected means the
    /// guard rejected the decrement; the caller's transaction must roll
    /// back as a whole.
    pub async fn reserve_and_commit_decrement<C: ConnectionTrait>(
        conn: &C,
        branch_id: i64,
        product_id: i64,
        product_name: &str,
        quantity: i32,
    ) -> Result<i32, ServiceError> {
        let result = Inventory::update_many()
            .col_expr(
                inventory::Column::Stock,
                Expr::col(inventory::Column::Stock).sub(quantity),
            )
            .col_expr(inventory::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(inventory::Column::BranchId.eq(branch_id))
            .filter(inventory::Column::ProductId.eq(product_id))
            .filter(inventory::Column::Stock.gte(quantity))
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            let available = stock_of(conn, branch_id, product_id).await?;
            return Err(ServiceError::InsufficientStock {
                product: product_name.to_string(),
                available,
                required: quantity,
            });
        }

        stock_of(conn, branch_id, product_id).await
    }

    /// Absolute overwrite used by the daily restock importer. Upserts the
    /// (branch, product) row unconditionally; not safe against a checkout
    /// in flight on the same row, which is why restock runs before shift
    /// start.
    pub async fn set_absolute<C: ConnectionTrait>(
        conn: &C,
        branch_id: i64,
        product_id: i64,
        stock: i32,
    ) -> Result<(), ServiceError> {
        let now = Utc::now();
        let model = inventory::ActiveModel {
            branch_id: Set(branch_id),
            product_id: Set(product_id),
            stock: Set(stock),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        Inventory::insert(model)
            .on_conflict(
                OnConflict::columns([inventory::Column::BranchId, inventory::Column::ProductId])
                    .update_columns([inventory::Column::Stock, inventory::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;

        Ok(())
    }
}

async fn stock_of<C: ConnectionTrait>(
    conn: &C,
    branch_id: i64,
    product_id: i64,
) -> Result<i32, ServiceError> {
    let row = Inventory::find()
        .filter(inventory::Column::BranchId.eq(branch_id))
        .filter(inventory::Column::ProductId.eq(product_id))
        .one(conn)
        .await?;

    Ok(row.map(|r| r.stock).unwrap_or(0))
}
