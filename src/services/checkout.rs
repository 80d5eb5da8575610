use crate::{
    db::DbPool,
    entities::{
        menu, transaction, transaction_item, transaction_item_detail,
        transaction::PaymentMethod, Menu, Transaction,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        cash_flow::CashFlowService,
        inventory::InventoryService,
        recipe::{IngredientLineInput, RecipeService},
        sales::{SaleLineReceipt, SaleReceipt},
    },
};
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use sea_orm::error::SqlErr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    Set, TransactionError, TransactionTrait,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};

const INVOICE_PREFIX: &str = "INV";

/// One cart line as submitted by the cashier. `details` is only consulted
/// for flexible menus; fixed menus always sell their recipe.
#[derive(Debug, Clone)]
pub struct CartLineInput {
    pub menu_id: i64,
    pub quantity: i32,
    pub details: Vec<IngredientLineInput>,
}

#[derive(Debug, Clone)]
pub struct CheckoutCommand {
    pub branch_id: i64,
    pub cashier_id: i64,
    pub payment_method: PaymentMethod,
    pub amount_paid: Decimal,
    pub items: Vec<CartLineInput>,
}

/// A cart line after pricing and recipe resolution, ready to persist.
/// Ingredient quantities are already scaled by the ordered quantity.
struct MaterializedLine {
    menu: menu::Model,
    quantity: i32,
    subtotal: Decimal,
    ingredients: Vec<ScaledIngredient>,
}

struct ScaledIngredient {
    product_id: i64,
    product_name: String,
    unit_id: Option<i64>,
    quantity: i32,
}

/// The checkout transaction engine.
///
/// A checkout runs in five phases: pricing and line materialization, demand
/// aggregation, a read-only stock validation, the atomic commit, and the
/// receipt projection. Phases 1–3 touch nothing but reads, so every
/// user-correctable failure (unknown menu, bad composition, short stock,
/// short payment) aborts before a transaction even opens. The commit phase
/// re-validates stock through the conditional decrement — the read phase is
/// a fail-fast courtesy, not the guard.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DbPool>,
    event_sender: EventSender,
    recipes: Arc<RecipeService>,
}

impl CheckoutService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender, recipes: Arc<RecipeService>) -> Self {
        Self {
            db,
            event_sender,
            recipes,
        }
    }

    #[instrument(skip(self, command), fields(branch_id = command.branch_id, lines = command.items.len()))]
    pub async fn checkout(&self, command: CheckoutCommand) -> Result<SaleReceipt, ServiceError> {
        if command.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "Cart must contain at least one line".to_string(),
            ));
        }
        if command.items.iter().any(|l| l.quantity < 1) {
            return Err(ServiceError::ValidationError(
                "Line quantity must be at least 1".to_string(),
            ));
        }
        if command.amount_paid < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Amount paid must not be negative".to_string(),
            ));
        }

        // Phase 1: pricing and line materialization.
        let mut total = Decimal::ZERO;
        let mut lines: Vec<MaterializedLine> = Vec::with_capacity(command.items.len());
        for line in &command.items {
            let menu = Menu::find_by_id(line.menu_id)
                .one(&*self.db)
                .await?
                .ok_or(ServiceError::MenuNotFound(line.menu_id))?;

            let subtotal = menu.price * Decimal::from(line.quantity);
            total += subtotal;

            let resolved = self.recipes.resolve(&menu, &line.details).await?;
            let ingredients = resolved
                .into_iter()
                .map(|r| ScaledIngredient {
                    product_id: r.product_id,
                    product_name: r.product_name,
                    unit_id: r.unit_id,
                    quantity: r.quantity * line.quantity,
                })
                .collect();

            lines.push(MaterializedLine {
                menu,
                quantity: line.quantity,
                subtotal,
                ingredients,
            });
        }

        // Phase 2: aggregate demand per product across the whole cart.
        // Two lines drawing on the same product must be checked as one sum,
        // or each could fit individually while jointly overselling.
        let mut demand: BTreeMap<i64, (String, i32)> = BTreeMap::new();
        for line in &lines {
            for ing in &line.ingredients {
                let entry = demand
                    .entry(ing.product_id)
                    .or_insert_with(|| (ing.product_name.clone(), 0));
                entry.1 += ing.quantity;
            }
        }

        // Phase 3: read-only validation. No writes have happened yet, so
        // failing here has no side effects to clean up.
        for (product_id, (product_name, required)) in &demand {
            let available = self.stock_of(command.branch_id, *product_id).await?;
            if available < *required {
                return Err(ServiceError::InsufficientStock {
                    product: product_name.clone(),
                    available,
                    required: *required,
                });
            }
        }
        if command.amount_paid < total {
            return Err(ServiceError::InsufficientPayment {
                total,
                amount_paid: command.amount_paid,
            });
        }

        // Phase 4: atomic commit. Everything below either all commits or
        // all rolls back, including the inventory decrements.
        let branch_id = command.branch_id;
        let cashier_id = command.cashier_id;
        let payment_method = command.payment_method;
        let amount_paid = command.amount_paid;

        let receipt = self
            .db
            .transaction::<_, SaleReceipt, ServiceError>(move |txn| {
                Box::pin(async move {
                    let invoice_number = next_invoice_number(txn).await?;
                    let change = amount_paid - total;
                    let now = Utc::now();

                    let sale = transaction::ActiveModel {
                        invoice_number: Set(invoice_number),
                        branch_id: Set(branch_id),
                        user_id: Set(cashier_id),
                        total: Set(total),
                        payment_method: Set(payment_method),
                        amount_paid: Set(amount_paid),
                        change: Set(change),
                        created_at: Set(now),
                        updated_at: Set(now),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    let mut receipt_items = Vec::with_capacity(lines.len());
                    for line in lines {
                        let item = transaction_item::ActiveModel {
                            transaction_id: Set(sale.id),
                            menu_id: Set(Some(line.menu.id)),
                            menu_name: Set(line.menu.name.clone()),
                            price: Set(line.menu.price),
                            quantity: Set(line.quantity),
                            subtotal: Set(line.subtotal),
                            created_at: Set(now),
                            updated_at: Set(now),
                            ..Default::default()
                        }
                        .insert(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                        let mut details = Vec::with_capacity(line.ingredients.len());
                        for ing in line.ingredients {
                            let detail = transaction_item_detail::ActiveModel {
                                transaction_item_id: Set(item.id),
                                product_id: Set(Some(ing.product_id)),
                                product_name: Set(ing.product_name.clone()),
                                unit_id: Set(ing.unit_id),
                                quantity: Set(ing.quantity),
                                created_at: Set(now),
                                updated_at: Set(now),
                                ..Default::default()
                            }
                            .insert(txn)
                            .await
                            .map_err(ServiceError::db_error)?;

                            // The authoritative stock guard. A concurrent
                            // sale that won the race surfaces here and rolls
                            // the whole checkout back.
                            InventoryService::reserve_and_commit_decrement(
                                txn,
                                branch_id,
                                ing.product_id,
                                &ing.product_name,
                                ing.quantity,
                            )
                            .await?;

                            details.push(detail);
                        }

                        receipt_items.push(SaleLineReceipt { item, details });
                    }

                    CashFlowService::record_sale(
                        txn,
                        branch_id,
                        cashier_id,
                        total,
                        &sale.invoice_number,
                    )
                    .await?;

                    Ok(SaleReceipt {
                        transaction: sale,
                        items: receipt_items,
                    })
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })
            .map_err(map_commit_error)?;

        info!(
            invoice = %receipt.transaction.invoice_number,
            branch_id,
            total = %receipt.transaction.total,
            "Checkout completed"
        );

        self.event_sender
            .send_or_log(Event::SaleCompleted {
                transaction_id: receipt.transaction.id,
                branch_id,
                invoice_number: receipt.transaction.invoice_number.clone(),
                total: receipt.transaction.total,
            })
            .await;

        // Phase 5: the persisted sale, ready for receipt rendering.
        Ok(receipt)
    }

    async fn stock_of(&self, branch_id: i64, product_id: i64) -> Result<i32, ServiceError> {
        use crate::entities::{inventory, Inventory};
        let row = Inventory::find()
            .filter(inventory::Column::BranchId.eq(branch_id))
            .filter(inventory::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await?;
        Ok(row.map(|r| r.stock).unwrap_or(0))
    }
}

/// `INV-<YYYYMMDD>-<seq>` where the sequence counts today's sales across
/// all branches. Counted inside the commit transaction; the unique
/// constraint on `invoice_number` backstops the remaining window between
/// the count and the insert, surfacing as a retryable conflict.
async fn next_invoice_number<C: ConnectionTrait>(conn: &C) -> Result<String, ServiceError> {
    let now = Utc::now();
    let start = Utc.from_utc_datetime(&now.date_naive().and_time(chrono::NaiveTime::MIN));
    let end = start + chrono::Duration::days(1);

    let today_count = Transaction::find()
        .filter(transaction::Column::CreatedAt.gte(start))
        .filter(transaction::Column::CreatedAt.lt(end))
        .count(conn)
        .await?;

    Ok(format!(
        "{}-{}-{:04}",
        INVOICE_PREFIX,
        now.format("%Y%m%d"),
        today_count + 1
    ))
}

/// A duplicate invoice number lost the numbering race to a concurrent
/// checkout; the whole checkout is safely retryable from phase 1.
fn map_commit_error(err: ServiceError) -> ServiceError {
    if let ServiceError::DatabaseError(db_err) = &err {
        if matches!(db_err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
            return ServiceError::Conflict(
                "Invoice number was taken by a concurrent sale; retry the checkout".to_string(),
            );
        }
    }
    err
}
