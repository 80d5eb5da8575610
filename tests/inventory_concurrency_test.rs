mod common;

use common::TestApp;
use kasir_api::{
    entities::{cash_flow, transaction::PaymentMethod, CashFlow, Transaction},
    services::{
        cash_flow::SALES_CATEGORY,
        checkout::{CartLineInput, CheckoutCommand},
        inventory::InventoryService,
    },
};
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

/// Two concurrent checkouts each needing 6 units against a stock of 10:
/// at most one may win, the loser must fail cleanly, and the final stock
/// reflects exactly one decrement. The conditional update inside the
/// commit phase is what enforces this, not the earlier read.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checkouts_cannot_oversell() {
    let app = TestApp::new().await;
    let branch = app.create_branch("B1").await;
    let beans = app.create_product("Beans", None).await;
    let menu = app
        .create_menu("Espresso", dec!(15000), false, 6, &[(beans.id, 6)])
        .await;
    app.set_stock(branch, beans.id, 10).await;

    let command = |quantity: i32| CheckoutCommand {
        branch_id: branch,
        cashier_id: 1,
        payment_method: PaymentMethod::Cash,
        amount_paid: dec!(100000),
        items: vec![CartLineInput {
            menu_id: menu.id,
            quantity,
            details: Vec::new(),
        }],
    };

    let first = {
        let checkout = app.services.checkout.clone();
        let cmd = command(1);
        tokio::spawn(async move { checkout.checkout(cmd).await })
    };
    let second = {
        let checkout = app.services.checkout.clone();
        let cmd = command(1);
        tokio::spawn(async move { checkout.checkout(cmd).await })
    };

    let results = [first.await.unwrap(), second.await.unwrap()];
    let successes = results.iter().filter(|r| r.is_ok()).count();

    assert_eq!(successes, 1, "exactly one checkout may win the race");

    let stock = app.stock(branch, beans.id).await;
    assert_eq!(stock, 4, "stock reflects exactly one decrement of 6");

    // the loser left no partial writes behind
    assert_eq!(Transaction::find().count(&*app.db).await.unwrap(), 1);
    assert_eq!(
        CashFlow::find()
            .filter(cash_flow::Column::Category.eq(SALES_CATEGORY))
            .count(&*app.db)
            .await
            .unwrap(),
        1
    );
}

/// Twenty concurrent strict decrements of one unit against a stock of ten:
/// exactly ten succeed and stock lands on zero, never below.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn strict_decrements_never_drive_stock_negative() {
    let app = TestApp::new().await;
    let branch = app.create_branch("B1").await;
    let beans = app.create_product("Beans", None).await;
    app.set_stock(branch, beans.id, 10).await;

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let db = app.db.clone();
        let name = beans.name.clone();
        let product_id = beans.id;
        tasks.push(tokio::spawn(async move {
            InventoryService::reserve_and_commit_decrement(&*db, branch, product_id, &name, 1)
                .await
                .is_ok()
        }));
    }

    let mut successes = 0;
    for task in tasks {
        if task.await.unwrap_or(false) {
            successes += 1;
        }
    }

    assert_eq!(successes, 10, "exactly 10 single-unit decrements fit in 10");
    assert_eq!(app.stock(branch, beans.id).await, 0);
}
