mod common;

use assert_matches::assert_matches;
use common::TestApp;
use kasir_api::{
    entities::{cash_flow, transaction::PaymentMethod, CashFlow, Transaction, TransactionItemDetail},
    errors::ServiceError,
    services::{
        cash_flow::SALES_CATEGORY,
        checkout::{CartLineInput, CheckoutCommand},
        recipe::IngredientLineInput,
    },
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

fn cart_line(menu_id: i64, quantity: i32) -> CartLineInput {
    CartLineInput {
        menu_id,
        quantity,
        details: Vec::new(),
    }
}

fn command(branch_id: i64, amount_paid: Decimal, items: Vec<CartLineInput>) -> CheckoutCommand {
    CheckoutCommand {
        branch_id,
        cashier_id: 1,
        payment_method: PaymentMethod::Cash,
        amount_paid,
        items,
    }
}

#[tokio::test]
async fn fixed_menu_checkout_deducts_stock_and_mirrors_the_ledger() {
    let app = TestApp::new().await;
    let branch = app.create_branch("B1").await;
    let beans = app.create_product("Arabica beans", None).await;
    let menu = app
        .create_menu("Espresso", dec!(15000), false, 2, &[(beans.id, 2)])
        .await;
    app.set_stock(branch, beans.id, 10).await;

    let receipt = app
        .services
        .checkout
        .checkout(command(branch, dec!(50000), vec![cart_line(menu.id, 3)]))
        .await
        .expect("checkout should succeed");

    // total = price x quantity, change = paid - total
    assert_eq!(receipt.transaction.total, dec!(45000));
    assert_eq!(receipt.transaction.change, dec!(5000));
    assert_eq!(receipt.items.len(), 1);
    assert_eq!(receipt.items[0].item.quantity, 3);
    assert_eq!(receipt.items[0].item.menu_name, "Espresso");
    // 2 per sale x 3 sales, snapshotted in base units
    assert_eq!(receipt.items[0].details.len(), 1);
    assert_eq!(receipt.items[0].details[0].quantity, 6);
    assert_eq!(receipt.items[0].details[0].product_name, "Arabica beans");

    assert_eq!(app.stock(branch, beans.id).await, 4);

    // exactly one protected income ledger row mirroring the sale
    let ledger = CashFlow::find()
        .filter(cash_flow::Column::Category.eq(SALES_CATEGORY))
        .all(&*app.db)
        .await
        .unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].amount, dec!(45000));
    assert_eq!(ledger[0].r#type, cash_flow::CashFlowType::Income);
    assert!(ledger[0]
        .description
        .as_deref()
        .unwrap_or_default()
        .contains(&receipt.transaction.invoice_number));
}

#[tokio::test]
async fn insufficient_stock_aborts_without_any_writes() {
    let app = TestApp::new().await;
    let branch = app.create_branch("B1").await;
    let beans = app.create_product("Arabica beans", None).await;
    let menu = app
        .create_menu("Espresso", dec!(15000), false, 2, &[(beans.id, 2)])
        .await;
    app.set_stock(branch, beans.id, 5).await;

    let err = app
        .services
        .checkout
        .checkout(command(branch, dec!(50000), vec![cart_line(menu.id, 3)]))
        .await
        .expect_err("6 needed against 5 available must fail");

    assert_matches!(
        err,
        ServiceError::InsufficientStock {
            available: 5,
            required: 6,
            ..
        }
    );

    // no sale, no ledger row, no decrement survived the failed attempt
    assert_eq!(app.stock(branch, beans.id).await, 5);
    assert_eq!(Transaction::find().count(&*app.db).await.unwrap(), 0);
    assert_eq!(CashFlow::find().count(&*app.db).await.unwrap(), 0);
    assert_eq!(
        TransactionItemDetail::find().count(&*app.db).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn demand_is_aggregated_across_cart_lines_before_the_stock_check() {
    let app = TestApp::new().await;
    let branch = app.create_branch("B1").await;
    let milk = app.create_product("Milk", None).await;
    let latte = app
        .create_menu("Latte", dec!(20000), false, 2, &[(milk.id, 2)])
        .await;
    let flatwhite = app
        .create_menu("Flat white", dec!(22000), false, 3, &[(milk.id, 3)])
        .await;
    // each line fits alone (2 <= 4, 3 <= 4) but not together (5 > 4)
    app.set_stock(branch, milk.id, 4).await;

    let err = app
        .services
        .checkout
        .checkout(command(
            branch,
            dec!(100000),
            vec![cart_line(latte.id, 1), cart_line(flatwhite.id, 1)],
        ))
        .await
        .expect_err("joint demand must be checked as one sum");

    assert_matches!(
        err,
        ServiceError::InsufficientStock {
            available: 4,
            required: 5,
            ..
        }
    );
    assert_eq!(app.stock(branch, milk.id).await, 4);
}

#[tokio::test]
async fn insufficient_payment_fails_before_any_persistence() {
    let app = TestApp::new().await;
    let branch = app.create_branch("B1").await;
    let beans = app.create_product("Beans", None).await;
    let menu = app
        .create_menu("Espresso", dec!(15000), false, 1, &[(beans.id, 1)])
        .await;
    app.set_stock(branch, beans.id, 10).await;

    let err = app
        .services
        .checkout
        .checkout(command(branch, dec!(10000), vec![cart_line(menu.id, 1)]))
        .await
        .expect_err("paying 10000 for a 15000 sale must fail");

    assert_matches!(err, ServiceError::InsufficientPayment { .. });
    assert_eq!(app.stock(branch, beans.id).await, 10);
    assert_eq!(Transaction::find().count(&*app.db).await.unwrap(), 0);
}

#[tokio::test]
async fn unknown_menu_is_rejected() {
    let app = TestApp::new().await;
    let branch = app.create_branch("B1").await;

    let err = app
        .services
        .checkout
        .checkout(command(branch, dec!(10000), vec![cart_line(9999, 1)]))
        .await
        .expect_err("unknown menu id");

    assert_matches!(err, ServiceError::MenuNotFound(9999));
}

#[tokio::test]
async fn flexible_menu_enforces_the_composition_total() {
    let app = TestApp::new().await;
    let branch = app.create_branch("B1").await;
    let chicken = app.create_product("Chicken satay", None).await;
    let beef = app.create_product("Beef satay", None).await;
    let mixed = app
        .create_menu("Mixed satay", dec!(30000), true, 3, &[(chicken.id, 3)])
        .await;
    app.set_stock(branch, chicken.id, 20).await;
    app.set_stock(branch, beef.id, 20).await;

    let line = |chicken_qty: i32, beef_qty: i32| CartLineInput {
        menu_id: mixed.id,
        quantity: 1,
        details: vec![
            IngredientLineInput {
                product_id: chicken.id,
                quantity: chicken_qty,
            },
            IngredientLineInput {
                product_id: beef.id,
                quantity: beef_qty,
            },
        ],
    };

    // summing to 2 and 4 are both rejected
    for bad in [line(1, 1), line(2, 2)] {
        let err = app
            .services
            .checkout
            .checkout(command(branch, dec!(50000), vec![bad]))
            .await
            .expect_err("composition off the required total");
        assert_matches!(err, ServiceError::InvalidComposition(_));
    }

    // exactly 3, split across products, is accepted
    let receipt = app
        .services
        .checkout
        .checkout(command(branch, dec!(50000), vec![line(2, 1)]))
        .await
        .expect("composition summing to default_quantity");

    assert_eq!(receipt.items[0].details.len(), 2);
    assert_eq!(app.stock(branch, chicken.id).await, 18);
    assert_eq!(app.stock(branch, beef.id).await, 19);
}

#[tokio::test]
async fn fixed_menu_ignores_cashier_supplied_lines() {
    let app = TestApp::new().await;
    let branch = app.create_branch("B1").await;
    let beans = app.create_product("Beans", None).await;
    let other = app.create_product("Sugar", None).await;
    let menu = app
        .create_menu("Espresso", dec!(15000), false, 2, &[(beans.id, 2)])
        .await;
    app.set_stock(branch, beans.id, 10).await;
    app.set_stock(branch, other.id, 10).await;

    let receipt = app
        .services
        .checkout
        .checkout(command(
            branch,
            dec!(15000),
            vec![CartLineInput {
                menu_id: menu.id,
                quantity: 1,
                details: vec![IngredientLineInput {
                    product_id: other.id,
                    quantity: 2,
                }],
            }],
        ))
        .await
        .expect("fixed menu sells its recipe");

    // the recipe was used, the supplied substitution was not
    assert_eq!(app.stock(branch, beans.id).await, 8);
    assert_eq!(app.stock(branch, other.id).await, 10);
    assert_eq!(receipt.items[0].details[0].product_name, "Beans");
}

#[tokio::test]
async fn invoice_numbers_follow_the_daily_sequence() {
    let app = TestApp::new().await;
    let branch = app.create_branch("B1").await;
    let beans = app.create_product("Beans", None).await;
    let menu = app
        .create_menu("Espresso", dec!(15000), false, 1, &[(beans.id, 1)])
        .await;
    app.set_stock(branch, beans.id, 10).await;

    let first = app
        .services
        .checkout
        .checkout(command(branch, dec!(15000), vec![cart_line(menu.id, 1)]))
        .await
        .unwrap();
    let second = app
        .services
        .checkout
        .checkout(command(branch, dec!(15000), vec![cart_line(menu.id, 1)]))
        .await
        .unwrap();

    let date_part = chrono::Utc::now().format("%Y%m%d").to_string();
    assert_eq!(
        first.transaction.invoice_number,
        format!("INV-{}-0001", date_part)
    );
    assert_eq!(
        second.transaction.invoice_number,
        format!("INV-{}-0002", date_part)
    );
}

#[tokio::test]
async fn empty_cart_is_rejected() {
    let app = TestApp::new().await;
    let branch = app.create_branch("B1").await;

    let err = app
        .services
        .checkout
        .checkout(command(branch, dec!(10000), Vec::new()))
        .await
        .expect_err("empty cart");

    assert_matches!(err, ServiceError::ValidationError(_));
}
