mod common;

use assert_matches::assert_matches;
use common::TestApp;
use kasir_api::{
    errors::ServiceError,
    services::inventory::{AdjustDirection, AdjustInventoryCommand, InventoryService},
    services::restock::RestockItem,
};

fn adjust(
    branch_id: i64,
    product_id: i64,
    quantity: i32,
    unit_id: Option<i64>,
    direction: AdjustDirection,
) -> AdjustInventoryCommand {
    AdjustInventoryCommand {
        branch_id,
        product_id,
        quantity,
        unit_id,
        direction,
    }
}

#[tokio::test]
async fn absent_stock_row_reads_as_zero() {
    let app = TestApp::new().await;
    let branch = app.create_branch("B1").await;
    let product = app.create_product("Beans", None).await;

    assert_eq!(app.stock(branch, product.id).await, 0);
}

#[tokio::test]
async fn adjust_in_creates_the_row_lazily_and_accumulates() {
    let app = TestApp::new().await;
    let branch = app.create_branch("B1").await;
    let product = app.create_product("Beans", None).await;

    let stock = app
        .services
        .inventory
        .adjust(adjust(branch, product.id, 7, None, AdjustDirection::In))
        .await
        .unwrap();
    assert_eq!(stock, 7);

    let stock = app
        .services
        .inventory
        .adjust(adjust(branch, product.id, 3, None, AdjustDirection::In))
        .await
        .unwrap();
    assert_eq!(stock, 10);
}

#[tokio::test]
async fn adjust_out_clamps_at_zero_instead_of_failing() {
    let app = TestApp::new().await;
    let branch = app.create_branch("B1").await;
    let product = app.create_product("Beans", None).await;
    app.set_stock(branch, product.id, 5).await;

    // taking out more than is there zeroes the row, never errors
    let stock = app
        .services
        .inventory
        .adjust(adjust(branch, product.id, 99, None, AdjustDirection::Out))
        .await
        .unwrap();
    assert_eq!(stock, 0);
    assert_eq!(app.stock(branch, product.id).await, 0);
}

#[tokio::test]
async fn adjust_converts_alternate_units_to_base_units() {
    let app = TestApp::new().await;
    let branch = app.create_branch("B1").await;
    let pcs = app.create_unit("pcs").await;
    let pack = app.create_unit("pack").await;
    let product = app.create_product("Cup lids", Some(pcs)).await;
    app.create_conversion(product.id, pack, 50).await;

    // 2 packs = 100 pcs
    let stock = app
        .services
        .inventory
        .adjust(adjust(branch, product.id, 2, Some(pack), AdjustDirection::In))
        .await
        .unwrap();
    assert_eq!(stock, 100);
}

#[tokio::test]
async fn unmapped_unit_falls_back_to_the_raw_quantity() {
    let app = TestApp::new().await;
    let branch = app.create_branch("B1").await;
    let pcs = app.create_unit("pcs").await;
    let crate_unit = app.create_unit("crate").await;
    let product = app.create_product("Cup lids", Some(pcs)).await;

    // no conversion row for "crate": legacy behavior uses the raw quantity
    let stock = app
        .services
        .inventory
        .adjust(adjust(
            branch,
            product.id,
            3,
            Some(crate_unit),
            AdjustDirection::In,
        ))
        .await
        .unwrap();
    assert_eq!(stock, 3);
}

#[tokio::test]
async fn strict_decrement_rejects_what_the_soft_path_would_clamp() {
    let app = TestApp::new().await;
    let branch = app.create_branch("B1").await;
    let product = app.create_product("Beans", None).await;
    app.set_stock(branch, product.id, 5).await;

    let err = InventoryService::reserve_and_commit_decrement(
        &*app.db,
        branch,
        product.id,
        &product.name,
        6,
    )
    .await
    .expect_err("decrement past available stock");

    assert_matches!(
        err,
        ServiceError::InsufficientStock {
            available: 5,
            required: 6,
            ..
        }
    );
    // no partial decrement
    assert_eq!(app.stock(branch, product.id).await, 5);

    let new_stock = InventoryService::reserve_and_commit_decrement(
        &*app.db,
        branch,
        product.id,
        &product.name,
        5,
    )
    .await
    .unwrap();
    assert_eq!(new_stock, 0);
}

#[tokio::test]
async fn daily_restock_overwrites_absolutely_and_creates_missing_rows() {
    let app = TestApp::new().await;
    let branch = app.create_branch("B1").await;
    let beans = app.create_product("Beans", None).await;
    let milk = app.create_product("Milk", None).await;
    app.set_stock(branch, beans.id, 3).await;

    let imported = app
        .services
        .restock
        .import_daily_stock(
            branch,
            vec![
                RestockItem {
                    product_id: beans.id,
                    stock: 40,
                },
                RestockItem {
                    product_id: milk.id,
                    stock: 12,
                },
            ],
        )
        .await
        .unwrap();

    assert_eq!(imported, 2);
    // absolute counts, not deltas
    assert_eq!(app.stock(branch, beans.id).await, 40);
    assert_eq!(app.stock(branch, milk.id).await, 12);
}

#[tokio::test]
async fn restock_rejects_unknown_products_before_writing() {
    let app = TestApp::new().await;
    let branch = app.create_branch("B1").await;
    let beans = app.create_product("Beans", None).await;
    app.set_stock(branch, beans.id, 3).await;

    let err = app
        .services
        .restock
        .import_daily_stock(
            branch,
            vec![
                RestockItem {
                    product_id: beans.id,
                    stock: 40,
                },
                RestockItem {
                    product_id: 9999,
                    stock: 5,
                },
            ],
        )
        .await
        .expect_err("unknown product in the sheet");

    assert_matches!(err, ServiceError::NotFound(_));
    // the whole sheet was rejected, including the valid row
    assert_eq!(app.stock(branch, beans.id).await, 3);
}

#[tokio::test]
async fn restock_rejects_negative_counts() {
    let app = TestApp::new().await;
    let branch = app.create_branch("B1").await;
    let beans = app.create_product("Beans", None).await;

    let err = app
        .services
        .restock
        .import_daily_stock(
            branch,
            vec![RestockItem {
                product_id: beans.id,
                stock: -1,
            }],
        )
        .await
        .expect_err("negative stock count");

    assert_matches!(err, ServiceError::ValidationError(_));
}
