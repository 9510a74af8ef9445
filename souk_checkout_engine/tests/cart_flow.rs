use souk_checkout_engine::{
    test_utils::{
        prepare_env::{prepare_test_env, random_db_path},
        seed::{seed_product, seed_product_with_sale, seed_variant, set_stock},
    },
    traits::CheckoutError,
    CartApi,
    SqliteDatabase,
};
use souk_common::Fils;

async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

#[tokio::test]
async fn adding_and_merging_items_computes_totals() {
    let db = new_db().await;
    let truffles = seed_product(&db, "CHOC-001", "Dark Truffles", Fils::from_aed(40), 10).await;
    let api = CartApi::new(db);

    let item = api.add_item("sess-1", truffles, None, 2).await.expect("add should succeed");
    assert_eq!(item.quantity, 2);
    assert_eq!(item.price_at_addition, Fils::from_aed(40));

    // Same product again merges by summing quantities
    let item = api.add_item("sess-1", truffles, None, 3).await.expect("merge should succeed");
    assert_eq!(item.quantity, 5);

    let summary = api.cart("sess-1").await.expect("summary should load");
    assert_eq!(summary.items.len(), 1);
    assert_eq!(summary.item_count(), 5);
    assert_eq!(summary.subtotal(), Fils::from_aed(200));
    assert_eq!(summary.tax_amount(), Fils::from_aed(10));
    assert_eq!(summary.total(), Fils::from_aed(210));
}

#[tokio::test]
async fn zero_quantity_add_is_rejected() {
    let db = new_db().await;
    let truffles = seed_product(&db, "CHOC-002", "Milk Truffles", Fils::from_aed(30), 10).await;
    let api = CartApi::new(db);
    let err = api.add_item("sess-2", truffles, None, 0).await.expect_err("zero quantity must be rejected");
    assert!(matches!(err, CheckoutError::Validation(_)));
}

#[tokio::test]
async fn merging_past_availability_reports_remaining_addable_amount() {
    let db = new_db().await;
    let bars = seed_product(&db, "CHOC-003", "Sea Salt Bars", Fils::from_aed(25), 10).await;
    let api = CartApi::new(db);

    api.add_item("sess-3", bars, None, 8).await.expect("first add fits");
    let err = api.add_item("sess-3", bars, None, 5).await.expect_err("13 exceeds the 10 available");
    match err {
        CheckoutError::InsufficientStock { name, available } => {
            assert_eq!(name, "Sea Salt Bars");
            // 10 available minus the 8 already in the cart
            assert_eq!(available, 2);
        },
        other => panic!("Expected InsufficientStock, got {other:?}"),
    }
    // The failed merge left the cart item untouched
    let summary = api.cart("sess-3").await.expect("summary should load");
    assert_eq!(summary.items[0].quantity, 8);
}

#[tokio::test]
async fn variant_products_require_a_variant_selection() {
    let db = new_db().await;
    let mass = seed_product(&db, "COCO", "Coco Mass", Fils::from_aed(50), 0).await;
    let white =
        seed_variant(&db, mass, "COCO-WHITE-500", r#"{"Color": "White", "Weight": "500g"}"#, Fils::from_aed(55), 6)
            .await;
    let api = CartApi::new(db);

    let err = api.add_item("sess-4", mass, None, 1).await.expect_err("variant must be specified");
    assert!(matches!(err, CheckoutError::VariantRequired));

    let item = api.add_item("sess-4", mass, Some(white), 2).await.expect("variant add should succeed");
    assert_eq!(item.variant_id, Some(white));
    assert_eq!(item.price_at_addition, Fils::from_aed(55));
}

#[tokio::test]
async fn sale_price_overrides_base_price() {
    let db = new_db().await;
    let pralines = seed_product_with_sale(
        &db,
        "CHOC-004",
        "Pistachio Pralines",
        Fils::from_aed(60),
        Some(Fils::from_aed(45)),
        10,
    )
    .await;
    let api = CartApi::new(db);
    let item = api.add_item("sess-5", pralines, None, 1).await.expect("add should succeed");
    assert_eq!(item.price_at_addition, Fils::from_aed(45));
}

#[tokio::test]
async fn item_price_does_not_follow_later_catalog_changes() {
    let db = new_db().await;
    let bars = seed_product(&db, "CHOC-005", "Orange Bars", Fils::from_aed(20), 10).await;
    let api = CartApi::new(db.clone());
    api.add_item("sess-6", bars, None, 2).await.expect("add should succeed");

    sqlx::query("UPDATE products SET base_price = $1 WHERE id = $2")
        .bind(Fils::from_aed(99))
        .bind(bars)
        .execute(db.pool())
        .await
        .expect("price update");

    let summary = api.cart("sess-6").await.expect("summary should load");
    assert_eq!(summary.items[0].price_at_addition, Fils::from_aed(20));
    assert_eq!(summary.subtotal(), Fils::from_aed(40));
}

#[tokio::test]
async fn updating_quantity_revalidates_absolute_amount() {
    let db = new_db().await;
    let bars = seed_product(&db, "CHOC-006", "Hazelnut Bars", Fils::from_aed(15), 5).await;
    let api = CartApi::new(db);
    let item = api.add_item("sess-7", bars, None, 2).await.expect("add should succeed");

    let err = api.update_item(item.id, 6).await.expect_err("6 exceeds the 5 available");
    assert!(matches!(err, CheckoutError::InsufficientStock { available: 5, .. }));

    let updated = api.update_item(item.id, 4).await.expect("4 fits").expect("item should remain");
    assert_eq!(updated.quantity, 4);
}

#[tokio::test]
async fn zero_quantity_update_deletes_the_item() {
    let db = new_db().await;
    let bars = seed_product(&db, "CHOC-007", "Mint Bars", Fils::from_aed(15), 5).await;
    let api = CartApi::new(db);
    let item = api.add_item("sess-8", bars, None, 2).await.expect("add should succeed");

    let deleted = api.update_item(item.id, 0).await.expect("update to zero is not an error");
    assert!(deleted.is_none());
    let summary = api.cart("sess-8").await.expect("summary should load");
    assert!(summary.items.is_empty());
    assert_eq!(summary.total(), Fils::from(0));
}

#[tokio::test]
async fn clearing_an_unknown_cart_is_an_error() {
    let db = new_db().await;
    let api = CartApi::new(db);
    let err = api.clear("no-such-session").await.expect_err("unknown session has no cart");
    assert!(matches!(err, CheckoutError::CartNotFound));
}

#[tokio::test]
async fn out_of_stock_products_cannot_be_added() {
    let db = new_db().await;
    let bars = seed_product(&db, "CHOC-008", "Caramel Bars", Fils::from_aed(15), 3).await;
    set_stock(&db, "CHOC-008", 0).await;
    let api = CartApi::new(db);
    let err = api.add_item("sess-9", bars, None, 1).await.expect_err("nothing available");
    assert!(matches!(err, CheckoutError::OutOfStock { .. }));
}
