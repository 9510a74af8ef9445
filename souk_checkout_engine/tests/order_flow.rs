use souk_checkout_engine::{
    db_types::{CustomerInfo, NewShippingAddress, OrderStatusType},
    test_utils::{
        prepare_env::{prepare_test_env, random_db_path},
        seed::{rewrite_product, seed_product, seed_variant, set_stock},
    },
    traits::{CheckoutError, InventoryManagement},
    CartApi,
    OrderFlowApi,
    SqliteDatabase,
};
use souk_common::Fils;

async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

fn customer() -> CustomerInfo {
    CustomerInfo {
        name: "Amina Khalid".to_string(),
        email: "amina@example.com".to_string(),
        phone: "+971501234567".to_string(),
        company: None,
    }
}

fn dubai_address() -> NewShippingAddress {
    NewShippingAddress {
        full_name: "Amina Khalid".to_string(),
        phone_number: "+971501234567".to_string(),
        email: "amina@example.com".to_string(),
        address_line1: "Villa 12, Al Wasl Road".to_string(),
        address_line2: None,
        city: "Dubai".to_string(),
        emirate: "DUBAI".to_string(),
        area: Some("Jumeirah".to_string()),
        postal_code: None,
        delivery_instructions: None,
    }
}

#[tokio::test]
async fn order_totals_are_subtotal_plus_vat_plus_delivery_fee() {
    let db = new_db().await;
    let truffles = seed_product(&db, "ORD-CHOC-1", "Dark Truffles", Fils::from_aed(50), 10).await;
    let carts = CartApi::new(db.clone());
    let orders = OrderFlowApi::new(db);

    carts.add_item("order-sess-1", truffles, None, 2).await.expect("add should succeed");
    let full = orders.place_order("order-sess-1", &customer(), &dubai_address()).await.expect("order should be created");

    // 100.00 subtotal, 5% VAT, Dubai delivery fee 15.00
    assert_eq!(full.order.subtotal, Fils::from_aed(100));
    assert_eq!(full.order.tax_amount, Fils::from_aed(5));
    assert_eq!(full.order.delivery_fee, Fils::from_aed(15));
    assert_eq!(full.order.total_amount, Fils::from_aed(120));
    assert_eq!(full.order.status, OrderStatusType::Pending);
    assert!(full.order.order_number.as_str().starts_with("ORD-"));
    assert_eq!(full.items.len(), 1);
    assert_eq!(full.history.len(), 1);
    assert_eq!(full.history[0].status, OrderStatusType::Pending);
}

#[tokio::test]
async fn an_empty_cart_cannot_be_checked_out() {
    let db = new_db().await;
    let carts = CartApi::new(db.clone());
    let orders = OrderFlowApi::new(db);
    carts.get_or_create("order-sess-2").await.expect("cart should be created");
    let err = orders.place_order("order-sess-2", &customer(), &dubai_address()).await.expect_err("cart is empty");
    assert!(matches!(err, CheckoutError::EmptyCart));
}

#[tokio::test]
async fn order_creation_reserves_stock_and_clears_the_cart() {
    let db = new_db().await;
    let truffles = seed_product(&db, "ORD-CHOC-2", "Milk Truffles", Fils::from_aed(30), 10).await;
    let carts = CartApi::new(db.clone());
    let orders = OrderFlowApi::new(db.clone());

    carts.add_item("order-sess-3", truffles, None, 3).await.expect("add should succeed");
    orders.place_order("order-sess-3", &customer(), &dubai_address()).await.expect("order should be created");

    let level = db.fetch_stock_level("ORD-CHOC-2").await.expect("ledger query").expect("ledger row");
    assert_eq!(level.quantity_in_stock, 10);
    assert_eq!(level.reserved_quantity, 3);
    assert_eq!(level.available(), 7);

    let summary = carts.cart("order-sess-3").await.expect("summary should load");
    assert!(summary.items.is_empty(), "cart should be cleared after checkout");
}

#[tokio::test]
async fn stock_dropping_after_add_to_cart_aborts_the_whole_order() {
    let db = new_db().await;
    let truffles = seed_product(&db, "ORD-CHOC-3", "Pistachio Truffles", Fils::from_aed(30), 5).await;
    let bars = seed_product(&db, "ORD-CHOC-4", "Sea Salt Bars", Fils::from_aed(20), 5).await;
    let carts = CartApi::new(db.clone());
    let orders = OrderFlowApi::new(db.clone());

    carts.add_item("order-sess-4", truffles, None, 2).await.expect("add should succeed");
    carts.add_item("order-sess-4", bars, None, 2).await.expect("add should succeed");
    // The second product sells out before checkout
    set_stock(&db, "ORD-CHOC-4", 0).await;

    let err = orders.place_order("order-sess-4", &customer(), &dubai_address()).await.expect_err("out of stock");
    assert!(matches!(err, CheckoutError::OutOfStock { .. }));

    // Nothing survived: no reservation on either SKU, cart untouched
    let level = db.fetch_stock_level("ORD-CHOC-3").await.expect("ledger query").expect("ledger row");
    assert_eq!(level.reserved_quantity, 0);
    let summary = carts.cart("order-sess-4").await.expect("summary should load");
    assert_eq!(summary.items.len(), 2);
}

#[tokio::test]
async fn cancelling_a_pending_order_restores_availability() {
    let db = new_db().await;
    let truffles = seed_product(&db, "ORD-CHOC-5", "Champagne Truffles", Fils::from_aed(80), 8).await;
    let carts = CartApi::new(db.clone());
    let orders = OrderFlowApi::new(db.clone());

    carts.add_item("order-sess-5", truffles, None, 5).await.expect("add should succeed");
    let full = orders.place_order("order-sess-5", &customer(), &dubai_address()).await.expect("order created");
    let reserved = db.fetch_stock_level("ORD-CHOC-5").await.expect("query").expect("row");
    assert_eq!(reserved.available(), 3);

    let cancelled = orders
        .cancel_order(&full.order.order_number, Some("Customer changed their mind".to_string()))
        .await
        .expect("cancel should succeed");
    assert_eq!(cancelled.status, OrderStatusType::Cancelled);
    assert!(cancelled.cancelled_at.is_some());

    let level = db.fetch_stock_level("ORD-CHOC-5").await.expect("query").expect("row");
    assert_eq!(level.available(), 8, "reserved units return to availability");
    assert_eq!(level.reserved_quantity, 0);

    let full = orders.order(&cancelled.order_number).await.expect("order should load");
    assert_eq!(full.history.len(), 2);
    assert_eq!(full.history[1].status, OrderStatusType::Cancelled);
    assert_eq!(full.history[1].notes.as_deref(), Some("Customer changed their mind"));
}

#[tokio::test]
async fn delivered_orders_reject_cancellation() {
    let db = new_db().await;
    let truffles = seed_product(&db, "ORD-CHOC-6", "Rose Truffles", Fils::from_aed(40), 10).await;
    let carts = CartApi::new(db.clone());
    let orders = OrderFlowApi::new(db.clone());

    carts.add_item("order-sess-6", truffles, None, 1).await.expect("add should succeed");
    let full = orders.place_order("order-sess-6", &customer(), &dubai_address()).await.expect("order created");
    let number = full.order.order_number.clone();

    for status in [
        OrderStatusType::Confirmed,
        OrderStatusType::Processing,
        OrderStatusType::Shipped,
        OrderStatusType::Delivered,
    ] {
        orders.update_status(&number, status, None).await.expect("walk to delivered");
    }

    let err = orders.cancel_order(&number, None).await.expect_err("delivered orders cannot be cancelled");
    assert!(matches!(
        err,
        CheckoutError::InvalidTransition { from: OrderStatusType::Delivered, to: OrderStatusType::Cancelled }
    ));

    let full = orders.order(&number).await.expect("order should load");
    assert_eq!(full.order.status, OrderStatusType::Delivered);
    assert!(full.order.delivered_at.is_some());
    assert!(full.order.cancelled_at.is_none());
    // PENDING + 4 transitions, and nothing for the rejected cancel
    assert_eq!(full.history.len(), 5);
}

#[tokio::test]
async fn skipping_ahead_in_the_flow_is_rejected() {
    let db = new_db().await;
    let truffles = seed_product(&db, "ORD-CHOC-7", "Coffee Truffles", Fils::from_aed(35), 10).await;
    let carts = CartApi::new(db.clone());
    let orders = OrderFlowApi::new(db.clone());

    carts.add_item("order-sess-7", truffles, None, 1).await.expect("add should succeed");
    let full = orders.place_order("order-sess-7", &customer(), &dubai_address()).await.expect("order created");

    let err = orders
        .update_status(&full.order.order_number, OrderStatusType::Shipped, None)
        .await
        .expect_err("PENDING cannot jump to SHIPPED");
    assert!(matches!(err, CheckoutError::InvalidTransition { .. }));
}

#[tokio::test]
async fn order_item_snapshots_survive_catalog_rewrites() {
    let db = new_db().await;
    let mass = seed_product(&db, "ORD-COCO", "Coco Mass", Fils::from_aed(50), 0).await;
    let white =
        seed_variant(&db, mass, "ORD-COCO-W500", r#"{"Color": "White", "Weight": "500g"}"#, Fils::from_aed(55), 10)
            .await;
    let carts = CartApi::new(db.clone());
    let orders = OrderFlowApi::new(db.clone());

    carts.add_item("order-sess-8", mass, Some(white), 2).await.expect("add should succeed");
    let full = orders.place_order("order-sess-8", &customer(), &dubai_address()).await.expect("order created");
    let number = full.order.order_number.clone();

    // The product is renamed, re-priced and deactivated after the sale
    rewrite_product(&db, mass, "Legacy Coco Mass", Fils::from_aed(99), false).await;

    let full = orders.order(&number).await.expect("order should load");
    let item = &full.items[0];
    assert_eq!(item.product_name, "Coco Mass (500g, White)");
    assert_eq!(item.sku, "ORD-COCO-W500");
    assert_eq!(item.unit_price, Fils::from_aed(55));
    let options = item.options_map().expect("variant options snapshot");
    assert_eq!(options.get("Color").map(String::as_str), Some("White"));
    assert_eq!(options.get("Weight").map(String::as_str), Some("500g"));
}

#[tokio::test]
async fn unlisted_regions_get_the_default_delivery_fee() {
    let db = new_db().await;
    let truffles = seed_product(&db, "ORD-CHOC-8", "Ginger Truffles", Fils::from_aed(10), 10).await;
    let carts = CartApi::new(db.clone());
    let orders = OrderFlowApi::new(db.clone());

    carts.add_item("order-sess-9", truffles, None, 1).await.expect("add should succeed");
    let mut address = dubai_address();
    address.emirate = "HATTA OASIS".to_string();
    let full = orders.place_order("order-sess-9", &customer(), &address).await.expect("order created");
    assert_eq!(full.order.delivery_fee, Fils::from_aed(20));
}
