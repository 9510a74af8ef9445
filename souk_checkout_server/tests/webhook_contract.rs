//! Route-level tests for the inbound webhook contract: providers retry on non-2xx responses, so
//! the status codes are part of the external interface.
use actix_web::{http::StatusCode, test, web, App};
use payment_gateways::{mock::MockGateway, GatewayRegistry};
use serde_json::json;
use souk_checkout_engine::{
    db_types::{CustomerInfo, NewShippingAddress},
    test_utils::{
        prepare_env::{prepare_test_env, random_db_path},
        seed::seed_product,
    },
    CartApi,
    OrderFlowApi,
    PaymentsApi,
    SqliteDatabase,
};
use souk_checkout_server::routes::PaymentWebhookRoute;
use souk_common::Fils;

const SECRET: &str = "mock-webhook-secret";

/// A database with one pending order, a payment session against it, and the provider-side id.
async fn prepare_order_with_session(session_key: &str) -> (SqliteDatabase, String) {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    let product = seed_product(&db, "WEB-CHOC", "Gift Box", Fils::from_aed(100), 5).await;
    let carts = CartApi::new(db.clone());
    carts.add_item(session_key, product, None, 1).await.expect("add to cart");
    let customer = CustomerInfo {
        name: "Layla Hassan".to_string(),
        email: "layla@example.com".to_string(),
        phone: "+971559998877".to_string(),
        company: None,
    };
    let address = NewShippingAddress {
        full_name: "Layla Hassan".to_string(),
        phone_number: "+971559998877".to_string(),
        email: "layla@example.com".to_string(),
        address_line1: "Unit 9, Marina Walk".to_string(),
        address_line2: None,
        city: "Dubai".to_string(),
        emirate: "DUBAI".to_string(),
        area: None,
        postal_code: None,
        delivery_instructions: None,
    };
    let orders = OrderFlowApi::new(db.clone());
    let full = orders.place_order(session_key, &customer, &address).await.expect("order created");
    let payments = PaymentsApi::new(
        db.clone(),
        GatewayRegistry::new().with(MockGateway::new("ZIINA").with_webhook_secret(SECRET)),
    );
    let session = payments.create_session(&full.order.order_number, "ZIINA").await.expect("session created");
    (db, session.payment.gateway_payment_id)
}

/// Spins up the webhook route against the given database and posts one JSON delivery.
async fn post_webhook(db: &SqliteDatabase, uri: &str, body: &serde_json::Value) -> StatusCode {
    let payments = PaymentsApi::new(
        db.clone(),
        GatewayRegistry::new().with(MockGateway::new("ZIINA").with_webhook_secret(SECRET)),
    );
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(payments))
            .service(PaymentWebhookRoute::<SqliteDatabase, MockGateway>::new()),
    )
    .await;
    let req = test::TestRequest::post().uri(uri).set_json(body).to_request();
    test::call_service(&app, req).await.status()
}

/// As [`post_webhook`], but with a raw (possibly invalid) body.
async fn post_raw_webhook(db: &SqliteDatabase, uri: &str, body: &'static str) -> StatusCode {
    let payments = PaymentsApi::new(
        db.clone(),
        GatewayRegistry::new().with(MockGateway::new("ZIINA").with_webhook_secret(SECRET)),
    );
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(payments))
            .service(PaymentWebhookRoute::<SqliteDatabase, MockGateway>::new()),
    )
    .await;
    let req = test::TestRequest::post()
        .uri(uri)
        .insert_header(("content-type", "application/json"))
        .set_payload(body)
        .to_request();
    test::call_service(&app, req).await.status()
}

#[actix_web::test]
async fn accepted_webhooks_return_200_even_on_redelivery() {
    let _ = env_logger::try_init();
    let (db, gateway_id) = prepare_order_with_session("web-sess-1").await;
    let payload = json!({"payment_id": gateway_id, "status": "completed", "amount": 12000, "signature": SECRET});

    assert_eq!(post_webhook(&db, "/webhooks/ziina", &payload).await, StatusCode::OK);
    // Redelivery is an idempotent no-op, still acknowledged
    assert_eq!(post_webhook(&db, "/webhooks/ziina", &payload).await, StatusCode::OK);
}

#[actix_web::test]
async fn malformed_json_returns_400() {
    let _ = env_logger::try_init();
    let (db, _) = prepare_order_with_session("web-sess-2").await;
    assert_eq!(post_raw_webhook(&db, "/webhooks/ziina", "{this is not json").await, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn failed_signature_verification_returns_400() {
    let _ = env_logger::try_init();
    let (db, gateway_id) = prepare_order_with_session("web-sess-3").await;
    let payload = json!({"payment_id": gateway_id, "status": "completed", "amount": 12000, "signature": "forged"});
    assert_eq!(post_webhook(&db, "/webhooks/ziina", &payload).await, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn webhooks_for_unknown_payments_are_still_acknowledged() {
    let _ = env_logger::try_init();
    let (db, _) = prepare_order_with_session("web-sess-4").await;
    let payload = json!({"payment_id": "pi_unknown", "status": "completed", "amount": 12000, "signature": SECRET});
    assert_eq!(post_webhook(&db, "/webhooks/ziina", &payload).await, StatusCode::OK);
}

#[actix_web::test]
async fn unknown_gateway_names_return_400() {
    let _ = env_logger::try_init();
    let (db, gateway_id) = prepare_order_with_session("web-sess-5").await;
    let payload = json!({"payment_id": gateway_id, "status": "completed", "amount": 12000, "signature": SECRET});
    assert_eq!(post_webhook(&db, "/webhooks/stripe", &payload).await, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn internal_failures_are_not_masked_as_success() {
    let _ = env_logger::try_init();
    let (db, gateway_id) = prepare_order_with_session("web-sess-6").await;
    // Break the receipt log so processing fails internally
    sqlx::query("DROP TABLE payment_webhooks").execute(db.pool()).await.expect("drop table");
    let payload = json!({"payment_id": gateway_id, "status": "completed", "amount": 12000, "signature": SECRET});
    assert_eq!(post_webhook(&db, "/webhooks/ziina", &payload).await, StatusCode::INTERNAL_SERVER_ERROR);
}
