use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use payment_gateways::{Gateway, GatewayRegistry};
use souk_checkout_engine::{CartApi, OrderFlowApi, PaymentsApi, SqliteDatabase};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    routes::{
        health,
        AddCartItemRoute,
        CancelOrderRoute,
        CartSummaryRoute,
        CheckoutRoute,
        ClearCartRoute,
        CreatePaymentSessionRoute,
        ListGatewaysRoute,
        OrderByNumberRoute,
        OrdersSearchRoute,
        PaymentWebhookRoute,
        RefundPaymentRoute,
        RemoveCartItemRoute,
        UpdateCartItemRoute,
        UpdateOrderStatusRoute,
        VerifyPaymentRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let registry = config.build_gateway_registry()?;
    let srv = create_server_instance(config, db, registry)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    registry: GatewayRegistry,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let cart_api = CartApi::new(db.clone());
        let order_api = OrderFlowApi::new(db.clone());
        let payments_api = PaymentsApi::new(db.clone(), registry.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("souk::access_log"))
            .app_data(web::Data::new(cart_api))
            .app_data(web::Data::new(order_api))
            .app_data(web::Data::new(payments_api))
            .service(health)
            .service(CartSummaryRoute::<SqliteDatabase>::new())
            .service(AddCartItemRoute::<SqliteDatabase>::new())
            .service(UpdateCartItemRoute::<SqliteDatabase>::new())
            .service(RemoveCartItemRoute::<SqliteDatabase>::new())
            .service(ClearCartRoute::<SqliteDatabase>::new())
            .service(CheckoutRoute::<SqliteDatabase>::new())
            .service(OrderByNumberRoute::<SqliteDatabase>::new())
            .service(OrdersSearchRoute::<SqliteDatabase>::new())
            .service(UpdateOrderStatusRoute::<SqliteDatabase>::new())
            .service(CancelOrderRoute::<SqliteDatabase>::new())
            .service(ListGatewaysRoute::<SqliteDatabase, Gateway>::new())
            .service(CreatePaymentSessionRoute::<SqliteDatabase, Gateway>::new())
            .service(VerifyPaymentRoute::<SqliteDatabase, Gateway>::new())
            .service(RefundPaymentRoute::<SqliteDatabase, Gateway>::new())
            .service(PaymentWebhookRoute::<SqliteDatabase, Gateway>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
