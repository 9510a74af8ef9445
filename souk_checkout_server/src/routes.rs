//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module
//! neat and tidy 🙏
use std::str::FromStr;

use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use payment_gateways::{
    data_objects::{GatewayKind, GATEWAY_CATALOG},
    GatewayError,
    PaymentGatewayClient,
};
use serde_json::{json, Value};
use souk_checkout_engine::{
    db_types::{OrderNumber, OrderQueryFilter},
    traits::{CartManagement, CheckoutDatabase, CheckoutError, OrderManagement},
    CartApi,
    OrderFlowApi,
    PaymentsApi,
};
use souk_common::Fils;

use crate::{
    data_objects::{
        AddItemRequest,
        CancelOrderRequest,
        CartResponse,
        CheckoutRequest,
        GatewayListQuery,
        JsonResponse,
        OrderListQuery,
        PaymentSessionRequest,
        PaymentSessionResponse,
        RefundRequest,
        UpdateItemRequest,
        UpdateStatusRequest,
    },
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!`
// macro: one marker struct per route, registering the generic handler for a concrete backend.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! {
            impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self {
                    Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
                }
            }
        }
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------    Cart    ----------------------------------------------------
route!(cart_summary => Get "/cart/{session_key}" impl CartManagement);
pub async fn cart_summary<B: CartManagement>(
    path: web::Path<String>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let session_key = path.into_inner();
    trace!("💻️ GET cart for session {session_key}");
    let summary = api.cart(&session_key).await?;
    Ok(HttpResponse::Ok().json(CartResponse::from(summary)))
}

route!(add_cart_item => Post "/cart/{session_key}/items" impl CartManagement);
pub async fn add_cart_item<B: CartManagement>(
    path: web::Path<String>,
    body: web::Json<AddItemRequest>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let session_key = path.into_inner();
    let req = body.into_inner();
    let item = api.add_item(&session_key, req.product_id, req.variant_id, req.quantity).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("Cart updated: item now holds {} unit(s)", item.quantity),
        "item": item,
    })))
}

route!(update_cart_item => Put "/cart/items/{item_id}" impl CartManagement);
pub async fn update_cart_item<B: CartManagement>(
    path: web::Path<i64>,
    body: web::Json<UpdateItemRequest>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let item_id = path.into_inner();
    match api.update_item(item_id, body.quantity).await? {
        Some(item) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Cart updated successfully",
            "item": item,
        }))),
        None => Ok(HttpResponse::Ok().json(JsonResponse::success("Item removed from cart"))),
    }
}

route!(remove_cart_item => Delete "/cart/items/{item_id}" impl CartManagement);
pub async fn remove_cart_item<B: CartManagement>(
    path: web::Path<i64>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    api.remove_item(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Item removed from cart")))
}

route!(clear_cart => Delete "/cart/{session_key}" impl CartManagement);
pub async fn clear_cart<B: CartManagement>(
    path: web::Path<String>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let removed = api.clear(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Cleared {removed} items from cart"))))
}

//----------------------------------------------   Orders   ----------------------------------------------------
route!(checkout => Post "/checkout" impl OrderManagement);
pub async fn checkout<B: OrderManagement>(
    body: web::Json<CheckoutRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let req = body.into_inner();
    let full = api.place_order(&req.session_key, &req.customer, &req.shipping_address).await?;
    info!("💻️ Checkout complete for session {}: {}", req.session_key, full.order.order_number);
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": format!("Order created successfully: {}", full.order.order_number),
        "order": full,
    })))
}

route!(order_by_number => Get "/orders/{order_number}" impl OrderManagement);
pub async fn order_by_number<B: OrderManagement>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_number = OrderNumber::from(path.into_inner());
    let full = api.order(&order_number).await?;
    Ok(HttpResponse::Ok().json(full))
}

route!(orders_search => Get "/orders" impl OrderManagement);
pub async fn orders_search<B: OrderManagement>(
    query: web::Query<OrderListQuery>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let query = query.into_inner();
    let mut filter = OrderQueryFilter::default();
    if let Some(status) = query.status {
        filter = filter.with_status(status);
    }
    if let Some(limit) = query.limit {
        filter = filter.with_limit(limit);
    }
    let orders = api.search(filter).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(update_order_status => Post "/orders/{order_number}/status" impl OrderManagement);
pub async fn update_order_status<B: OrderManagement>(
    path: web::Path<String>,
    body: web::Json<UpdateStatusRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_number = OrderNumber::from(path.into_inner());
    let req = body.into_inner();
    let order = api.update_status(&order_number, req.status, req.notes).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("Order {} status updated to {}", order.order_number, order.status),
        "order": order,
    })))
}

route!(cancel_order => Post "/orders/{order_number}/cancel" impl OrderManagement);
pub async fn cancel_order<B: OrderManagement>(
    path: web::Path<String>,
    body: web::Json<CancelOrderRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_number = OrderNumber::from(path.into_inner());
    let order = api.cancel_order(&order_number, body.into_inner().reason).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("Order {} cancelled successfully", order.order_number),
        "order": order,
    })))
}

//----------------------------------------------  Payments  ----------------------------------------------------
route!(list_gateways => Get "/payments/gateways" impl CheckoutDatabase, PaymentGatewayClient);
pub async fn list_gateways<B, G>(
    query: web::Query<GatewayListQuery>,
    api: web::Data<PaymentsApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: CheckoutDatabase,
    G: PaymentGatewayClient,
{
    let query = query.into_inner();
    let preference = match query.preference.as_deref() {
        Some(p) => Some(
            GatewayKind::from_str(p).map_err(|e| ServerError::Checkout(CheckoutError::Validation(e)))?,
        ),
        None => None,
    };
    let body = match query.amount {
        Some(amount) => {
            let suitable = api.suitable_gateways(Fils::from(amount), preference);
            json!({ "suitable_gateways": suitable, "all_gateways": GATEWAY_CATALOG })
        },
        None => json!({ "all_gateways": GATEWAY_CATALOG }),
    };
    Ok(HttpResponse::Ok().json(body))
}

route!(create_payment_session => Post "/payments/session" impl CheckoutDatabase, PaymentGatewayClient);
pub async fn create_payment_session<B, G>(
    body: web::Json<PaymentSessionRequest>,
    api: web::Data<PaymentsApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: CheckoutDatabase,
    G: PaymentGatewayClient,
{
    let req = body.into_inner();
    let session = api.create_session(&req.order_number, &req.gateway).await?;
    Ok(HttpResponse::Created().json(PaymentSessionResponse::from(session)))
}

route!(verify_payment => Post "/payments/{payment_id}/verify" impl CheckoutDatabase, PaymentGatewayClient);
pub async fn verify_payment<B, G>(
    path: web::Path<String>,
    api: web::Data<PaymentsApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: CheckoutDatabase,
    G: PaymentGatewayClient,
{
    let payment = api.verify_payment(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Payment verified successfully",
        "payment": payment,
    })))
}

route!(refund_payment => Post "/payments/{payment_id}/refund" impl CheckoutDatabase, PaymentGatewayClient);
pub async fn refund_payment<B, G>(
    path: web::Path<String>,
    body: web::Json<RefundRequest>,
    api: web::Data<PaymentsApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: CheckoutDatabase,
    G: PaymentGatewayClient,
{
    let req = body.into_inner();
    let refund = api.refund_payment(&path.into_inner(), req.amount, req.reason).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Refund processed successfully",
        "refund": refund,
    })))
}

//----------------------------------------------  Webhooks  ----------------------------------------------------
route!(payment_webhook => Post "/webhooks/{gateway}" impl CheckoutDatabase, PaymentGatewayClient);
/// Inbound webhook endpoint for all providers.
///
/// Providers drive their retry policies off the response status, so the mapping is strict:
/// 200 for accepted deliveries (including idempotent no-ops and receipts for unknown payments),
/// 400 for malformed JSON, failed signature checks or unknown gateway names, and 500 for
/// internal failures so the provider redelivers.
pub async fn payment_webhook<B, G>(
    path: web::Path<String>,
    body: web::Bytes,
    api: web::Data<PaymentsApi<B, G>>,
) -> HttpResponse
where
    B: CheckoutDatabase,
    G: PaymentGatewayClient,
{
    let gateway = path.into_inner();
    trace!("🧾️ Received {gateway} webhook ({} bytes)", body.len());
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("🧾️ Invalid JSON in {gateway} webhook. {e}");
            return HttpResponse::BadRequest().json(JsonResponse::failure("Invalid JSON"));
        },
    };
    match api.handle_webhook(&gateway, payload).await {
        Ok(ack) if ack.known_payment => {
            info!("🧾️ {gateway} webhook {} processed: {}", ack.webhook_id, ack.status);
            HttpResponse::Ok().json(JsonResponse::success("Webhook processed"))
        },
        Ok(ack) => {
            info!("🧾️ {gateway} webhook {} logged; no matching payment", ack.webhook_id);
            HttpResponse::Ok().json(JsonResponse::success("Webhook logged"))
        },
        Err(CheckoutError::Gateway(
            e @ (GatewayError::InvalidSignature(_) |
            GatewayError::UnknownGateway(_) |
            GatewayError::ResponseFormat { .. }),
        )) => {
            warn!("🧾️ {gateway} webhook rejected. {e}");
            HttpResponse::BadRequest().json(JsonResponse::failure(e))
        },
        Err(e) => {
            // NACK so the provider retries; never mask internal failures as success
            error!("🧾️ {gateway} webhook processing failed. {e}");
            HttpResponse::InternalServerError().json(JsonResponse::failure("Internal server error"))
        },
    }
}
