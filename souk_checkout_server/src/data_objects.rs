use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use souk_checkout_engine::{
    db_types::{Cart, CartSummary, CustomerInfo, NewShippingAddress, OrderNumber, OrderStatusType},
    PaymentSession,
};
use souk_common::Fils;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

//--------------------------------------     Cart DTOs      ----------------------------------------------------------
#[derive(Debug, Clone, Deserialize)]
pub struct AddItemRequest {
    pub product_id: i64,
    #[serde(default)]
    pub variant_id: Option<i64>,
    pub quantity: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i64,
}

/// A cart with its computed totals, as served to the storefront. Amounts are fils.
#[derive(Debug, Clone, Serialize)]
pub struct CartResponse {
    pub cart: Cart,
    pub items: Vec<CartLineView>,
    pub subtotal: Fils,
    pub tax_amount: Fils,
    pub total: Fils,
    pub item_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub item_id: i64,
    pub product_id: i64,
    pub variant_id: Option<i64>,
    pub display_name: String,
    pub sku: String,
    pub quantity: i64,
    pub unit_price: Fils,
    pub subtotal: Fils,
}

impl From<CartSummary> for CartResponse {
    fn from(summary: CartSummary) -> Self {
        let subtotal = summary.subtotal();
        let tax_amount = summary.tax_amount();
        let total = summary.total();
        let item_count = summary.item_count();
        let items = summary
            .items
            .into_iter()
            .map(|line| CartLineView {
                display_name: line.display_name(),
                subtotal: line.subtotal(),
                item_id: line.item_id,
                product_id: line.product_id,
                variant_id: line.variant_id,
                sku: line.sku,
                quantity: line.quantity,
                unit_price: line.price_at_addition,
            })
            .collect();
        Self { cart: summary.cart, items, subtotal, tax_amount, total, item_count }
    }
}

//--------------------------------------    Order DTOs      ----------------------------------------------------------
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub session_key: String,
    pub customer: CustomerInfo,
    pub shipping_address: NewShippingAddress,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderListQuery {
    #[serde(default)]
    pub status: Option<OrderStatusType>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatusType,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelOrderRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

//--------------------------------------   Payment DTOs     ----------------------------------------------------------
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayListQuery {
    /// Amount in fils; without it the full catalog is returned.
    #[serde(default)]
    pub amount: Option<i64>,
    /// "BNPL" or "INSTANT"
    #[serde(default)]
    pub preference: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentSessionRequest {
    pub order_number: OrderNumber,
    pub gateway: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentSessionResponse {
    pub success: bool,
    pub message: String,
    pub payment_id: String,
    pub payment_url: String,
    pub expires_at: DateTime<Utc>,
    pub amount: Fils,
}

impl From<PaymentSession> for PaymentSessionResponse {
    fn from(session: PaymentSession) -> Self {
        Self {
            success: true,
            message: "Payment session created successfully".to_string(),
            payment_id: session.payment.payment_id.to_string(),
            payment_url: session.redirect_url,
            expires_at: session.expires_at,
            amount: session.payment.amount,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefundRequest {
    /// Amount in fils.
    pub amount: Fils,
    #[serde(default)]
    pub reason: Option<String>,
}
