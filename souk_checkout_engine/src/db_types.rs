use std::{collections::HashMap, fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use payment_gateways::data_objects::CanonicalStatus;
use serde::{Deserialize, Serialize};
use souk_common::Fils;
use sqlx::{FromRow, Type};
use thiserror::Error;

use crate::helpers::VAT_RATE_PERCENT;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(pub String);

//--------------------------------------    OrderNumber     ----------------------------------------------------------
/// The public, human-readable order identifier (`ORD-` + 8 uppercase hex chars). Assigned exactly
/// once at creation and never reused, even after cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderNumber(pub String);

impl FromStr for OrderNumber {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OrderNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------     PaymentId      ----------------------------------------------------------
/// The locally assigned payment identifier (`PAY-` + 12 uppercase hex chars). Distinct from the
/// provider's session id, which lives in `Payment::gateway_payment_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct PaymentId(pub String);

impl From<String> for PaymentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for PaymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PaymentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------   OrderStatusType  ----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatusType {
    /// Order created; stock is reserved but payment has not been confirmed.
    Pending,
    /// Payment confirmed; reserved stock has been deducted.
    Confirmed,
    /// The order is being prepared.
    Processing,
    /// The order has left the warehouse.
    Shipped,
    /// The order has reached the customer.
    Delivered,
    /// The order was cancelled before delivery.
    Cancelled,
    /// The payment was refunded in full.
    Refunded,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatusType::Pending => "PENDING",
            OrderStatusType::Confirmed => "CONFIRMED",
            OrderStatusType::Processing => "PROCESSING",
            OrderStatusType::Shipped => "SHIPPED",
            OrderStatusType::Delivered => "DELIVERED",
            OrderStatusType::Cancelled => "CANCELLED",
            OrderStatusType::Refunded => "REFUNDED",
        };
        write!(f, "{s}")
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "CONFIRMED" => Ok(Self::Confirmed),
            "PROCESSING" => Ok(Self::Processing),
            "SHIPPED" => Ok(Self::Shipped),
            "DELIVERED" => Ok(Self::Delivered),
            "CANCELLED" => Ok(Self::Cancelled),
            "REFUNDED" => Ok(Self::Refunded),
            other => Err(ConversionError(format!("Invalid order status: {other}"))),
        }
    }
}

impl OrderStatusType {
    /// Terminal states accept no further transitions of any kind.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled | Self::Refunded)
    }

    /// The next state in the fulfilment flow, if any.
    pub fn next_in_flow(&self) -> Option<OrderStatusType> {
        match self {
            Self::Pending => Some(Self::Confirmed),
            Self::Confirmed => Some(Self::Processing),
            Self::Processing => Some(Self::Shipped),
            Self::Shipped => Some(Self::Delivered),
            Self::Delivered | Self::Cancelled | Self::Refunded => None,
        }
    }

    /// Whether `new` is a legal transition target from this state.
    ///
    /// | From \ To  | next-in-flow | Cancelled | Refunded | anything else |
    /// |------------|--------------|-----------|----------|---------------|
    /// | Pending    | ✓            | ✓         | ✓        | ✗             |
    /// | Confirmed  | ✓            | ✓         | ✓        | ✗             |
    /// | Processing | ✓            | ✓         | ✓        | ✗             |
    /// | Shipped    | ✓            | ✓         | ✓        | ✗             |
    /// | Delivered  | ✗            | ✗         | ✗        | ✗             |
    /// | Cancelled  | ✗            | ✗         | ✗        | ✗             |
    /// | Refunded   | ✗            | ✗         | ✗        | ✗             |
    ///
    /// A transition to the current state is rejected; skipping ahead in the fulfilment flow is
    /// rejected.
    pub fn can_transition_to(&self, new: OrderStatusType) -> bool {
        if *self == new {
            return false;
        }
        match new {
            Self::Cancelled | Self::Refunded => !self.is_terminal(),
            _ => self.next_in_flow() == Some(new),
        }
    }
}

//--------------------------------------     OrderType      ----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Retail,
}

impl Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::Retail => write!(f, "RETAIL"),
        }
    }
}

//-------------------------------------- PaymentStatusType  ----------------------------------------------------------
/// Local payment status: the canonical gateway vocabulary plus `Refunded`. `Unknown` is
/// deliberately absent — an unmapped provider status never overwrites local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatusType {
    Pending,
    Authorized,
    Completed,
    Failed,
    Cancelled,
    Expired,
    Refunded,
}

impl Display for PaymentStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentStatusType::Pending => "PENDING",
            PaymentStatusType::Authorized => "AUTHORIZED",
            PaymentStatusType::Completed => "COMPLETED",
            PaymentStatusType::Failed => "FAILED",
            PaymentStatusType::Cancelled => "CANCELLED",
            PaymentStatusType::Expired => "EXPIRED",
            PaymentStatusType::Refunded => "REFUNDED",
        };
        write!(f, "{s}")
    }
}

impl PaymentStatusType {
    /// Terminal payment statuses are never regressed by stale webhooks or verification calls.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Authorized)
    }

    /// Maps a canonical gateway status onto the local vocabulary. `Unknown` maps to `None`,
    /// meaning "leave the payment untouched".
    pub fn from_canonical(status: CanonicalStatus) -> Option<Self> {
        match status {
            CanonicalStatus::Pending => Some(Self::Pending),
            CanonicalStatus::Authorized => Some(Self::Authorized),
            CanonicalStatus::Completed => Some(Self::Completed),
            CanonicalStatus::Failed => Some(Self::Failed),
            CanonicalStatus::Cancelled => Some(Self::Cancelled),
            CanonicalStatus::Expired => Some(Self::Expired),
            CanonicalStatus::Unknown => None,
        }
    }
}

//--------------------------------------  RefundStatusType  ----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum RefundStatusType {
    Pending,
    Completed,
    Failed,
}

//-------------------------------------- WebhookStatusType  ----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum WebhookStatusType {
    Received,
    Processed,
    Failed,
}

//--------------------------------------      Catalog       ----------------------------------------------------------
/// A catalog product. The catalog is a read-only collaborator from this crate's point of view;
/// products are only ever looked up, never mutated here.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Product {
    pub id: i64,
    pub sku: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub base_price: Fils,
    pub sale_price: Option<Fils>,
    pub currency: String,
    pub has_variants: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Sale price overrides base price when set.
    pub fn effective_price(&self) -> Fils {
        self.sale_price.unwrap_or(self.base_price)
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProductVariant {
    pub id: i64,
    pub product_id: i64,
    pub sku: String,
    /// Option-name → value map, stored as JSON (e.g. `{"Color": "White", "Weight": "500g"}`).
    pub options: String,
    pub price: Fils,
    pub sale_price: Option<Fils>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductVariant {
    pub fn effective_price(&self) -> Fils {
        self.sale_price.unwrap_or(self.price)
    }

    pub fn options_map(&self) -> HashMap<String, String> {
        serde_json::from_str(&self.options).unwrap_or_default()
    }
}

//--------------------------------------    StockLevel      ----------------------------------------------------------
/// One stock-ledger row, keyed by SKU. Mutated only through the reserve/release/commit
/// operations in the inventory layer.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StockLevel {
    pub sku: String,
    pub quantity_in_stock: i64,
    pub reserved_quantity: i64,
    pub low_stock_threshold: i64,
    pub updated_at: DateTime<Utc>,
}

impl StockLevel {
    pub fn available(&self) -> i64 {
        self.quantity_in_stock - self.reserved_quantity
    }

    pub fn is_in_stock(&self) -> bool {
        self.available() > 0
    }

    pub fn is_low_stock(&self) -> bool {
        self.available() <= self.low_stock_threshold
    }
}

//--------------------------------------       Cart         ----------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Cart {
    pub id: i64,
    pub session_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Cart {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CartItem {
    pub id: i64,
    pub cart_id: i64,
    pub product_id: i64,
    pub variant_id: Option<i64>,
    pub quantity: i64,
    /// Price captured when the item was added; not re-priced on read.
    pub price_at_addition: Fils,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartItem {
    pub fn subtotal(&self) -> Fils {
        self.price_at_addition * self.quantity
    }
}

/// A cart item joined with the catalog data needed to display it or snapshot it into an order.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CartLine {
    pub item_id: i64,
    pub product_id: i64,
    pub variant_id: Option<i64>,
    pub product_name: String,
    pub sku: String,
    pub variant_options: Option<String>,
    pub quantity: i64,
    pub price_at_addition: Fils,
}

impl CartLine {
    pub fn subtotal(&self) -> Fils {
        self.price_at_addition * self.quantity
    }

    pub fn options_map(&self) -> Option<HashMap<String, String>> {
        self.variant_options.as_deref().map(|s| serde_json::from_str(s).unwrap_or_default())
    }

    /// "Coco Mass (White, 500g)" for variants, the bare product name otherwise.
    pub fn display_name(&self) -> String {
        match self.options_map() {
            Some(options) if !options.is_empty() => {
                let mut values: Vec<&str> = options.values().map(String::as_str).collect();
                values.sort_unstable();
                format!("{} ({})", self.product_name, values.join(", "))
            },
            _ => self.product_name.clone(),
        }
    }
}

/// A cart with its lines and computed totals. The delivery fee is *not* part of cart totals; it
/// is added at order creation, once the emirate is known.
#[derive(Debug, Clone, Serialize)]
pub struct CartSummary {
    pub cart: Cart,
    pub items: Vec<CartLine>,
}

impl CartSummary {
    pub fn subtotal(&self) -> Fils {
        self.items.iter().map(CartLine::subtotal).sum()
    }

    pub fn tax_amount(&self) -> Fils {
        self.subtotal().percentage(VAT_RATE_PERCENT)
    }

    pub fn total(&self) -> Fils {
        self.subtotal() + self.tax_amount()
    }

    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

//--------------------------------------       Order        ----------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Order {
    pub id: i64,
    pub order_number: OrderNumber,
    pub order_type: OrderType,
    pub status: OrderStatusType,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub subtotal: Fils,
    pub discount_amount: Fils,
    pub tax_amount: Fils,
    pub delivery_fee: Fils,
    pub total_amount: Fils,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// The fields of a new order row. Totals are computed by the order factory before insertion.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: OrderNumber,
    pub order_type: OrderType,
    pub customer: CustomerInfo,
    pub subtotal: Fils,
    pub discount_amount: Fils,
    pub tax_amount: Fils,
    pub delivery_fee: Fils,
    pub total_amount: Fils,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub company: Option<String>,
}

/// An immutable order line. Product name, SKU, variant options and prices are snapshotted at
/// order-creation time and never re-derived from the live catalog.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_name: String,
    pub sku: String,
    pub variant_options: Option<String>,
    pub quantity: i64,
    pub unit_price: Fils,
    pub tax_amount: Fils,
    pub total_price: Fils,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    pub fn options_map(&self) -> Option<HashMap<String, String>> {
        self.variant_options.as_deref().map(|s| serde_json::from_str(s).unwrap_or_default())
    }
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_name: String,
    pub sku: String,
    pub variant_options: Option<String>,
    pub quantity: i64,
    pub unit_price: Fils,
    pub tax_amount: Fils,
    pub total_price: Fils,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ShippingAddress {
    pub id: i64,
    pub order_id: i64,
    pub full_name: String,
    pub phone_number: String,
    pub email: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub emirate: String,
    pub area: Option<String>,
    pub postal_code: Option<String>,
    pub country: String,
    pub delivery_instructions: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewShippingAddress {
    pub full_name: String,
    pub phone_number: String,
    pub email: String,
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: Option<String>,
    pub city: String,
    pub emirate: String,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub delivery_instructions: Option<String>,
}

/// One entry in an order's append-only audit trail. Entries are never mutated or deleted.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StatusHistoryEntry {
    pub id: i64,
    pub order_id: i64,
    pub status: OrderStatusType,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An order with everything it owns.
#[derive(Debug, Clone, Serialize)]
pub struct FullOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub shipping_address: Option<ShippingAddress>,
    pub history: Vec<StatusHistoryEntry>,
}

/// Search criteria for the order admin listing.
#[derive(Debug, Clone, Default)]
pub struct OrderQueryFilter {
    pub status: Option<OrderStatusType>,
    pub order_type: Option<OrderType>,
    pub limit: Option<i64>,
}

impl OrderQueryFilter {
    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_order_type(mut self, order_type: OrderType) -> Self {
        self.order_type = Some(order_type);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.order_type.is_none()
    }
}

//--------------------------------------      Payment       ----------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Payment {
    pub id: i64,
    pub payment_id: PaymentId,
    /// The provider's session/payment-intent id; webhooks are resolved through this.
    pub gateway_payment_id: String,
    pub order_id: i64,
    pub gateway: String,
    pub payment_method: String,
    pub amount: Fils,
    pub currency: String,
    pub status: PaymentStatusType,
    pub gateway_transaction_id: Option<String>,
    pub gateway_response: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub authorized_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub payment_id: PaymentId,
    pub gateway_payment_id: String,
    pub order_id: i64,
    pub gateway: String,
    pub amount: Fils,
    pub currency: String,
    pub gateway_response: String,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Refund {
    pub id: i64,
    pub refund_id: String,
    pub payment_id: PaymentId,
    pub amount: Fils,
    pub reason: String,
    pub status: RefundStatusType,
    pub gateway_refund_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewRefund {
    pub refund_id: String,
    pub payment_id: PaymentId,
    pub amount: Fils,
    pub reason: String,
    pub gateway_refund_id: Option<String>,
}

/// A received webhook payload, logged for audit and replay regardless of whether processing
/// succeeded.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WebhookRecord {
    pub id: i64,
    pub gateway: String,
    pub gateway_payment_id: Option<String>,
    pub webhook_type: String,
    pub payload: String,
    pub status: WebhookStatusType,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod test {
    use super::OrderStatusType::*;

    #[test]
    fn forward_transitions_follow_the_flow() {
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));
        // No skipping ahead
        assert!(!Pending.can_transition_to(Processing));
        assert!(!Confirmed.can_transition_to(Delivered));
        // No going back
        assert!(!Shipped.can_transition_to(Confirmed));
        // No self-transitions
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn cancellation_and_refund_are_absorbing() {
        for status in [Pending, Confirmed, Processing, Shipped] {
            assert!(status.can_transition_to(Cancelled), "{status} should be cancellable");
            assert!(status.can_transition_to(Refunded), "{status} should be refundable");
        }
        for status in [Delivered, Cancelled, Refunded] {
            assert!(!status.can_transition_to(Cancelled), "{status} should reject cancellation");
            assert!(!status.can_transition_to(Refunded), "{status} should reject refund transition");
            assert!(status.is_terminal());
        }
    }
}
