use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use souk_common::Fils;

//--------------------------------------  CanonicalStatus  -----------------------------------------------------------
/// The gateway-agnostic payment status vocabulary. Every provider's native statuses map onto this
/// set; anything a provider sends that has no mapping becomes `Unknown` rather than an error, so
/// a provider adding a new status can never take down webhook processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalStatus {
    Pending,
    Authorized,
    Completed,
    Failed,
    Cancelled,
    Expired,
    Unknown,
}

impl CanonicalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalStatus::Pending => "pending",
            CanonicalStatus::Authorized => "authorized",
            CanonicalStatus::Completed => "completed",
            CanonicalStatus::Failed => "failed",
            CanonicalStatus::Cancelled => "cancelled",
            CanonicalStatus::Expired => "expired",
            CanonicalStatus::Unknown => "unknown",
        }
    }
}

impl Display for CanonicalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CanonicalStatus {
    type Err = ();

    /// Infallible by design: unrecognized values become `Unknown`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s {
            "pending" => Self::Pending,
            "authorized" => Self::Authorized,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "cancelled" => Self::Cancelled,
            "expired" => Self::Expired,
            _ => Self::Unknown,
        };
        Ok(status)
    }
}

//--------------------------------------   OrderSnapshot   -----------------------------------------------------------
/// The canonical view of an order that is handed to a gateway when creating a checkout session.
/// This is a snapshot, not a live reference: amounts and line items are fixed at order-creation
/// time and are passed through to the provider verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub order_id: String,
    pub amount: Fils,
    pub currency: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub tax_amount: Fils,
    pub shipping_amount: Fils,
    pub discount_amount: Fils,
    pub items: Vec<SnapshotItem>,
    pub shipping_address: Option<SnapshotAddress>,
}

impl OrderSnapshot {
    /// First name / surname split for providers that insist on separate fields.
    pub fn name_parts(&self) -> (&str, &str) {
        match self.customer_name.split_once(' ') {
            Some((first, rest)) => (first, rest),
            None => (self.customer_name.as_str(), ""),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotItem {
    pub name: String,
    pub sku: String,
    pub quantity: i64,
    pub unit_price: Fils,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotAddress {
    pub full_name: String,
    pub phone_number: String,
    pub address_line1: String,
    pub city: String,
    pub emirate: String,
    pub country: String,
}

//--------------------------------------  Session / events  ----------------------------------------------------------
/// A checkout session created at a provider. The customer must be redirected to `redirect_url`
/// before `expires_at`; confirmation arrives later via webhook.
#[derive(Debug, Clone)]
pub struct NewPaymentSession {
    pub gateway_payment_id: String,
    pub redirect_url: String,
    pub expires_at: DateTime<Utc>,
    pub raw: Value,
}

/// The provider's current view of a payment, as returned by the status-retrieval endpoint.
#[derive(Debug, Clone)]
pub struct PaymentStanding {
    pub status: CanonicalStatus,
    pub amount: Fils,
    pub transaction_id: Option<String>,
    pub raw: Value,
}

/// A normalized webhook notification. `gateway_payment_id` is the provider's session/payment id,
/// which the orchestrator resolves back to a local payment record.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub gateway_payment_id: String,
    pub status: CanonicalStatus,
    pub amount: Fils,
    pub raw: Value,
}

#[derive(Debug, Clone)]
pub struct RefundReceipt {
    pub gateway_refund_id: String,
    pub amount: Fils,
    pub raw: Value,
}

//--------------------------------------   Gateway catalog  ----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GatewayKind {
    Bnpl,
    Instant,
}

impl FromStr for GatewayKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BNPL" => Ok(Self::Bnpl),
            "INSTANT" => Ok(Self::Instant),
            other => Err(format!("Unknown gateway kind: {other}")),
        }
    }
}

/// Static capability record for a gateway. The catalog is fixed at compile time and read-mostly
/// at runtime; per-process credentials live in [`crate::config`], not here.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayInfo {
    pub name: &'static str,
    pub display_name: &'static str,
    pub kind: GatewayKind,
    pub description: &'static str,
    pub min_amount: Fils,
    pub max_amount: Fils,
    pub features: &'static [&'static str],
}

pub const GATEWAY_CATALOG: [GatewayInfo; 3] = [
    GatewayInfo {
        name: "TABBY",
        display_name: "Tabby",
        kind: GatewayKind::Bnpl,
        description: "Buy Now, Pay Later - 4 installments",
        min_amount: Fils::from_fils(5_000),
        max_amount: Fils::from_fils(1_000_000),
        features: &["installments", "no_interest", "instant_approval"],
    },
    GatewayInfo {
        name: "TAMARA",
        display_name: "Tamara",
        kind: GatewayKind::Bnpl,
        description: "Buy Now, Pay Later - Flexible installments",
        min_amount: Fils::from_fils(10_000),
        max_amount: Fils::from_fils(1_500_000),
        features: &["flexible_installments", "no_interest", "instant_approval"],
    },
    GatewayInfo {
        name: "ZIINA",
        display_name: "Ziina",
        kind: GatewayKind::Instant,
        description: "UAE Central Bank licensed instant payments with Apple Pay",
        min_amount: Fils::from_fils(100),
        max_amount: Fils::from_fils(5_000_000),
        features: &["apple_pay", "instant_payment", "refund_support", "arabic_support"],
    },
];

/// Filters the catalog by amount bounds and an optional BNPL/instant preference. The caller (or
/// the customer-facing UI) picks a gateway from the result; nothing here auto-selects.
pub fn suitable_gateways(amount: Fils, preference: Option<GatewayKind>) -> Vec<&'static GatewayInfo> {
    GATEWAY_CATALOG
        .iter()
        .filter(|info| amount >= info.min_amount && amount <= info.max_amount)
        .filter(|info| preference.map(|p| info.kind == p).unwrap_or(true))
        .collect()
}

#[cfg(test)]
mod test {
    use souk_common::Fils;

    use super::{suitable_gateways, CanonicalStatus, GatewayKind};

    #[test]
    fn unmapped_statuses_normalize_to_unknown() {
        assert_eq!("completed".parse(), Ok(CanonicalStatus::Completed));
        assert_eq!("on_hold".parse(), Ok(CanonicalStatus::Unknown));
        assert_eq!("".parse(), Ok(CanonicalStatus::Unknown));
    }

    #[test]
    fn catalog_filters_by_amount() {
        // 30 AED is below Tabby's and Tamara's minimums
        let names: Vec<&str> = suitable_gateways(Fils::from_aed(30), None).iter().map(|g| g.name).collect();
        assert_eq!(names, vec!["ZIINA"]);
        // 500 AED suits everyone
        let names: Vec<&str> = suitable_gateways(Fils::from_aed(500), None).iter().map(|g| g.name).collect();
        assert_eq!(names, vec!["TABBY", "TAMARA", "ZIINA"]);
        // 12 000 AED is above Tabby's maximum
        let names: Vec<&str> = suitable_gateways(Fils::from_aed(12_000), None).iter().map(|g| g.name).collect();
        assert_eq!(names, vec!["TAMARA", "ZIINA"]);
    }

    #[test]
    fn catalog_filters_by_preference() {
        let names: Vec<&str> =
            suitable_gateways(Fils::from_aed(500), Some(GatewayKind::Bnpl)).iter().map(|g| g.name).collect();
        assert_eq!(names, vec!["TABBY", "TAMARA"]);
        let names: Vec<&str> =
            suitable_gateways(Fils::from_aed(500), Some(GatewayKind::Instant)).iter().map(|g| g.name).collect();
        assert_eq!(names, vec!["ZIINA"]);
    }
}
