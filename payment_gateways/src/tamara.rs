use std::time::Duration;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use serde_json::{json, Value};
use souk_common::Fils;

use crate::{
    config::TamaraConfig,
    data_objects::{CanonicalStatus, NewPaymentSession, OrderSnapshot, PaymentStanding, RefundReceipt, WebhookEvent},
    helpers::{amount_from_wire, amount_to_wire, required_str, send_json, session_expiry, verify_payload_signature},
    GatewayError,
    PaymentGatewayClient,
};

const GATEWAY: &str = "TAMARA";
const TIMEOUT_SECS: u64 = 30;

/// Tamara: Buy-Now-Pay-Later with flexible installments.
#[derive(Clone)]
pub struct TamaraClient {
    config: TamaraConfig,
    client: Client,
}

impl TamaraClient {
    pub fn new(config: TamaraConfig) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::with_capacity(2);
        let bearer = format!("Bearer {}", config.api_key.reveal());
        let val = HeaderValue::from_str(&bearer)
            .map_err(|e| GatewayError::Initialization { gateway: GATEWAY.to_string(), detail: e.to_string() })?;
        headers.insert("Authorization", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .map_err(|e| GatewayError::Initialization { gateway: GATEWAY.to_string(), detail: e.to_string() })?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    fn money(&self, amount: Fils, currency: &str) -> Value {
        json!({ "amount": amount_to_wire(amount), "currency": currency })
    }

    fn checkout_request(&self, order: &OrderSnapshot) -> Value {
        let (first_name, last_name) = order.name_parts();
        let items = order
            .items
            .iter()
            .map(|item| {
                json!({
                    "name": item.name,
                    "sku": item.sku,
                    "quantity": item.quantity,
                    "unit_price": self.money(item.unit_price, &order.currency),
                    "category": "retail",
                })
            })
            .collect::<Vec<_>>();
        let address = order.shipping_address.as_ref().map(|a| {
            json!({
                "first_name": first_name,
                "last_name": last_name,
                "line1": a.address_line1,
                "city": a.city,
                "country_code": "AE",
            })
        });
        json!({
            "order_reference_id": order.order_id,
            "total_amount": self.money(order.amount, &order.currency),
            "description": format!("Order #{}", order.order_id),
            "country_code": "AE",
            "payment_type": "PAY_BY_INSTALMENTS",
            "instalments": 4,
            "items": items,
            "consumer": {
                "first_name": first_name,
                "last_name": last_name,
                "phone_number": order.customer_phone,
                "email": order.customer_email,
            },
            "shipping_address": address,
            "merchant_url": {
                "success_url": self.config.urls.success_url(),
                "failure_url": self.config.urls.failure_url(),
                "cancel_url": self.config.urls.cancel_url(),
                "notification_url": self.config.urls.notification_url(GATEWAY),
            },
            "tax_amount": self.money(order.tax_amount, &order.currency),
            "shipping_amount": self.money(order.shipping_amount, &order.currency),
            "discount": {
                "name": "Discount",
                "amount": self.money(order.discount_amount, &order.currency),
            },
        })
    }
}

/// Tamara's order status vocabulary, normalized.
fn canonical_status(provider_status: &str) -> CanonicalStatus {
    match provider_status {
        "PENDING" => CanonicalStatus::Pending,
        "APPROVED" => CanonicalStatus::Authorized,
        "COMPLETED" => CanonicalStatus::Completed,
        "EXPIRED" => CanonicalStatus::Expired,
        "DECLINED" => CanonicalStatus::Failed,
        "CANCELLED" => CanonicalStatus::Cancelled,
        _ => CanonicalStatus::Unknown,
    }
}

impl PaymentGatewayClient for TamaraClient {
    fn name(&self) -> &str {
        GATEWAY
    }

    async fn create_session(&self, order: &OrderSnapshot) -> Result<NewPaymentSession, GatewayError> {
        let body = self.checkout_request(order);
        trace!("🟠️ Creating Tamara checkout for order {}", order.order_id);
        let req = self.client.post(self.url("/checkout")).json(&body);
        let raw = send_json(GATEWAY, req).await?;
        let gateway_payment_id = required_str(GATEWAY, &raw, "order_id")?.to_string();
        let redirect_url = required_str(GATEWAY, &raw, "checkout_url")?.to_string();
        debug!("🟠️ Tamara checkout {gateway_payment_id} created for order {}", order.order_id);
        Ok(NewPaymentSession { gateway_payment_id, redirect_url, expires_at: session_expiry(), raw })
    }

    async fn verify(&self, gateway_payment_id: &str) -> Result<PaymentStanding, GatewayError> {
        let req = self.client.get(self.url(&format!("/orders/{gateway_payment_id}")));
        let raw = send_json(GATEWAY, req).await?;
        let status = canonical_status(raw["status"].as_str().unwrap_or_default());
        let amount = amount_from_wire(GATEWAY, &raw["total_amount"]["amount"])?;
        let transaction_id = raw["order_id"].as_str().map(str::to_string);
        debug!("🟠️ Tamara order {gateway_payment_id} verified as {status}");
        Ok(PaymentStanding { status, amount, transaction_id, raw })
    }

    fn handle_webhook(&self, payload: &Value) -> Result<WebhookEvent, GatewayError> {
        match &self.config.webhook_secret {
            Some(secret) => verify_payload_signature(GATEWAY, payload, secret)?,
            None => warn!("🟠️ No Tamara webhook secret configured; accepting webhook without signature check"),
        }
        let gateway_payment_id = required_str(GATEWAY, payload, "order_id")?.to_string();
        let status = canonical_status(payload["status"].as_str().unwrap_or_default());
        let amount = amount_from_wire(GATEWAY, &payload["total_amount"]["amount"]).unwrap_or_default();
        info!("🟠️ Tamara webhook for {gateway_payment_id}: {status}");
        Ok(WebhookEvent { gateway_payment_id, status, amount, raw: payload.clone() })
    }

    async fn refund(&self, gateway_payment_id: &str, amount: Fils, reason: &str) -> Result<RefundReceipt, GatewayError> {
        let body = json!({
            "total_amount": self.money(amount, souk_common::AED_CURRENCY_CODE),
            "comment": reason,
        });
        let req = self.client.post(self.url(&format!("/orders/{gateway_payment_id}/refunds"))).json(&body);
        let raw = send_json(GATEWAY, req).await?;
        let gateway_refund_id = required_str(GATEWAY, &raw, "refund_id")?.to_string();
        info!("🟠️ Tamara refund {gateway_refund_id} of {amount} created for {gateway_payment_id}");
        Ok(RefundReceipt { gateway_refund_id, amount, raw })
    }
}

#[cfg(test)]
mod test {
    use super::canonical_status;
    use crate::data_objects::CanonicalStatus;

    #[test]
    fn tamara_statuses_normalize() {
        assert_eq!(canonical_status("PENDING"), CanonicalStatus::Pending);
        assert_eq!(canonical_status("APPROVED"), CanonicalStatus::Authorized);
        assert_eq!(canonical_status("COMPLETED"), CanonicalStatus::Completed);
        assert_eq!(canonical_status("EXPIRED"), CanonicalStatus::Expired);
        assert_eq!(canonical_status("DECLINED"), CanonicalStatus::Failed);
        assert_eq!(canonical_status("CANCELLED"), CanonicalStatus::Cancelled);
        assert_eq!(canonical_status("FULLY_CAPTURED"), CanonicalStatus::Unknown);
    }
}
