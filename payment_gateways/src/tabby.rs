use std::time::Duration;

use chrono::Utc;
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use serde_json::{json, Value};
use souk_common::Fils;

use crate::{
    config::TabbyConfig,
    data_objects::{CanonicalStatus, NewPaymentSession, OrderSnapshot, PaymentStanding, RefundReceipt, WebhookEvent},
    helpers::{amount_from_wire, amount_to_wire, required_str, send_json, session_expiry, verify_payload_signature},
    GatewayError,
    PaymentGatewayClient,
};

const GATEWAY: &str = "TABBY";
const TIMEOUT_SECS: u64 = 30;

/// Tabby: Buy-Now-Pay-Later in four fixed installments.
#[derive(Clone)]
pub struct TabbyClient {
    config: TabbyConfig,
    client: Client,
}

impl TabbyClient {
    pub fn new(config: TabbyConfig) -> Result<Self, GatewayError> {
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

    fn session_request(&self, order: &OrderSnapshot) -> Value {
        let items = order
            .items
            .iter()
            .map(|item| {
                json!({
                    "title": item.name,
                    "quantity": item.quantity,
                    "unit_price": amount_to_wire(item.unit_price),
                    "reference_id": item.sku,
                    "category": "retail",
                })
            })
            .collect::<Vec<_>>();
        json!({
            "payment": {
                "amount": amount_to_wire(order.amount),
                "currency": order.currency,
                "description": format!("Order #{}", order.order_id),
                "buyer": {
                    "phone": order.customer_phone,
                    "email": order.customer_email,
                    "name": order.customer_name,
                },
                "order": {
                    "tax_amount": amount_to_wire(order.tax_amount),
                    "shipping_amount": amount_to_wire(order.shipping_amount),
                    "discount_amount": amount_to_wire(order.discount_amount),
                    "updated_at": Utc::now().to_rfc3339(),
                    "reference_id": order.order_id,
                    "items": items,
                },
                "meta": {
                    "order_id": order.order_id,
                    "source": "api",
                },
            },
            "lang": "en",
            "merchant_code": self.config.merchant_code,
            "merchant_urls": {
                "success": self.config.urls.success_url(),
                "cancel": self.config.urls.cancel_url(),
                "failure": self.config.urls.failure_url(),
            },
        })
    }
}

/// Tabby's payment status vocabulary, normalized.
fn canonical_status(provider_status: &str) -> CanonicalStatus {
    match provider_status {
        "CREATED" => CanonicalStatus::Pending,
        "AUTHORIZED" => CanonicalStatus::Authorized,
        "CLOSED" => CanonicalStatus::Completed,
        "EXPIRED" => CanonicalStatus::Expired,
        "REJECTED" => CanonicalStatus::Failed,
        "CANCELLED" => CanonicalStatus::Cancelled,
        _ => CanonicalStatus::Unknown,
    }
}

impl PaymentGatewayClient for TabbyClient {
    fn name(&self) -> &str {
        GATEWAY
    }

    async fn create_session(&self, order: &OrderSnapshot) -> Result<NewPaymentSession, GatewayError> {
        let body = self.session_request(order);
        trace!("🟣️ Creating Tabby session for order {}", order.order_id);
        let req = self.client.post(self.url("/api/v2/payments")).json(&body);
        let raw = send_json(GATEWAY, req).await?;
        let gateway_payment_id = required_str(GATEWAY, &raw, "id")?.to_string();
        let redirect_url = raw["configuration"]["available_products"][0]["web_url"]
            .as_str()
            .ok_or_else(|| GatewayError::ResponseFormat {
                gateway: GATEWAY.to_string(),
                detail: "no web_url in session response".to_string(),
            })?
            .to_string();
        debug!("🟣️ Tabby session {gateway_payment_id} created for order {}", order.order_id);
        Ok(NewPaymentSession { gateway_payment_id, redirect_url, expires_at: session_expiry(), raw })
    }

    async fn verify(&self, gateway_payment_id: &str) -> Result<PaymentStanding, GatewayError> {
        let req = self.client.get(self.url(&format!("/api/v2/payments/{gateway_payment_id}")));
        let raw = send_json(GATEWAY, req).await?;
        let payment = &raw["payment"];
        let status = canonical_status(payment["status"].as_str().unwrap_or_default());
        let amount = amount_from_wire(GATEWAY, &payment["amount"])?;
        let transaction_id = payment["id"].as_str().map(str::to_string);
        debug!("🟣️ Tabby payment {gateway_payment_id} verified as {status}");
        Ok(PaymentStanding { status, amount, transaction_id, raw })
    }

    fn handle_webhook(&self, payload: &Value) -> Result<WebhookEvent, GatewayError> {
        match &self.config.webhook_secret {
            Some(secret) => verify_payload_signature(GATEWAY, payload, secret)?,
            None => warn!("🟣️ No Tabby webhook secret configured; accepting webhook without signature check"),
        }
        let gateway_payment_id = required_str(GATEWAY, payload, "id")?.to_string();
        let status = canonical_status(payload["status"].as_str().unwrap_or_default());
        let amount = amount_from_wire(GATEWAY, &payload["amount"]).unwrap_or_default();
        info!("🟣️ Tabby webhook for {gateway_payment_id}: {status}");
        Ok(WebhookEvent { gateway_payment_id, status, amount, raw: payload.clone() })
    }

    async fn refund(&self, gateway_payment_id: &str, amount: Fils, reason: &str) -> Result<RefundReceipt, GatewayError> {
        let body = json!({
            "amount": amount_to_wire(amount),
            "reason": reason,
        });
        let req = self.client.post(self.url(&format!("/api/v2/payments/{gateway_payment_id}/refunds"))).json(&body);
        let raw = send_json(GATEWAY, req).await?;
        let gateway_refund_id = required_str(GATEWAY, &raw, "id")?.to_string();
        info!("🟣️ Tabby refund {gateway_refund_id} of {amount} created for {gateway_payment_id}");
        Ok(RefundReceipt { gateway_refund_id, amount, raw })
    }
}

#[cfg(test)]
mod test {
    use super::canonical_status;
    use crate::data_objects::CanonicalStatus;

    #[test]
    fn tabby_statuses_normalize() {
        assert_eq!(canonical_status("CREATED"), CanonicalStatus::Pending);
        assert_eq!(canonical_status("AUTHORIZED"), CanonicalStatus::Authorized);
        assert_eq!(canonical_status("CLOSED"), CanonicalStatus::Completed);
        assert_eq!(canonical_status("EXPIRED"), CanonicalStatus::Expired);
        assert_eq!(canonical_status("REJECTED"), CanonicalStatus::Failed);
        assert_eq!(canonical_status("CANCELLED"), CanonicalStatus::Cancelled);
        assert_eq!(canonical_status("SOMETHING_NEW"), CanonicalStatus::Unknown);
    }
}
