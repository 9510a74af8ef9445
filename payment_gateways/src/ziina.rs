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
    config::ZiinaConfig,
    data_objects::{CanonicalStatus, NewPaymentSession, OrderSnapshot, PaymentStanding, RefundReceipt, WebhookEvent},
    helpers::{amount_from_wire, required_str, send_json, session_expiry, verify_payload_signature},
    GatewayError,
    PaymentGatewayClient,
};

const GATEWAY: &str = "ZIINA";
const TIMEOUT_SECS: u64 = 30;

/// Ziina: UAE Central Bank licensed instant payments.
#[derive(Clone)]
pub struct ZiinaClient {
    config: ZiinaConfig,
    client: Client,
}

impl ZiinaClient {
    pub fn new(config: ZiinaConfig) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::with_capacity(3);
        let bearer = format!("Bearer {}", config.api_key.reveal());
        let val = HeaderValue::from_str(&bearer)
            .map_err(|e| GatewayError::Initialization { gateway: GATEWAY.to_string(), detail: e.to_string() })?;
        headers.insert("Authorization", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let merchant = HeaderValue::from_str(&config.merchant_id)
            .map_err(|e| GatewayError::Initialization { gateway: GATEWAY.to_string(), detail: e.to_string() })?;
        headers.insert("X-Merchant-ID", merchant);
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
}

/// Ziina's payment-intent status vocabulary, normalized. Ziina spells cancellation with a single
/// "l" on the wire.
fn canonical_status(provider_status: &str) -> CanonicalStatus {
    match provider_status {
        "requires_payment_instrument" | "requires_user_action" | "pending" => CanonicalStatus::Pending,
        "completed" => CanonicalStatus::Completed,
        "failed" => CanonicalStatus::Failed,
        "canceled" => CanonicalStatus::Cancelled,
        _ => CanonicalStatus::Unknown,
    }
}

impl PaymentGatewayClient for ZiinaClient {
    fn name(&self) -> &str {
        GATEWAY
    }

    async fn create_session(&self, order: &OrderSnapshot) -> Result<NewPaymentSession, GatewayError> {
        let expires_at = session_expiry();
        let body = json!({
            // Ziina takes amounts as bare integers in minor units
            "amount": order.amount.value(),
            "currency_code": order.currency,
            "message": format!("Order #{}", order.order_id),
            "success_url": self.config.urls.success_url(),
            "cancel_url": self.config.urls.cancel_url(),
            "failure_url": self.config.urls.failure_url(),
            "test": self.config.test_mode,
            "expiry": expires_at.timestamp_millis().to_string(),
            "allow_tips": false,
        });
        trace!("🔵️ Creating Ziina payment intent for order {}", order.order_id);
        let req = self.client.post(self.url("/api/payment_intent")).json(&body);
        let raw = send_json(GATEWAY, req).await?;
        let gateway_payment_id = required_str(GATEWAY, &raw, "id")?.to_string();
        let redirect_url = required_str(GATEWAY, &raw, "redirect_url")?.to_string();
        debug!("🔵️ Ziina payment intent {gateway_payment_id} created for order {}", order.order_id);
        Ok(NewPaymentSession { gateway_payment_id, redirect_url, expires_at, raw })
    }

    async fn verify(&self, gateway_payment_id: &str) -> Result<PaymentStanding, GatewayError> {
        let req = self.client.get(self.url(&format!("/api/payment_intent/{gateway_payment_id}")));
        let raw = send_json(GATEWAY, req).await?;
        let status = canonical_status(raw["status"].as_str().unwrap_or_default());
        let amount = amount_from_wire(GATEWAY, &raw["amount"])?;
        let transaction_id = raw["transaction_id"].as_str().map(str::to_string);
        debug!("🔵️ Ziina payment intent {gateway_payment_id} verified as {status}");
        Ok(PaymentStanding { status, amount, transaction_id, raw })
    }

    fn handle_webhook(&self, payload: &Value) -> Result<WebhookEvent, GatewayError> {
        // Signature verification is mandatory for Ziina; a payload without a valid signature is
        // never applied to local state.
        verify_payload_signature(GATEWAY, payload, &self.config.webhook_secret)?;
        let gateway_payment_id = required_str(GATEWAY, payload, "payment_id")?.to_string();
        let status = canonical_status(payload["status"].as_str().unwrap_or_default());
        let amount = amount_from_wire(GATEWAY, &payload["amount"]).unwrap_or_default();
        info!("🔵️ Ziina webhook for {gateway_payment_id}: {status}");
        Ok(WebhookEvent { gateway_payment_id, status, amount, raw: payload.clone() })
    }

    async fn refund(&self, gateway_payment_id: &str, amount: Fils, reason: &str) -> Result<RefundReceipt, GatewayError> {
        let body = json!({
            "payment_id": gateway_payment_id,
            "amount": amount.value(),
            "currency": souk_common::AED_CURRENCY_CODE,
            "reason": reason,
            "refund_id": format!("REF_{gateway_payment_id}_{}", Utc::now().timestamp()),
        });
        let req = self.client.post(self.url("/refund")).json(&body);
        let raw = send_json(GATEWAY, req).await?;
        let gateway_refund_id = required_str(GATEWAY, &raw, "refund_id")?.to_string();
        info!("🔵️ Ziina refund {gateway_refund_id} of {amount} created for {gateway_payment_id}");
        Ok(RefundReceipt { gateway_refund_id, amount, raw })
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;
    use souk_common::{Fils, Secret};

    use super::{canonical_status, ZiinaClient};
    use crate::{
        config::{MerchantUrls, ZiinaConfig},
        data_objects::CanonicalStatus,
        helpers::sign_payload,
        GatewayError,
        PaymentGatewayClient,
    };

    fn test_client(secret: &str) -> ZiinaClient {
        let urls = MerchantUrls {
            frontend_url: "https://shop.test".to_string(),
            backend_url: "https://api.shop.test".to_string(),
        };
        let config = ZiinaConfig {
            base_url: "https://api-v2.ziina.test".to_string(),
            api_key: Secret::new("zk_test".to_string()),
            merchant_id: "m_test".to_string(),
            webhook_secret: Secret::new(secret.to_string()),
            test_mode: true,
            urls,
        };
        ZiinaClient::new(config).expect("client should build")
    }

    #[test]
    fn ziina_statuses_normalize() {
        assert_eq!(canonical_status("requires_payment_instrument"), CanonicalStatus::Pending);
        assert_eq!(canonical_status("requires_user_action"), CanonicalStatus::Pending);
        assert_eq!(canonical_status("pending"), CanonicalStatus::Pending);
        assert_eq!(canonical_status("completed"), CanonicalStatus::Completed);
        assert_eq!(canonical_status("failed"), CanonicalStatus::Failed);
        assert_eq!(canonical_status("canceled"), CanonicalStatus::Cancelled);
        assert_eq!(canonical_status("on_hold"), CanonicalStatus::Unknown);
    }

    #[test]
    fn signed_webhook_is_normalized() {
        let client = test_client("whsec_ziina");
        let mut payload = json!({"payment_id": "pi_42", "status": "completed", "amount": 12000});
        payload["signature"] = sign_payload(&payload, &Secret::new("whsec_ziina".to_string())).into();
        let event = client.handle_webhook(&payload).expect("webhook should be accepted");
        assert_eq!(event.gateway_payment_id, "pi_42");
        assert_eq!(event.status, CanonicalStatus::Completed);
        assert_eq!(event.amount, Fils::from_aed(120));
    }

    #[test]
    fn unsigned_webhook_is_rejected() {
        let client = test_client("whsec_ziina");
        let payload = json!({"payment_id": "pi_42", "status": "completed", "amount": 12000});
        let err = client.handle_webhook(&payload).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidSignature(_)));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let client = test_client("whsec_ziina");
        let mut payload = json!({"payment_id": "pi_42", "status": "completed", "amount": 12000});
        payload["signature"] = sign_payload(&payload, &Secret::new("some_other_secret".to_string())).into();
        assert!(matches!(client.handle_webhook(&payload), Err(GatewayError::InvalidSignature(_))));
    }
}
