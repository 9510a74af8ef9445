//! A scripted gateway for tests. Never talks to the network.
use std::{
    str::FromStr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use serde_json::{json, Value};
use souk_common::Fils;

use crate::{
    data_objects::{CanonicalStatus, NewPaymentSession, OrderSnapshot, PaymentStanding, RefundReceipt, WebhookEvent},
    helpers::session_expiry,
    GatewayError,
    PaymentGatewayClient,
};

/// A gateway whose responses are configured up front.
///
/// Webhook payloads use the canonical field names (`payment_id`, `status`, `amount`) with
/// canonical status strings. When a `webhook_secret` is set, payloads must carry a matching
/// plain-text `signature` field; this stands in for the real HMAC scheme without the ceremony.
#[derive(Clone, Debug)]
pub struct MockGateway {
    name: String,
    webhook_secret: Option<String>,
    verify_status: CanonicalStatus,
    session_error: Option<GatewayError>,
    counter: Arc<AtomicU64>,
}

impl MockGateway {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            webhook_secret: None,
            verify_status: CanonicalStatus::Pending,
            session_error: None,
            counter: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Require webhook payloads to carry `"signature": <secret>`.
    pub fn with_webhook_secret<S: Into<String>>(mut self, secret: S) -> Self {
        self.webhook_secret = Some(secret.into());
        self
    }

    /// Status returned by `verify` calls.
    pub fn with_verify_status(mut self, status: CanonicalStatus) -> Self {
        self.verify_status = status;
        self
    }

    /// Make `create_session` fail with the given error.
    pub fn with_session_error(mut self, error: GatewayError) -> Self {
        self.session_error = Some(error);
        self
    }

    pub fn sessions_created(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }
}

impl PaymentGatewayClient for MockGateway {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create_session(&self, order: &OrderSnapshot) -> Result<NewPaymentSession, GatewayError> {
        if let Some(e) = &self.session_error {
            return Err(e.clone());
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let gateway_payment_id = format!("mock_{}_{n}", order.order_id);
        Ok(NewPaymentSession {
            redirect_url: format!("https://pay.mock.test/{gateway_payment_id}"),
            expires_at: session_expiry(),
            raw: json!({"id": gateway_payment_id, "source": "mock"}),
            gateway_payment_id,
        })
    }

    async fn verify(&self, gateway_payment_id: &str) -> Result<PaymentStanding, GatewayError> {
        Ok(PaymentStanding {
            status: self.verify_status,
            amount: Fils::default(),
            transaction_id: Some(gateway_payment_id.to_string()),
            raw: json!({"id": gateway_payment_id, "status": self.verify_status.as_str()}),
        })
    }

    fn handle_webhook(&self, payload: &Value) -> Result<WebhookEvent, GatewayError> {
        if let Some(secret) = &self.webhook_secret {
            let provided = payload.get("signature").and_then(Value::as_str);
            if provided != Some(secret.as_str()) {
                return Err(GatewayError::InvalidSignature(self.name.clone()));
            }
        }
        let gateway_payment_id = payload
            .get("payment_id")
            .and_then(Value::as_str)
            .ok_or_else(|| GatewayError::ResponseFormat {
                gateway: self.name.clone(),
                detail: "missing field: payment_id".to_string(),
            })?
            .to_string();
        let status = CanonicalStatus::from_str(payload["status"].as_str().unwrap_or_default())
            .unwrap_or(CanonicalStatus::Unknown);
        let amount = payload["amount"].as_i64().map(Fils::from).unwrap_or_default();
        Ok(WebhookEvent { gateway_payment_id, status, amount, raw: payload.clone() })
    }

    async fn refund(&self, gateway_payment_id: &str, amount: Fils, reason: &str) -> Result<RefundReceipt, GatewayError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(RefundReceipt {
            gateway_refund_id: format!("mock_refund_{n}"),
            amount,
            raw: json!({"payment_id": gateway_payment_id, "reason": reason}),
        })
    }
}
