use std::collections::HashMap;

use serde_json::Value;
use souk_common::Fils;

use crate::{
    data_objects::{NewPaymentSession, OrderSnapshot, PaymentStanding, RefundReceipt, WebhookEvent},
    GatewayError,
    TabbyClient,
    TamaraClient,
    ZiinaClient,
};

/// The capability set every payment provider integration implements.
///
/// Implementations normalize their provider's native shapes into the canonical types in
/// [`crate::data_objects`]. Transport failures surface as [`GatewayError::Network`] and must be
/// treated by callers as "unknown outcome, verify later", never as a definitive failure.
#[allow(async_fn_in_trait)]
pub trait PaymentGatewayClient {
    /// The canonical (uppercase) gateway name, e.g. "TABBY".
    fn name(&self) -> &str;

    /// Creates a checkout session at the provider and returns the redirect target.
    async fn create_session(&self, order: &OrderSnapshot) -> Result<NewPaymentSession, GatewayError>;

    /// Retrieves the provider's current view of the payment.
    async fn verify(&self, gateway_payment_id: &str) -> Result<PaymentStanding, GatewayError>;

    /// Validates and normalizes an inbound webhook payload. This is the only place provider
    /// signature verification happens; a payload failing verification returns
    /// [`GatewayError::InvalidSignature`] and must never be applied to local state.
    fn handle_webhook(&self, payload: &Value) -> Result<WebhookEvent, GatewayError>;

    /// Requests a (partial or full) refund at the provider.
    async fn refund(&self, gateway_payment_id: &str, amount: Fils, reason: &str) -> Result<RefundReceipt, GatewayError>;
}

//--------------------------------------      Gateway       ----------------------------------------------------------
/// Tagged dispatch over the three concrete provider clients.
#[derive(Clone)]
pub enum Gateway {
    Tabby(TabbyClient),
    Tamara(TamaraClient),
    Ziina(ZiinaClient),
}

impl PaymentGatewayClient for Gateway {
    fn name(&self) -> &str {
        match self {
            Gateway::Tabby(c) => c.name(),
            Gateway::Tamara(c) => c.name(),
            Gateway::Ziina(c) => c.name(),
        }
    }

    async fn create_session(&self, order: &OrderSnapshot) -> Result<NewPaymentSession, GatewayError> {
        match self {
            Gateway::Tabby(c) => c.create_session(order).await,
            Gateway::Tamara(c) => c.create_session(order).await,
            Gateway::Ziina(c) => c.create_session(order).await,
        }
    }

    async fn verify(&self, gateway_payment_id: &str) -> Result<PaymentStanding, GatewayError> {
        match self {
            Gateway::Tabby(c) => c.verify(gateway_payment_id).await,
            Gateway::Tamara(c) => c.verify(gateway_payment_id).await,
            Gateway::Ziina(c) => c.verify(gateway_payment_id).await,
        }
    }

    fn handle_webhook(&self, payload: &Value) -> Result<WebhookEvent, GatewayError> {
        match self {
            Gateway::Tabby(c) => c.handle_webhook(payload),
            Gateway::Tamara(c) => c.handle_webhook(payload),
            Gateway::Ziina(c) => c.handle_webhook(payload),
        }
    }

    async fn refund(&self, gateway_payment_id: &str, amount: Fils, reason: &str) -> Result<RefundReceipt, GatewayError> {
        match self {
            Gateway::Tabby(c) => c.refund(gateway_payment_id, amount, reason).await,
            Gateway::Tamara(c) => c.refund(gateway_payment_id, amount, reason).await,
            Gateway::Ziina(c) => c.refund(gateway_payment_id, amount, reason).await,
        }
    }
}

//--------------------------------------   GatewayRegistry   ---------------------------------------------------------
/// Name → client lookup, built once at process start from explicit configuration.
///
/// Lookups for unregistered names fail with [`GatewayError::UnknownGateway`]; there is no
/// fallback gateway. The registry is generic so tests can register mock clients.
#[derive(Clone, Default)]
pub struct GatewayRegistry<G = Gateway> {
    clients: HashMap<String, G>,
}

impl<G: PaymentGatewayClient> GatewayRegistry<G> {
    pub fn new() -> Self {
        Self { clients: HashMap::new() }
    }

    pub fn register(&mut self, client: G) {
        self.clients.insert(client.name().to_ascii_uppercase(), client);
    }

    pub fn with(mut self, client: G) -> Self {
        self.register(client);
        self
    }

    pub fn get(&self, name: &str) -> Result<&G, GatewayError> {
        self.clients.get(&name.to_ascii_uppercase()).ok_or_else(|| GatewayError::UnknownGateway(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.clients.keys().map(String::as_str).collect()
    }
}
