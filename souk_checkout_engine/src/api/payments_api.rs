use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use payment_gateways::{
    data_objects::{
        suitable_gateways,
        CanonicalStatus,
        GatewayInfo,
        GatewayKind,
        OrderSnapshot,
        SnapshotAddress,
        SnapshotItem,
    },
    Gateway,
    GatewayError,
    GatewayRegistry,
    PaymentGatewayClient,
};
use serde_json::Value;
use souk_common::Fils;

use crate::{
    db_types::{FullOrder, NewPayment, NewRefund, OrderNumber, OrderStatusType, Payment, PaymentStatusType, Refund, WebhookStatusType},
    helpers::{new_payment_id, new_refund_id},
    traits::{CheckoutError, OrderManagement, PaymentManagement},
};

/// A freshly created checkout session: the persisted payment row plus where to send the customer.
#[derive(Debug, Clone)]
pub struct PaymentSession {
    pub payment: Payment,
    pub redirect_url: String,
    pub expires_at: DateTime<Utc>,
}

/// What `handle_webhook` tells the transport layer. Webhooks for unknown payments are logged and
/// acknowledged (`known_payment: false`) so providers stop redelivering them.
#[derive(Debug, Clone)]
pub struct WebhookAck {
    pub webhook_id: i64,
    pub gateway_payment_id: Option<String>,
    pub status: CanonicalStatus,
    pub known_payment: bool,
    pub order_confirmed: bool,
}

/// `PaymentsApi` orchestrates payments across the registered gateways: session creation,
/// provider polling, webhook reconciliation and refunds.
///
/// It is constructed once per process with an explicit [`GatewayRegistry`] — credentials and
/// base URLs come in through configuration, never ambient lookups — so tests can substitute
/// scripted gateways.
pub struct PaymentsApi<B, G = Gateway> {
    db: B,
    registry: GatewayRegistry<G>,
}

impl<B, G> Debug for PaymentsApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentsApi")
    }
}

impl<B, G> PaymentsApi<B, G> {
    pub fn new(db: B, registry: GatewayRegistry<G>) -> Self {
        Self { db, registry }
    }
}

impl<B, G> PaymentsApi<B, G>
where
    B: OrderManagement + PaymentManagement,
    G: PaymentGatewayClient,
{
    /// Gateways whose amount bounds admit `amount`, optionally narrowed to BNPL or instant
    /// providers. The caller picks one; nothing here auto-selects.
    pub fn suitable_gateways(&self, amount: Fils, preference: Option<GatewayKind>) -> Vec<&'static GatewayInfo> {
        suitable_gateways(amount, preference)
    }

    /// Creates a checkout session for a pending order and records a `PENDING` payment row
    /// referencing the provider's session id. A gateway failure is returned untouched and
    /// leaves no payment row behind.
    pub async fn create_session(
        &self,
        order_number: &OrderNumber,
        gateway_name: &str,
    ) -> Result<PaymentSession, CheckoutError> {
        let full = self
            .db
            .fetch_order(order_number)
            .await?
            .ok_or_else(|| CheckoutError::OrderNotFound(order_number.clone()))?;
        if full.order.status != OrderStatusType::Pending {
            return Err(CheckoutError::Validation(format!(
                "Payment sessions can only be created for pending orders (order is {})",
                full.order.status
            )));
        }
        let client = self.registry.get(gateway_name)?;
        let snapshot = order_snapshot(&full);
        let session = client.create_session(&snapshot).await?;
        let mut response = session.raw.clone();
        if let Some(map) = response.as_object_mut() {
            map.insert("payment_url".to_string(), session.redirect_url.clone().into());
            map.insert("expires_at".to_string(), session.expires_at.to_rfc3339().into());
        }
        let payment = self
            .db
            .insert_payment(NewPayment {
                payment_id: new_payment_id(),
                gateway_payment_id: session.gateway_payment_id.clone(),
                order_id: full.order.id,
                gateway: client.name().to_string(),
                amount: full.order.total_amount,
                currency: full.order.currency.clone(),
                gateway_response: response.to_string(),
            })
            .await?;
        info!(
            "🔄️💳️ Payment {} created for order {order_number} via {} (session {})",
            payment.payment_id,
            client.name(),
            session.gateway_payment_id
        );
        Ok(PaymentSession { payment, redirect_url: session.redirect_url, expires_at: session.expires_at })
    }

    /// Re-queries the provider for the payment's status and updates the local record, subject to
    /// the no-regression rule. Verification never confirms orders — that happens only on the
    /// webhook path.
    pub async fn verify_payment(&self, payment_id: &str) -> Result<Payment, CheckoutError> {
        let payment = self
            .db
            .fetch_payment(payment_id)
            .await?
            .ok_or_else(|| CheckoutError::PaymentNotFound(payment_id.to_string()))?;
        let client = self.registry.get(&payment.gateway)?;
        let standing = client.verify(&payment.gateway_payment_id).await?;
        let status = PaymentStatusType::from_canonical(standing.status);
        trace!("🔄️💳️ Payment {payment_id} verified at {} as {}", payment.gateway, standing.status);
        self.db.update_payment_standing(payment_id, status, standing.transaction_id.clone(), &standing.raw).await
    }

    /// Processes an inbound webhook delivery.
    ///
    /// The payload is logged to the receipt table before anything else. The owning gateway
    /// client then authenticates and normalizes it — a payload failing signature verification is
    /// marked `FAILED` and rejected without touching payment or order state. Valid events are
    /// applied atomically and idempotently: redeliveries and out-of-order statuses are absorbed,
    /// and stock is committed at most once per order.
    pub async fn handle_webhook(&self, gateway_name: &str, payload: Value) -> Result<WebhookAck, CheckoutError> {
        let client = self.registry.get(gateway_name)?;
        let webhook_id = self.db.record_webhook(client.name(), None, &payload).await?;
        let event = match client.handle_webhook(&payload) {
            Ok(event) => event,
            Err(e @ GatewayError::InvalidSignature(_)) => {
                warn!("🔄️💳️ {gateway_name} webhook {webhook_id} failed signature verification");
                self.db.mark_webhook(webhook_id, WebhookStatusType::Failed, Some("invalid signature")).await?;
                return Err(e.into());
            },
            Err(e) => {
                warn!("🔄️💳️ {gateway_name} webhook {webhook_id} could not be normalized. {e}");
                self.db.mark_webhook(webhook_id, WebhookStatusType::Failed, Some(&e.to_string())).await?;
                return Err(e.into());
            },
        };
        let status = PaymentStatusType::from_canonical(event.status);
        match self.db.apply_payment_webhook(client.name(), &event.gateway_payment_id, status, &event.raw).await {
            Ok(outcome) => {
                self.db.mark_webhook(webhook_id, WebhookStatusType::Processed, None).await?;
                debug!(
                    "🔄️💳️ Webhook {webhook_id} processed: payment {} is {}, order_confirmed={}",
                    outcome.payment.payment_id, outcome.payment.status, outcome.order_confirmed
                );
                Ok(WebhookAck {
                    webhook_id,
                    gateway_payment_id: Some(event.gateway_payment_id),
                    status: event.status,
                    known_payment: true,
                    order_confirmed: outcome.order_confirmed,
                })
            },
            Err(CheckoutError::PaymentNotFound(id)) => {
                warn!("🔄️💳️ {gateway_name} webhook {webhook_id} references unknown payment {id}. Logged and acknowledged.");
                self.db.mark_webhook(webhook_id, WebhookStatusType::Failed, Some("payment not found")).await?;
                Ok(WebhookAck {
                    webhook_id,
                    gateway_payment_id: Some(id),
                    status: event.status,
                    known_payment: false,
                    order_confirmed: false,
                })
            },
            Err(e) => {
                error!("🔄️💳️ Webhook {webhook_id} processing failed. {e}");
                self.db.mark_webhook(webhook_id, WebhookStatusType::Failed, Some(&e.to_string())).await?;
                Err(e)
            },
        }
    }

    /// Refunds part or all of a completed payment through its gateway and records the refund. A
    /// full-amount refund also moves the payment to `REFUNDED` and the order with it.
    pub async fn refund_payment(
        &self,
        payment_id: &str,
        amount: Fils,
        reason: Option<String>,
    ) -> Result<Refund, CheckoutError> {
        let payment = self
            .db
            .fetch_payment(payment_id)
            .await?
            .ok_or_else(|| CheckoutError::PaymentNotFound(payment_id.to_string()))?;
        if payment.status != PaymentStatusType::Completed {
            return Err(CheckoutError::Validation(format!(
                "Only completed payments can be refunded (payment is {})",
                payment.status
            )));
        }
        if !amount.is_positive() || amount > payment.amount {
            return Err(CheckoutError::Validation(format!(
                "Refund amount must be positive and no more than {}",
                payment.amount
            )));
        }
        let client = self.registry.get(&payment.gateway)?;
        let reason = reason.unwrap_or_else(|| "Customer requested refund".to_string());
        let receipt = client.refund(&payment.gateway_payment_id, amount, &reason).await?;
        let refund = self
            .db
            .apply_refund(NewRefund {
                refund_id: new_refund_id(),
                payment_id: payment.payment_id.clone(),
                amount: receipt.amount,
                reason,
                gateway_refund_id: Some(receipt.gateway_refund_id),
            })
            .await?;
        info!("🔄️💳️ Refund {} of {} recorded for payment {payment_id}", refund.refund_id, refund.amount);
        Ok(refund)
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn registry(&self) -> &GatewayRegistry<G> {
        &self.registry
    }
}

/// The canonical order view handed to gateways: snapshotted amounts, line items and the
/// shipping address.
fn order_snapshot(full: &FullOrder) -> OrderSnapshot {
    let items = full
        .items
        .iter()
        .map(|item| SnapshotItem {
            name: item.product_name.clone(),
            sku: item.sku.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
        })
        .collect();
    let shipping_address = full.shipping_address.as_ref().map(|a| SnapshotAddress {
        full_name: a.full_name.clone(),
        phone_number: a.phone_number.clone(),
        address_line1: a.address_line1.clone(),
        city: a.city.clone(),
        emirate: a.emirate.clone(),
        country: a.country.clone(),
    });
    OrderSnapshot {
        order_id: full.order.order_number.to_string(),
        amount: full.order.total_amount,
        currency: full.order.currency.clone(),
        customer_name: full.order.customer_name.clone(),
        customer_email: full.order.customer_email.clone(),
        customer_phone: full.order.customer_phone.clone(),
        tax_amount: full.order.tax_amount,
        shipping_amount: full.order.delivery_fee,
        discount_amount: full.order.discount_amount,
        items,
        shipping_address,
    }
}
