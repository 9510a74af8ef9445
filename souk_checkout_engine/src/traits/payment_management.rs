use serde_json::Value;

use crate::{
    db_types::{NewPayment, NewRefund, Payment, PaymentStatusType, Refund, WebhookStatusType},
    traits::CheckoutError,
};

/// The result of applying a webhook update. Redelivered webhooks produce `status_changed: false`
/// and `order_confirmed: false` but still succeed — providers are ACKed either way.
#[derive(Debug, Clone)]
pub struct WebhookOutcome {
    pub payment: Payment,
    pub status_changed: bool,
    pub order_confirmed: bool,
}

/// Payment records, webhook receipts and refunds.
///
/// `apply_payment_webhook` is the reconciliation point between the asynchronous provider world
/// and local state. It must be idempotent under redelivery and must never regress a terminal
/// payment status; when it confirms an order it commits reserved stock exactly once.
#[allow(async_fn_in_trait)]
pub trait PaymentManagement {
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, CheckoutError>;

    async fn fetch_payment(&self, payment_id: &str) -> Result<Option<Payment>, CheckoutError>;

    async fn fetch_payments_for_order(&self, order_id: i64) -> Result<Vec<Payment>, CheckoutError>;

    /// Updates a payment from a provider status-retrieval response, subject to the no-regression
    /// rule. Does not touch the order.
    async fn update_payment_standing(
        &self,
        payment_id: &str,
        status: Option<PaymentStatusType>,
        transaction_id: Option<String>,
        raw: &Value,
    ) -> Result<Payment, CheckoutError>;

    /// Applies a normalized webhook update in one transaction:
    /// * updates the payment's status and raw response (unless the update is stale or the
    ///   normalized status was unknown),
    /// * and iff the new status is `Completed` and the order is still `PENDING`: advances the
    ///   order to `CONFIRMED`, appends the history entry, and commits reserved stock for every
    ///   order item.
    ///
    /// The payment is addressed by the *provider's* payment id, since that is all a webhook
    /// carries.
    async fn apply_payment_webhook(
        &self,
        gateway: &str,
        gateway_payment_id: &str,
        status: Option<PaymentStatusType>,
        raw: &Value,
    ) -> Result<WebhookOutcome, CheckoutError>;

    /// Appends a webhook receipt to the audit log. Receipts are recorded for every delivery,
    /// before any validation, and are never deleted.
    async fn record_webhook(
        &self,
        gateway: &str,
        gateway_payment_id: Option<&str>,
        payload: &Value,
    ) -> Result<i64, CheckoutError>;

    async fn mark_webhook(
        &self,
        webhook_id: i64,
        status: WebhookStatusType,
        error: Option<&str>,
    ) -> Result<(), CheckoutError>;

    /// Records a gateway-accepted refund. A refund for the payment's full amount also moves the
    /// payment to `Refunded` and, when the order is not already terminal, the order to
    /// `REFUNDED` with a history entry — all in the same transaction.
    async fn apply_refund(&self, refund: NewRefund) -> Result<Refund, CheckoutError>;
}
