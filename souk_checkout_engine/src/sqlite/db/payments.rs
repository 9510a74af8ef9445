use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::db_types::{NewPayment, NewRefund, Payment, PaymentStatusType, Refund, WebhookStatusType};

pub async fn insert_payment(payment: &NewPayment, conn: &mut SqliteConnection) -> Result<Payment, sqlx::Error> {
    let row = sqlx::query_as(
        r#"
        INSERT INTO payments (
            payment_id, gateway_payment_id, order_id, gateway, amount, currency, gateway_response
        ) VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(&payment.payment_id)
    .bind(&payment.gateway_payment_id)
    .bind(payment.order_id)
    .bind(&payment.gateway)
    .bind(payment.amount)
    .bind(&payment.currency)
    .bind(&payment.gateway_response)
    .fetch_one(conn)
    .await?;
    debug!("💳️ Payment [{}] recorded against {} session {}", payment.payment_id, payment.gateway, payment.gateway_payment_id);
    Ok(row)
}

pub async fn fetch_payment_by_payment_id(
    payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment =
        sqlx::query_as("SELECT * FROM payments WHERE payment_id = $1").bind(payment_id).fetch_optional(conn).await?;
    Ok(payment)
}

pub async fn fetch_payment_by_gateway_id(
    gateway_payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE gateway_payment_id = $1")
        .bind(gateway_payment_id)
        .fetch_optional(conn)
        .await?;
    Ok(payment)
}

pub async fn fetch_payments_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Payment>, sqlx::Error> {
    let payments = sqlx::query_as("SELECT * FROM payments WHERE order_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(payments)
}

/// The no-regression rule for asynchronous status updates.
///
/// Webhooks are at-least-once and may arrive out of order, so a stale notification must never
/// move a payment backwards: terminal statuses are frozen, and a late `Pending` cannot undo an
/// `Authorized`.
pub(crate) fn should_apply(current: PaymentStatusType, new: PaymentStatusType) -> bool {
    if current == new {
        return false;
    }
    if current.is_terminal() {
        return false;
    }
    !(current == PaymentStatusType::Authorized && new == PaymentStatusType::Pending)
}

/// Writes a new payment status and raw provider response, stamping the per-status timestamp
/// column write-once.
pub async fn update_standing(
    id: i64,
    status: PaymentStatusType,
    transaction_id: Option<&str>,
    raw_response: &str,
    conn: &mut SqliteConnection,
) -> Result<Payment, sqlx::Error> {
    let payment: Payment = sqlx::query_as(
        r#"
        UPDATE payments SET
            status = $1,
            gateway_transaction_id = COALESCE($2, gateway_transaction_id),
            gateway_response = $3,
            updated_at = CURRENT_TIMESTAMP,
            authorized_at = CASE WHEN $1 = 'AUTHORIZED' THEN COALESCE(authorized_at, CURRENT_TIMESTAMP) ELSE authorized_at END,
            completed_at = CASE WHEN $1 = 'COMPLETED' THEN COALESCE(completed_at, CURRENT_TIMESTAMP) ELSE completed_at END,
            failed_at = CASE WHEN $1 = 'FAILED' THEN COALESCE(failed_at, CURRENT_TIMESTAMP) ELSE failed_at END,
            refunded_at = CASE WHEN $1 = 'REFUNDED' THEN COALESCE(refunded_at, CURRENT_TIMESTAMP) ELSE refunded_at END
        WHERE id = $4
        RETURNING *
        "#,
    )
    .bind(status)
    .bind(transaction_id)
    .bind(raw_response)
    .bind(id)
    .fetch_one(conn)
    .await?;
    trace!("💳️ Payment {} moved to {status}", payment.payment_id);
    Ok(payment)
}

pub async fn insert_refund(refund: &NewRefund, conn: &mut SqliteConnection) -> Result<Refund, sqlx::Error> {
    let row = sqlx::query_as(
        r#"
        INSERT INTO refunds (refund_id, payment_id, amount, reason, status, gateway_refund_id, completed_at)
        VALUES ($1, $2, $3, $4, 'COMPLETED', $5, CURRENT_TIMESTAMP)
        RETURNING *
        "#,
    )
    .bind(&refund.refund_id)
    .bind(&refund.payment_id)
    .bind(refund.amount)
    .bind(&refund.reason)
    .bind(&refund.gateway_refund_id)
    .fetch_one(conn)
    .await?;
    debug!("💳️ Refund [{}] recorded for payment {}", refund.refund_id, refund.payment_id);
    Ok(row)
}

pub async fn insert_webhook(
    gateway: &str,
    gateway_payment_id: Option<&str>,
    webhook_type: &str,
    payload: &str,
    conn: &mut SqliteConnection,
) -> Result<i64, sqlx::Error> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO payment_webhooks (gateway, gateway_payment_id, webhook_type, payload)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(gateway)
    .bind(gateway_payment_id)
    .bind(webhook_type)
    .bind(payload)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

pub async fn mark_webhook(
    id: i64,
    status: WebhookStatusType,
    error_message: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE payment_webhooks
        SET status = $1, error_message = $2, processed_at = CURRENT_TIMESTAMP
        WHERE id = $3
        "#,
    )
    .bind(status)
    .bind(error_message)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}
