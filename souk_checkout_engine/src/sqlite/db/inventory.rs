use log::trace;
use sqlx::SqliteConnection;

use crate::{db_types::StockLevel, traits::CheckoutError};

pub async fn fetch_stock_level(sku: &str, conn: &mut SqliteConnection) -> Result<Option<StockLevel>, sqlx::Error> {
    let level =
        sqlx::query_as("SELECT * FROM stock_ledger WHERE sku = $1").bind(sku).fetch_optional(conn).await?;
    Ok(level)
}

/// Earmarks `qty` units of `sku` for a pending order.
///
/// The availability check and the counter increment are a single guarded UPDATE, so two
/// concurrent reservations can never both read stale availability: whichever statement runs
/// second sees the first one's increment. `label` is the product name used in rejection
/// messages.
pub async fn reserve(
    sku: &str,
    qty: i64,
    label: &str,
    conn: &mut SqliteConnection,
) -> Result<StockLevel, CheckoutError> {
    let updated: Option<StockLevel> = sqlx::query_as(
        r#"
        UPDATE stock_ledger
        SET reserved_quantity = reserved_quantity + $1, updated_at = CURRENT_TIMESTAMP
        WHERE sku = $2 AND quantity_in_stock - reserved_quantity >= $1
        RETURNING *
        "#,
    )
    .bind(qty)
    .bind(sku)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(level) => {
            trace!("🧮️ Reserved {qty} x {sku}. {} remain available", level.available());
            Ok(level)
        },
        None => Err(rejection_for(sku, label, conn).await?),
    }
}

/// Returns reserved units to availability, flooring at zero so a double release cannot drive the
/// counter negative.
pub async fn release(sku: &str, qty: i64, conn: &mut SqliteConnection) -> Result<StockLevel, CheckoutError> {
    let updated: Option<StockLevel> = sqlx::query_as(
        r#"
        UPDATE stock_ledger
        SET reserved_quantity = MAX(reserved_quantity - $1, 0), updated_at = CURRENT_TIMESTAMP
        WHERE sku = $2
        RETURNING *
        "#,
    )
    .bind(qty)
    .bind(sku)
    .fetch_optional(&mut *conn)
    .await?;
    let level = updated.ok_or_else(|| CheckoutError::Validation(format!("No stock ledger entry for {sku}")))?;
    trace!("🧮️ Released {qty} x {sku}. {} now available", level.available());
    Ok(level)
}

/// Converts reserved units into a permanent deduction after payment confirmation. Both counters
/// drop together, floored at zero.
pub async fn commit(sku: &str, qty: i64, conn: &mut SqliteConnection) -> Result<StockLevel, CheckoutError> {
    let updated: Option<StockLevel> = sqlx::query_as(
        r#"
        UPDATE stock_ledger
        SET reserved_quantity = MAX(reserved_quantity - $1, 0),
            quantity_in_stock = MAX(quantity_in_stock - $1, 0),
            updated_at = CURRENT_TIMESTAMP
        WHERE sku = $2
        RETURNING *
        "#,
    )
    .bind(qty)
    .bind(sku)
    .fetch_optional(&mut *conn)
    .await?;
    let level = updated.ok_or_else(|| CheckoutError::Validation(format!("No stock ledger entry for {sku}")))?;
    trace!("🧮️ Committed {qty} x {sku}. {} left on hand", level.quantity_in_stock);
    Ok(level)
}

/// Availability check without mutation, for cart validation. `label` is used in error messages.
pub async fn check_available(
    sku: &str,
    qty: i64,
    label: &str,
    conn: &mut SqliteConnection,
) -> Result<StockLevel, CheckoutError> {
    let level = fetch_stock_level(sku, conn)
        .await?
        .ok_or_else(|| CheckoutError::Validation(format!("Inventory is not set up for {label}")))?;
    if !level.is_in_stock() {
        return Err(CheckoutError::OutOfStock { name: label.to_string() });
    }
    if level.available() < qty {
        return Err(CheckoutError::InsufficientStock { name: label.to_string(), available: level.available() });
    }
    Ok(level)
}

/// Builds the right rejection after a guarded reserve matched no row.
async fn rejection_for(sku: &str, label: &str, conn: &mut SqliteConnection) -> Result<CheckoutError, CheckoutError> {
    let err = match fetch_stock_level(sku, conn).await? {
        None => CheckoutError::Validation(format!("Inventory is not set up for {label}")),
        Some(level) if !level.is_in_stock() => CheckoutError::OutOfStock { name: label.to_string() },
        Some(level) => CheckoutError::InsufficientStock { name: label.to_string(), available: level.available() },
    };
    Ok(err)
}
