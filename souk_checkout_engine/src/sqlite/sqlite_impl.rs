//! `SqliteDatabase` is the concrete implementation of the checkout engine backend.
//!
//! Every multi-row unit of work (adding to a cart, creating an order, applying a webhook,
//! cancelling, refunding) runs inside a single `pool.begin()` transaction, so a failure at any
//! step rolls the whole operation back. The stock ledger is only ever touched through the guarded
//! statements in [`inventory`], which makes reserve/commit/release linearizable per SKU.
use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;
use serde_json::Value;
use souk_common::{Fils, AED_CURRENCY_CODE};
use sqlx::{SqliteConnection, SqlitePool};

use super::db::{carts, catalog, inventory, new_pool, orders, payments};
use crate::{
    db_types::{
        Cart,
        CartItem,
        CartLine,
        CartSummary,
        CustomerInfo,
        FullOrder,
        NewOrder,
        NewOrderItem,
        NewPayment,
        NewRefund,
        NewShippingAddress,
        Order,
        OrderNumber,
        OrderQueryFilter,
        OrderStatusType,
        OrderType,
        Payment,
        PaymentStatusType,
        Product,
        ProductVariant,
        Refund,
        StockLevel,
        WebhookStatusType,
    },
    helpers::{delivery_fee, new_order_number, vat_on, CART_TTL_DAYS},
    traits::{
        CartManagement,
        CatalogManagement,
        CheckoutDatabase,
        CheckoutError,
        InventoryManagement,
        OrderManagement,
        PaymentManagement,
        WebhookOutcome,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, CheckoutError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn try_add_cart_item(
        &self,
        session_key: &str,
        product_id: i64,
        variant_id: Option<i64>,
        qty: i64,
    ) -> Result<CartItem, CheckoutError> {
        let mut tx = self.pool.begin().await?;
        let cart = get_or_create_cart(session_key, &mut tx).await?;
        let product =
            catalog::fetch_active_product(product_id, &mut tx).await?.ok_or(CheckoutError::ProductNotFound)?;
        let variant = match variant_id {
            Some(vid) => Some(
                catalog::fetch_active_variant(vid, product_id, &mut tx)
                    .await?
                    .ok_or(CheckoutError::VariantNotFound)?,
            ),
            None if product.has_variants => return Err(CheckoutError::VariantRequired),
            None => None,
        };
        let (sku, price, label) = match &variant {
            Some(v) => (v.sku.clone(), v.effective_price(), variant_label(&product, v)),
            None => (product.sku.clone(), product.effective_price(), product.name.clone()),
        };
        let existing = carts::fetch_item_for_product(cart.id, product_id, variant_id, &mut tx).await?;
        let item = match existing {
            Some(existing) => {
                // Merging: the new TOTAL must fit in availability, and the rejection reports how
                // many more units could still be added, not the raw available count.
                let new_total = existing.quantity + qty;
                let level = inventory::fetch_stock_level(&sku, &mut tx)
                    .await?
                    .ok_or_else(|| CheckoutError::Validation(format!("Inventory is not set up for {label}")))?;
                if !level.is_in_stock() {
                    return Err(CheckoutError::OutOfStock { name: label });
                }
                if level.available() < new_total {
                    let addable = (level.available() - existing.quantity).max(0);
                    return Err(CheckoutError::InsufficientStock { name: label, available: addable });
                }
                debug!("🛒️ Merged {label} into cart {}: quantity is now {new_total}", cart.id);
                carts::update_item_quantity(existing.id, new_total, &mut tx).await?
            },
            None => {
                inventory::check_available(&sku, qty, &label, &mut tx).await?;
                carts::insert_item(cart.id, product_id, variant_id, qty, price, &mut tx).await?
            },
        };
        tx.commit().await?;
        Ok(item)
    }
}

/// Returns the session's cart. Expired carts are emptied and renewed in place (the session key
/// is unique), so expiry is enforced lazily at read time.
async fn get_or_create_cart(session_key: &str, conn: &mut SqliteConnection) -> Result<Cart, CheckoutError> {
    let expires_at = Utc::now() + Duration::days(CART_TTL_DAYS);
    match carts::fetch_cart_by_session(session_key, conn).await? {
        Some(cart) if !cart.is_expired() => Ok(cart),
        Some(cart) => {
            debug!("🛒️ Cart for session {session_key} has expired. Clearing and renewing it.");
            carts::delete_items_for_cart(cart.id, conn).await?;
            Ok(carts::renew_cart(cart.id, expires_at, conn).await?)
        },
        None => Ok(carts::insert_cart(session_key, expires_at, conn).await?),
    }
}

fn variant_label(product: &Product, variant: &ProductVariant) -> String {
    let mut values: Vec<String> = variant.options_map().into_values().collect();
    values.sort_unstable();
    if values.is_empty() {
        product.name.clone()
    } else {
        format!("{} ({})", product.name, values.join(", "))
    }
}

/// Inserts an order, regenerating the order number on the (unlikely) chance of a collision with
/// an existing one. Numbers are never reused, so a collision can only come from the generator.
async fn insert_order_with_unique_number(
    template: &NewOrder,
    conn: &mut SqliteConnection,
) -> Result<Order, CheckoutError> {
    let mut attempts = 0;
    loop {
        let candidate = NewOrder { order_number: new_order_number(), ..template.clone() };
        match orders::insert_order(&candidate, &mut *conn).await {
            Ok(order) => return Ok(order),
            Err(e) => {
                let unique = e.as_database_error().map(|d| d.is_unique_violation()).unwrap_or(false);
                attempts += 1;
                if !unique || attempts >= 3 {
                    return Err(e.into());
                }
                warn!("📝️ Order number collision ({}); regenerating", candidate.order_number);
            },
        }
    }
}

/// Applies one state-machine transition: validates it, stamps the lifecycle timestamp, appends
/// exactly one history entry, and releases reserved stock when a still-unpaid order is
/// cancelled. Stock that was already committed stays deducted.
async fn transition_order(
    order: Order,
    new_status: OrderStatusType,
    note: &str,
    conn: &mut SqliteConnection,
) -> Result<Order, CheckoutError> {
    if !order.status.can_transition_to(new_status) {
        return Err(CheckoutError::InvalidTransition { from: order.status, to: new_status });
    }
    if new_status == OrderStatusType::Cancelled && order.status == OrderStatusType::Pending {
        for item in orders::fetch_items(order.id, &mut *conn).await? {
            inventory::release(&item.sku, item.quantity, &mut *conn).await?;
        }
        debug!("📦️ Reserved stock released for cancelled order {}", order.order_number);
    }
    let updated = orders::update_status(order.id, new_status, &mut *conn).await?;
    orders::insert_status_history(order.id, new_status, Some(note), &mut *conn).await?;
    Ok(updated)
}

impl CatalogManagement for SqliteDatabase {
    async fn fetch_active_product(&self, product_id: i64) -> Result<Option<Product>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::fetch_active_product(product_id, &mut conn).await?)
    }

    async fn fetch_active_variant(
        &self,
        variant_id: i64,
        product_id: i64,
    ) -> Result<Option<ProductVariant>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::fetch_active_variant(variant_id, product_id, &mut conn).await?)
    }
}

impl InventoryManagement for SqliteDatabase {
    async fn fetch_stock_level(&self, sku: &str) -> Result<Option<StockLevel>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        Ok(inventory::fetch_stock_level(sku, &mut conn).await?)
    }

    async fn reserve_stock(&self, sku: &str, qty: i64) -> Result<StockLevel, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        inventory::reserve(sku, qty, sku, &mut conn).await
    }

    async fn release_stock(&self, sku: &str, qty: i64) -> Result<StockLevel, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        inventory::release(sku, qty, &mut conn).await
    }

    async fn commit_stock(&self, sku: &str, qty: i64) -> Result<StockLevel, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        inventory::commit(sku, qty, &mut conn).await
    }
}

impl CartManagement for SqliteDatabase {
    async fn fetch_or_create_cart(&self, session_key: &str) -> Result<Cart, CheckoutError> {
        let mut tx = self.pool.begin().await?;
        let cart = get_or_create_cart(session_key, &mut tx).await?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn fetch_cart_summary(&self, session_key: &str) -> Result<CartSummary, CheckoutError> {
        let mut tx = self.pool.begin().await?;
        let cart = get_or_create_cart(session_key, &mut tx).await?;
        let items = carts::fetch_cart_lines(cart.id, &mut tx).await?;
        tx.commit().await?;
        Ok(CartSummary { cart, items })
    }

    async fn add_cart_item(
        &self,
        session_key: &str,
        product_id: i64,
        variant_id: Option<i64>,
        qty: i64,
    ) -> Result<CartItem, CheckoutError> {
        if qty <= 0 {
            return Err(CheckoutError::Validation("Quantity must be greater than 0".to_string()));
        }
        // Two concurrent adds for the same (cart, product, variant) can both miss the existing
        // line and race on the unique index; the loser retries once and merges.
        match self.try_add_cart_item(session_key, product_id, variant_id, qty).await {
            Err(CheckoutError::ConstraintViolation(_)) => {
                debug!("🛒️ Concurrent insert of the same cart line detected. Retrying as a merge.");
                self.try_add_cart_item(session_key, product_id, variant_id, qty).await
            },
            other => other,
        }
    }

    async fn update_cart_item(&self, item_id: i64, qty: i64) -> Result<Option<CartItem>, CheckoutError> {
        let mut tx = self.pool.begin().await?;
        let item = carts::fetch_item(item_id, &mut tx).await?.ok_or(CheckoutError::CartItemNotFound)?;
        if qty <= 0 {
            carts::delete_item(item_id, &mut tx).await?;
            tx.commit().await?;
            debug!("🛒️ Cart item {item_id} removed (quantity set to {qty})");
            return Ok(None);
        }
        let product =
            catalog::fetch_active_product(item.product_id, &mut tx).await?.ok_or(CheckoutError::ProductNotFound)?;
        let (sku, label) = match item.variant_id {
            Some(vid) => {
                let variant = catalog::fetch_active_variant(vid, item.product_id, &mut tx)
                    .await?
                    .ok_or(CheckoutError::VariantNotFound)?;
                (variant.sku.clone(), variant_label(&product, &variant))
            },
            None => (product.sku.clone(), product.name.clone()),
        };
        inventory::check_available(&sku, qty, &label, &mut tx).await?;
        let item = carts::update_item_quantity(item_id, qty, &mut tx).await?;
        tx.commit().await?;
        Ok(Some(item))
    }

    async fn remove_cart_item(&self, item_id: i64) -> Result<(), CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let removed = carts::delete_item(item_id, &mut conn).await?;
        if removed == 0 {
            return Err(CheckoutError::CartItemNotFound);
        }
        Ok(())
    }

    async fn clear_cart(&self, session_key: &str) -> Result<u64, CheckoutError> {
        let mut tx = self.pool.begin().await?;
        let cart = carts::fetch_cart_by_session(session_key, &mut tx).await?.ok_or(CheckoutError::CartNotFound)?;
        let removed = carts::delete_items_for_cart(cart.id, &mut tx).await?;
        tx.commit().await?;
        debug!("🛒️ Cleared {removed} items from cart for session {session_key}");
        Ok(removed)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn create_order_from_cart(
        &self,
        session_key: &str,
        customer: &CustomerInfo,
        address: &NewShippingAddress,
    ) -> Result<FullOrder, CheckoutError> {
        let mut tx = self.pool.begin().await?;
        let cart = carts::fetch_cart_by_session(session_key, &mut tx).await?.ok_or(CheckoutError::CartNotFound)?;
        if cart.is_expired() {
            return Err(CheckoutError::EmptyCart);
        }
        let lines = carts::fetch_cart_lines(cart.id, &mut tx).await?;
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        // Re-validate availability at order time: stock may have moved since add-to-cart
        for line in &lines {
            inventory::check_available(&line.sku, line.quantity, &line.display_name(), &mut tx).await?;
        }
        let subtotal: Fils = lines.iter().map(CartLine::subtotal).sum();
        let tax_amount = vat_on(subtotal);
        let fee = delivery_fee(&address.emirate);
        let total_amount = subtotal + tax_amount + fee;
        let template = NewOrder {
            order_number: new_order_number(),
            order_type: OrderType::Retail,
            customer: customer.clone(),
            subtotal,
            discount_amount: Fils::default(),
            tax_amount,
            delivery_fee: fee,
            total_amount,
            currency: AED_CURRENCY_CODE.to_string(),
        };
        let order = insert_order_with_unique_number(&template, &mut tx).await?;
        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            let line_total = line.subtotal();
            let snapshot = NewOrderItem {
                product_name: line.display_name(),
                sku: line.sku.clone(),
                variant_options: line.variant_options.clone(),
                quantity: line.quantity,
                unit_price: line.price_at_addition,
                tax_amount: vat_on(line_total),
                total_price: line_total,
            };
            items.push(orders::insert_item(order.id, &snapshot, &mut tx).await?);
            inventory::reserve(&line.sku, line.quantity, &line.display_name(), &mut tx).await?;
        }
        let shipping_address = orders::insert_shipping_address(order.id, address, &mut tx).await?;
        let entry =
            orders::insert_status_history(order.id, OrderStatusType::Pending, Some("Order created"), &mut tx).await?;
        carts::delete_items_for_cart(cart.id, &mut tx).await?;
        tx.commit().await?;
        info!(
            "📝️ Order {} created for {}: {} line(s), total {}",
            order.order_number,
            customer.name,
            items.len(),
            order.total_amount
        );
        Ok(FullOrder { order, items, shipping_address: Some(shipping_address), history: vec![entry] })
    }

    async fn fetch_order(&self, order_number: &OrderNumber) -> Result<Option<FullOrder>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let order = match orders::fetch_order_by_number(order_number, &mut conn).await? {
            Some(order) => order,
            None => return Ok(None),
        };
        let items = orders::fetch_items(order.id, &mut conn).await?;
        let shipping_address = orders::fetch_shipping_address(order.id, &mut conn).await?;
        let history = orders::fetch_history(order.id, &mut conn).await?;
        Ok(Some(FullOrder { order, items, shipping_address, history }))
    }

    async fn search_orders(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::search_orders(filter, &mut conn).await?)
    }

    async fn update_order_status(
        &self,
        order_number: &OrderNumber,
        new_status: OrderStatusType,
        note: Option<String>,
    ) -> Result<Order, CheckoutError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_number(order_number, &mut tx)
            .await?
            .ok_or_else(|| CheckoutError::OrderNotFound(order_number.clone()))?;
        let note = note.unwrap_or_else(|| format!("Status changed from {} to {new_status}", order.status));
        let updated = transition_order(order, new_status, &note, &mut tx).await?;
        tx.commit().await?;
        info!("📦️ Order {order_number} moved to {new_status}");
        Ok(updated)
    }

    async fn cancel_order(&self, order_number: &OrderNumber, reason: Option<String>) -> Result<Order, CheckoutError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_number(order_number, &mut tx)
            .await?
            .ok_or_else(|| CheckoutError::OrderNotFound(order_number.clone()))?;
        let note = reason.unwrap_or_else(|| format!("Order cancelled (was {})", order.status));
        let updated = transition_order(order, OrderStatusType::Cancelled, &note, &mut tx).await?;
        tx.commit().await?;
        info!("📦️ Order {order_number} cancelled");
        Ok(updated)
    }
}

impl PaymentManagement for SqliteDatabase {
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::insert_payment(&payment, &mut conn).await?)
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<Option<Payment>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_payment_by_payment_id(payment_id, &mut conn).await?)
    }

    async fn fetch_payments_for_order(&self, order_id: i64) -> Result<Vec<Payment>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_payments_for_order(order_id, &mut conn).await?)
    }

    async fn update_payment_standing(
        &self,
        payment_id: &str,
        status: Option<PaymentStatusType>,
        transaction_id: Option<String>,
        raw: &Value,
    ) -> Result<Payment, CheckoutError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::fetch_payment_by_payment_id(payment_id, &mut tx)
            .await?
            .ok_or_else(|| CheckoutError::PaymentNotFound(payment_id.to_string()))?;
        let updated = match status {
            Some(new) if payments::should_apply(payment.status, new) => {
                payments::update_standing(payment.id, new, transaction_id.as_deref(), &raw.to_string(), &mut tx)
                    .await?
            },
            Some(new) => {
                debug!("💳️ Ignoring stale status {new} for payment {} (currently {})", payment.payment_id, payment.status);
                payment
            },
            None => {
                debug!("💳️ Unknown provider status for payment {}. Record left untouched.", payment.payment_id);
                payment
            },
        };
        tx.commit().await?;
        Ok(updated)
    }

    async fn apply_payment_webhook(
        &self,
        gateway: &str,
        gateway_payment_id: &str,
        status: Option<PaymentStatusType>,
        raw: &Value,
    ) -> Result<WebhookOutcome, CheckoutError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::fetch_payment_by_gateway_id(gateway_payment_id, &mut tx)
            .await?
            .ok_or_else(|| CheckoutError::PaymentNotFound(gateway_payment_id.to_string()))?;
        let mut status_changed = false;
        let mut current = payment.clone();
        match status {
            Some(new) if payments::should_apply(payment.status, new) => {
                current = payments::update_standing(payment.id, new, None, &raw.to_string(), &mut tx).await?;
                status_changed = true;
            },
            Some(new) => {
                debug!(
                    "💳️ Stale or duplicate webhook for payment {}: {} arrived while {}",
                    payment.payment_id, new, payment.status
                );
            },
            None => {
                debug!("💳️ Webhook with unmapped status for payment {}. Record left untouched.", payment.payment_id);
            },
        }
        let mut order_confirmed = false;
        // Confirmation is keyed off the incoming status, not status_changed, so a redelivered
        // "completed" can still repair a half-applied confirmation; the order-status guard keeps
        // it idempotent and stock is never committed twice.
        if status == Some(PaymentStatusType::Completed) {
            let order = orders::fetch_order_by_id(payment.order_id, &mut tx).await?.ok_or_else(|| {
                CheckoutError::DatabaseError(format!("Order {} missing for payment {}", payment.order_id, payment.payment_id))
            })?;
            if order.status == OrderStatusType::Pending {
                let order_number = order.order_number.clone();
                let note = format!("Payment confirmed via {gateway} - Payment ID: {}", payment.payment_id);
                let items = orders::fetch_items(order.id, &mut tx).await?;
                transition_order(order, OrderStatusType::Confirmed, &note, &mut tx).await?;
                for item in &items {
                    inventory::commit(&item.sku, item.quantity, &mut tx).await?;
                }
                order_confirmed = true;
                info!("📦️ Order {order_number} confirmed and stock committed ({gateway})");
            } else {
                debug!(
                    "📦️ Order {} is already {}; webhook applied idempotently with no stock movement",
                    order.order_number, order.status
                );
            }
        }
        tx.commit().await?;
        Ok(WebhookOutcome { payment: current, status_changed, order_confirmed })
    }

    async fn record_webhook(
        &self,
        gateway: &str,
        gateway_payment_id: Option<&str>,
        payload: &Value,
    ) -> Result<i64, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let webhook_type = payload
            .get("event_type")
            .or_else(|| payload.get("type"))
            .and_then(Value::as_str)
            .unwrap_or("payment_update");
        let id =
            payments::insert_webhook(gateway, gateway_payment_id, webhook_type, &payload.to_string(), &mut conn)
                .await?;
        Ok(id)
    }

    async fn mark_webhook(
        &self,
        webhook_id: i64,
        status: WebhookStatusType,
        error: Option<&str>,
    ) -> Result<(), CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        payments::mark_webhook(webhook_id, status, error, &mut conn).await?;
        Ok(())
    }

    async fn apply_refund(&self, refund: NewRefund) -> Result<Refund, CheckoutError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::fetch_payment_by_payment_id(refund.payment_id.as_str(), &mut tx)
            .await?
            .ok_or_else(|| CheckoutError::PaymentNotFound(refund.payment_id.to_string()))?;
        let row = payments::insert_refund(&refund, &mut tx).await?;
        if refund.amount == payment.amount {
            payments::update_standing(
                payment.id,
                PaymentStatusType::Refunded,
                None,
                &payment.gateway_response,
                &mut tx,
            )
            .await?;
            let order = orders::fetch_order_by_id(payment.order_id, &mut tx).await?.ok_or_else(|| {
                CheckoutError::DatabaseError(format!("Order {} missing for payment {}", payment.order_id, payment.payment_id))
            })?;
            if !order.status.is_terminal() {
                let note = format!("Refund {} processed - Payment ID: {}", row.refund_id, payment.payment_id);
                transition_order(order, OrderStatusType::Refunded, &note, &mut tx).await?;
            }
        }
        tx.commit().await?;
        info!("💳️ Refund {} applied to payment {}", row.refund_id, payment.payment_id);
        Ok(row)
    }
}

impl CheckoutDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }
}
