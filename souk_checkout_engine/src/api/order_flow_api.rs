use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{CustomerInfo, FullOrder, NewShippingAddress, Order, OrderNumber, OrderQueryFilter, OrderStatusType},
    traits::{CheckoutError, OrderManagement},
};

/// `OrderFlowApi` handles checkout (cart → order) and the order lifecycle.
pub struct OrderFlowApi<B> {
    db: B,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement
{
    /// Converts the session's cart into an order.
    ///
    /// In one all-or-nothing transaction this validates availability for every line (stock may
    /// have moved since add-to-cart), computes subtotal + 5% VAT + the emirate's delivery fee,
    /// snapshots every line into an immutable order item, creates the shipping address and the
    /// initial `PENDING` history entry, reserves stock, and clears the cart. If any line fails,
    /// nothing is created and nothing is reserved.
    pub async fn place_order(
        &self,
        session_key: &str,
        customer: &CustomerInfo,
        address: &NewShippingAddress,
    ) -> Result<FullOrder, CheckoutError> {
        let order = self.db.create_order_from_cart(session_key, customer, address).await?;
        debug!("🔄️📦️ Order {} placed from session {session_key}", order.order.order_number);
        Ok(order)
    }

    pub async fn order(&self, order_number: &OrderNumber) -> Result<FullOrder, CheckoutError> {
        self.db.fetch_order(order_number).await?.ok_or_else(|| CheckoutError::OrderNotFound(order_number.clone()))
    }

    pub async fn search(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, CheckoutError> {
        self.db.search_orders(filter).await
    }

    /// Moves an order one step along the fulfilment flow, or into `CANCELLED`/`REFUNDED`.
    ///
    /// The transition table lives on [`OrderStatusType::can_transition_to`]; every accepted
    /// transition appends exactly one status-history entry, and the lifecycle timestamps
    /// (`confirmed_at`, `delivered_at`, `cancelled_at`) are stamped at most once.
    pub async fn update_status(
        &self,
        order_number: &OrderNumber,
        new_status: OrderStatusType,
        note: Option<String>,
    ) -> Result<Order, CheckoutError> {
        self.db.update_order_status(order_number, new_status, note).await
    }

    /// Cancels an order, returning reserved (not yet committed) stock to availability.
    ///
    /// Delivered and already cancelled/refunded orders are rejected with `InvalidTransition`.
    /// Orders whose stock was already committed keep the deduction; restocking after capture is
    /// a manual warehouse decision, not an automatic side effect.
    pub async fn cancel_order(&self, order_number: &OrderNumber, reason: Option<String>) -> Result<Order, CheckoutError> {
        let order = self.db.cancel_order(order_number, reason).await?;
        debug!("🔄️📦️ Order {} cancelled", order.order_number);
        Ok(order)
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
