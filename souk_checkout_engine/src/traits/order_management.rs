use crate::{
    db_types::{CustomerInfo, FullOrder, NewShippingAddress, Order, OrderNumber, OrderQueryFilter, OrderStatusType},
    traits::CheckoutError,
};

/// Order creation and lifecycle.
///
/// `create_order_from_cart` is the order factory: in one all-or-nothing transaction it
/// re-validates availability for every cart line, creates the order with immutable item
/// snapshots, reserves stock, appends the initial history entry and clears the cart. A failure
/// at any step (for example one line newly out of stock) aborts the entire order and leaves
/// stock and cart untouched.
///
/// Status changes go through `update_order_status`, which enforces the state machine documented
/// on [`OrderStatusType::can_transition_to`] and appends exactly one history entry per accepted
/// transition. `confirmed_at`, `delivered_at` and `cancelled_at` are each stamped at most once.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    async fn create_order_from_cart(
        &self,
        session_key: &str,
        customer: &CustomerInfo,
        address: &NewShippingAddress,
    ) -> Result<FullOrder, CheckoutError>;

    async fn fetch_order(&self, order_number: &OrderNumber) -> Result<Option<FullOrder>, CheckoutError>;

    /// Orders matching the filter, newest first.
    async fn search_orders(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, CheckoutError>;

    async fn update_order_status(
        &self,
        order_number: &OrderNumber,
        new_status: OrderStatusType,
        note: Option<String>,
    ) -> Result<Order, CheckoutError>;

    /// Cancels an order. Rejected with `InvalidTransition` for delivered or already
    /// cancelled/refunded orders. Cancelling an order that still holds reserved (uncommitted)
    /// stock releases the reservation for every item in the same transaction; stock that was
    /// already committed stays deducted.
    async fn cancel_order(&self, order_number: &OrderNumber, reason: Option<String>) -> Result<Order, CheckoutError>;
}
