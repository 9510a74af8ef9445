use crate::{
    db_types::{Cart, CartItem, CartSummary},
    traits::CheckoutError,
};

/// Session carts. A cart is created lazily on first access per session key and expires after a
/// fixed TTL; expiry is enforced when the cart is read, not by a background sweep.
///
/// At most one cart item exists per (cart, product, variant); adding the same product/variant
/// again merges by summing quantities. Availability is checked against the stock ledger on every
/// mutation, but no stock is reserved until an order is created.
#[allow(async_fn_in_trait)]
pub trait CartManagement {
    /// Returns the session's cart, creating it (or renewing an expired one) as needed.
    async fn fetch_or_create_cart(&self, session_key: &str) -> Result<Cart, CheckoutError>;

    /// The cart with its lines; totals are computed from the lines.
    async fn fetch_cart_summary(&self, session_key: &str) -> Result<CartSummary, CheckoutError>;

    /// Adds `qty` of a product (or variant) to the cart, merging with an existing line if one
    /// exists. When merging, availability is re-validated for the *new total* quantity, and an
    /// `InsufficientStock` rejection reports how many more units could still be added.
    async fn add_cart_item(
        &self,
        session_key: &str,
        product_id: i64,
        variant_id: Option<i64>,
        qty: i64,
    ) -> Result<CartItem, CheckoutError>;

    /// Sets an item's absolute quantity. A quantity of zero or less deletes the item (returning
    /// `None`); otherwise availability is re-validated for the new absolute quantity.
    async fn update_cart_item(&self, item_id: i64, qty: i64) -> Result<Option<CartItem>, CheckoutError>;

    async fn remove_cart_item(&self, item_id: i64) -> Result<(), CheckoutError>;

    /// Removes every item from the session's cart, returning how many were removed.
    async fn clear_cart(&self, session_key: &str) -> Result<u64, CheckoutError>;
}
