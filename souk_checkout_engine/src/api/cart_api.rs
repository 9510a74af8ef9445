use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Cart, CartItem, CartSummary},
    traits::{CartManagement, CheckoutError},
};

/// The customer-facing cart API. Carts are addressed by session key; no login is required.
pub struct CartApi<B> {
    db: B,
}

impl<B> Debug for CartApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CartApi")
    }
}

impl<B> CartApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> CartApi<B>
where B: CartManagement
{
    pub async fn cart(&self, session_key: &str) -> Result<CartSummary, CheckoutError> {
        self.db.fetch_cart_summary(session_key).await
    }

    pub async fn get_or_create(&self, session_key: &str) -> Result<Cart, CheckoutError> {
        self.db.fetch_or_create_cart(session_key).await
    }

    /// Adds a product (or variant) to the session's cart, merging quantities with any existing
    /// line for the same product/variant.
    pub async fn add_item(
        &self,
        session_key: &str,
        product_id: i64,
        variant_id: Option<i64>,
        qty: i64,
    ) -> Result<CartItem, CheckoutError> {
        let item = self.db.add_cart_item(session_key, product_id, variant_id, qty).await?;
        debug!("🛒️ Session {session_key}: cart item {} now holds {} unit(s)", item.id, item.quantity);
        Ok(item)
    }

    /// Sets an item's absolute quantity; zero or less removes the item and returns `None`.
    pub async fn update_item(&self, item_id: i64, qty: i64) -> Result<Option<CartItem>, CheckoutError> {
        self.db.update_cart_item(item_id, qty).await
    }

    pub async fn remove_item(&self, item_id: i64) -> Result<(), CheckoutError> {
        self.db.remove_cart_item(item_id).await
    }

    /// Empties the cart, returning the number of removed items.
    pub async fn clear(&self, session_key: &str) -> Result<u64, CheckoutError> {
        let removed = self.db.clear_cart(session_key).await?;
        debug!("🛒️ Session {session_key}: cart cleared ({removed} items)");
        Ok(removed)
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
