use crate::{
    db_types::{Product, ProductVariant},
    traits::CheckoutError,
};

/// Read-only lookups against the product catalog. The catalog itself (creation, pricing, search)
/// is maintained elsewhere; the checkout engine only ever resolves active products and variants,
/// and both lookups may legitimately return `None`.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    async fn fetch_active_product(&self, product_id: i64) -> Result<Option<Product>, CheckoutError>;

    /// Fetches an active variant, scoped to its product. A variant id belonging to a different
    /// product resolves to `None`.
    async fn fetch_active_variant(
        &self,
        variant_id: i64,
        product_id: i64,
    ) -> Result<Option<ProductVariant>, CheckoutError>;
}
