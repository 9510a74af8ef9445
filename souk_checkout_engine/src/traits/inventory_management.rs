use crate::{db_types::StockLevel, traits::CheckoutError};

/// The stock ledger: per-SKU on-hand and reserved counters.
///
/// `available = quantity_in_stock - reserved_quantity`, and at every committed state
/// `0 <= reserved_quantity <= quantity_in_stock`. Implementations must make each operation a
/// single atomic read-check-write scoped to the ledger row, so that two concurrent reservations
/// against the same SKU can never both observe stale availability.
#[allow(async_fn_in_trait)]
pub trait InventoryManagement {
    async fn fetch_stock_level(&self, sku: &str) -> Result<Option<StockLevel>, CheckoutError>;

    /// Earmarks `qty` units for a pending order. Fails with `InsufficientStock` unless
    /// `available >= qty`.
    async fn reserve_stock(&self, sku: &str, qty: i64) -> Result<StockLevel, CheckoutError>;

    /// Returns `qty` reserved units to availability, flooring the reserved counter at zero so a
    /// double release cannot drive it negative.
    async fn release_stock(&self, sku: &str, qty: i64) -> Result<StockLevel, CheckoutError>;

    /// Converts `qty` reserved units into a permanent deduction (payment confirmed): both the
    /// reserved counter and the on-hand count drop by `qty`, floored at zero.
    async fn commit_stock(&self, sku: &str, qty: i64) -> Result<StockLevel, CheckoutError>;
}
