use sqlx::SqliteConnection;

use crate::db_types::{Product, ProductVariant};

pub async fn fetch_active_product(
    product_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as("SELECT * FROM products WHERE id = $1 AND is_active = 1")
        .bind(product_id)
        .fetch_optional(conn)
        .await?;
    Ok(product)
}

/// Fetches an active variant scoped to its product. Variants belonging to a different product
/// resolve to `None` rather than an error, so callers can treat a mismatched pair as "not found".
pub async fn fetch_active_variant(
    variant_id: i64,
    product_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<ProductVariant>, sqlx::Error> {
    let variant =
        sqlx::query_as("SELECT * FROM product_variants WHERE id = $1 AND product_id = $2 AND is_active = 1")
            .bind(variant_id)
            .bind(product_id)
            .fetch_optional(conn)
            .await?;
    Ok(variant)
}
