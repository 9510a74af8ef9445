//! Catalog and stock seeding helpers for tests. The catalog is read-only for the engine proper,
//! so tests populate it directly.
use souk_common::Fils;

use crate::SqliteDatabase;

pub async fn seed_product(db: &SqliteDatabase, sku: &str, name: &str, price: Fils, stock: i64) -> i64 {
    seed_product_with_sale(db, sku, name, price, None, stock).await
}

pub async fn seed_product_with_sale(
    db: &SqliteDatabase,
    sku: &str,
    name: &str,
    base_price: Fils,
    sale_price: Option<Fils>,
    stock: i64,
) -> i64 {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO products (sku, name, slug, base_price, sale_price)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(sku)
    .bind(name)
    .bind(sku.to_lowercase())
    .bind(base_price)
    .bind(sale_price)
    .fetch_one(db.pool())
    .await
    .expect("Error seeding product");
    seed_stock(db, sku, stock).await;
    id
}

/// Adds a variant to a product (marking the product as variant-bearing) with its own ledger row.
pub async fn seed_variant(
    db: &SqliteDatabase,
    product_id: i64,
    sku: &str,
    options_json: &str,
    price: Fils,
    stock: i64,
) -> i64 {
    sqlx::query("UPDATE products SET has_variants = 1 WHERE id = $1")
        .bind(product_id)
        .execute(db.pool())
        .await
        .expect("Error flagging product as variant-bearing");
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO product_variants (product_id, sku, options, price)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(product_id)
    .bind(sku)
    .bind(options_json)
    .bind(price)
    .fetch_one(db.pool())
    .await
    .expect("Error seeding variant");
    seed_stock(db, sku, stock).await;
    id
}

pub async fn seed_stock(db: &SqliteDatabase, sku: &str, quantity: i64) {
    sqlx::query("INSERT INTO stock_ledger (sku, quantity_in_stock) VALUES ($1, $2)")
        .bind(sku)
        .bind(quantity)
        .execute(db.pool())
        .await
        .expect("Error seeding stock ledger");
}

/// Overwrites the on-hand count, e.g. to simulate stock vanishing between add-to-cart and
/// checkout.
pub async fn set_stock(db: &SqliteDatabase, sku: &str, quantity: i64) {
    sqlx::query("UPDATE stock_ledger SET quantity_in_stock = $1 WHERE sku = $2")
        .bind(quantity)
        .bind(sku)
        .execute(db.pool())
        .await
        .expect("Error setting stock level");
}

/// Mutates catalog fields after an order exists, to prove order-item snapshots don't follow.
pub async fn rewrite_product(db: &SqliteDatabase, product_id: i64, name: &str, price: Fils, active: bool) {
    sqlx::query("UPDATE products SET name = $1, base_price = $2, is_active = $3 WHERE id = $4")
        .bind(name)
        .bind(price)
        .bind(active)
        .bind(product_id)
        .execute(db.pool())
        .await
        .expect("Error rewriting product");
}
