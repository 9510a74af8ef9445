use chrono::{DateTime, Utc};
use log::debug;
use souk_common::Fils;
use sqlx::SqliteConnection;

use crate::db_types::{Cart, CartItem, CartLine};

pub async fn fetch_cart_by_session(
    session_key: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Cart>, sqlx::Error> {
    let cart =
        sqlx::query_as("SELECT * FROM carts WHERE session_key = $1").bind(session_key).fetch_optional(conn).await?;
    Ok(cart)
}

pub async fn insert_cart(
    session_key: &str,
    expires_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Cart, sqlx::Error> {
    let cart = sqlx::query_as("INSERT INTO carts (session_key, expires_at) VALUES ($1, $2) RETURNING *")
        .bind(session_key)
        .bind(expires_at)
        .fetch_one(conn)
        .await?;
    Ok(cart)
}

/// Re-opens an expired cart in place: the session key is unique, so the row is kept and its
/// expiry window renewed. The caller is responsible for clearing stale items first.
pub async fn renew_cart(
    cart_id: i64,
    expires_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Cart, sqlx::Error> {
    let cart = sqlx::query_as(
        "UPDATE carts SET expires_at = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(expires_at)
    .bind(cart_id)
    .fetch_one(conn)
    .await?;
    Ok(cart)
}

pub async fn fetch_item(item_id: i64, conn: &mut SqliteConnection) -> Result<Option<CartItem>, sqlx::Error> {
    let item = sqlx::query_as("SELECT * FROM cart_items WHERE id = $1").bind(item_id).fetch_optional(conn).await?;
    Ok(item)
}

/// The unique line for (cart, product, variant), if one exists. NULL variants compare equal here,
/// matching the uniqueness index.
pub async fn fetch_item_for_product(
    cart_id: i64,
    product_id: i64,
    variant_id: Option<i64>,
    conn: &mut SqliteConnection,
) -> Result<Option<CartItem>, sqlx::Error> {
    let item = sqlx::query_as(
        "SELECT * FROM cart_items WHERE cart_id = $1 AND product_id = $2 AND ifnull(variant_id, 0) = ifnull($3, 0)",
    )
    .bind(cart_id)
    .bind(product_id)
    .bind(variant_id)
    .fetch_optional(conn)
    .await?;
    Ok(item)
}

pub async fn insert_item(
    cart_id: i64,
    product_id: i64,
    variant_id: Option<i64>,
    quantity: i64,
    price_at_addition: Fils,
    conn: &mut SqliteConnection,
) -> Result<CartItem, sqlx::Error> {
    let item: CartItem = sqlx::query_as(
        r#"
        INSERT INTO cart_items (cart_id, product_id, variant_id, quantity, price_at_addition)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(cart_id)
    .bind(product_id)
    .bind(variant_id)
    .bind(quantity)
    .bind(price_at_addition)
    .fetch_one(conn)
    .await?;
    debug!("🛒️ Cart item {} added to cart {cart_id}", item.id);
    Ok(item)
}

pub async fn update_item_quantity(
    item_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<CartItem, sqlx::Error> {
    let item = sqlx::query_as(
        "UPDATE cart_items SET quantity = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(quantity)
    .bind(item_id)
    .fetch_one(conn)
    .await?;
    Ok(item)
}

pub async fn delete_item(item_id: i64, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cart_items WHERE id = $1").bind(item_id).execute(conn).await?;
    Ok(result.rows_affected())
}

pub async fn delete_items_for_cart(cart_id: i64, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1").bind(cart_id).execute(conn).await?;
    Ok(result.rows_affected())
}

/// Cart items joined with the catalog fields needed to display or snapshot them.
pub async fn fetch_cart_lines(cart_id: i64, conn: &mut SqliteConnection) -> Result<Vec<CartLine>, sqlx::Error> {
    let lines = sqlx::query_as(
        r#"
        SELECT
            ci.id AS item_id,
            ci.product_id AS product_id,
            ci.variant_id AS variant_id,
            p.name AS product_name,
            COALESCE(v.sku, p.sku) AS sku,
            v.options AS variant_options,
            ci.quantity AS quantity,
            ci.price_at_addition AS price_at_addition
        FROM cart_items ci
        JOIN products p ON ci.product_id = p.id
        LEFT JOIN product_variants v ON ci.variant_id = v.id
        WHERE ci.cart_id = $1
        ORDER BY ci.id ASC
        "#,
    )
    .bind(cart_id)
    .fetch_all(conn)
    .await?;
    Ok(lines)
}
