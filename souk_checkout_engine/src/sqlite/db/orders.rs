use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{
        NewOrder,
        NewOrderItem,
        NewShippingAddress,
        Order,
        OrderItem,
        OrderNumber,
        OrderQueryFilter,
        OrderStatusType,
        ShippingAddress,
        StatusHistoryEntry,
    },
    traits::CheckoutError,
};

pub async fn insert_order(order: &NewOrder, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    let row = sqlx::query_as(
        r#"
        INSERT INTO orders (
            order_number,
            order_type,
            status,
            customer_name,
            customer_email,
            customer_phone,
            subtotal,
            discount_amount,
            tax_amount,
            delivery_fee,
            total_amount,
            currency
        ) VALUES ($1, $2, 'PENDING', $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(&order.order_number)
    .bind(order.order_type)
    .bind(&order.customer.name)
    .bind(&order.customer.email)
    .bind(&order.customer.phone)
    .bind(order.subtotal)
    .bind(order.discount_amount)
    .bind(order.tax_amount)
    .bind(order.delivery_fee)
    .bind(order.total_amount)
    .bind(&order.currency)
    .fetch_one(conn)
    .await?;
    debug!("📝️ Order [{}] inserted", order.order_number);
    Ok(row)
}

pub async fn fetch_order_by_number(
    order_number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE order_number = $1")
        .bind(order_number.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

pub async fn fetch_shipping_address(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<ShippingAddress>, sqlx::Error> {
    let address = sqlx::query_as("SELECT * FROM shipping_addresses WHERE order_id = $1")
        .bind(order_id)
        .fetch_optional(conn)
        .await?;
    Ok(address)
}

pub async fn fetch_history(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<StatusHistoryEntry>, sqlx::Error> {
    let history = sqlx::query_as("SELECT * FROM order_status_history WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(history)
}

pub async fn insert_item(
    order_id: i64,
    item: &NewOrderItem,
    conn: &mut SqliteConnection,
) -> Result<OrderItem, sqlx::Error> {
    let row = sqlx::query_as(
        r#"
        INSERT INTO order_items (
            order_id, product_name, sku, variant_options, quantity, unit_price, tax_amount, total_price
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(order_id)
    .bind(&item.product_name)
    .bind(&item.sku)
    .bind(&item.variant_options)
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(item.tax_amount)
    .bind(item.total_price)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn insert_shipping_address(
    order_id: i64,
    address: &NewShippingAddress,
    conn: &mut SqliteConnection,
) -> Result<ShippingAddress, sqlx::Error> {
    let row = sqlx::query_as(
        r#"
        INSERT INTO shipping_addresses (
            order_id,
            full_name,
            phone_number,
            email,
            address_line1,
            address_line2,
            city,
            emirate,
            area,
            postal_code,
            delivery_instructions
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(order_id)
    .bind(&address.full_name)
    .bind(&address.phone_number)
    .bind(&address.email)
    .bind(&address.address_line1)
    .bind(&address.address_line2)
    .bind(&address.city)
    .bind(&address.emirate)
    .bind(&address.area)
    .bind(&address.postal_code)
    .bind(&address.delivery_instructions)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn insert_status_history(
    order_id: i64,
    status: OrderStatusType,
    notes: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<StatusHistoryEntry, sqlx::Error> {
    let entry =
        sqlx::query_as("INSERT INTO order_status_history (order_id, status, notes) VALUES ($1, $2, $3) RETURNING *")
            .bind(order_id)
            .bind(status)
            .bind(notes)
            .fetch_one(conn)
            .await?;
    Ok(entry)
}

/// Moves an order to a new status and stamps the matching lifecycle timestamp. The `COALESCE`
/// guards keep `confirmed_at`, `delivered_at` and `cancelled_at` write-once.
pub async fn update_status(
    order_id: i64,
    status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Order, CheckoutError> {
    let result: Option<Order> = sqlx::query_as(
        r#"
        UPDATE orders SET
            status = $1,
            updated_at = CURRENT_TIMESTAMP,
            confirmed_at = CASE WHEN $1 = 'CONFIRMED' THEN COALESCE(confirmed_at, CURRENT_TIMESTAMP) ELSE confirmed_at END,
            delivered_at = CASE WHEN $1 = 'DELIVERED' THEN COALESCE(delivered_at, CURRENT_TIMESTAMP) ELSE delivered_at END,
            cancelled_at = CASE WHEN $1 = 'CANCELLED' THEN COALESCE(cancelled_at, CURRENT_TIMESTAMP) ELSE cancelled_at END
        WHERE id = $2
        RETURNING *
        "#,
    )
    .bind(status)
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    result.ok_or_else(|| CheckoutError::DatabaseError(format!("Order id {order_id} vanished during update")))
}

/// Fetches orders according to the filter criteria, newest first.
pub async fn search_orders(filter: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !filter.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(status) = filter.status {
        where_clause.push("status = ");
        where_clause.push_bind_unseparated(status.to_string());
    }
    if let Some(order_type) = filter.order_type {
        where_clause.push("order_type = ");
        where_clause.push_bind_unseparated(order_type.to_string());
    }
    builder.push(" ORDER BY created_at DESC, id DESC");
    if let Some(limit) = filter.limit {
        builder.push(" LIMIT ");
        builder.push_bind(limit);
    }
    trace!("📝️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    Ok(orders)
}
