use sqlx::PgConnection;
use uuid::Uuid;

use super::PageRequest;
use crate::domain::aggregates::{Order, OrderDraft, OrderItem, OrderStatus, PaymentStatus};
use crate::Result;

/// Inserts the order and its items. Callers run this inside the checkout transaction.
pub async fn insert(conn: &mut PgConnection, draft: &OrderDraft) -> Result<Order> {
    let order = sqlx::query_as::<_, Order>(
        "INSERT INTO orders (id, user_id, total_amount, status, payment_method, payment_status, \
         payment_intent_id, payment_method_id, shipping_address) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(draft.user_id)
    .bind(draft.total_amount)
    .bind(OrderStatus::Pending)
    .bind(OrderDraft::PAYMENT_METHOD)
    .bind(PaymentStatus::Paid)
    .bind(&draft.payment_intent_id)
    .bind(&draft.payment_method_id)
    .bind(&draft.shipping_address)
    .fetch_one(&mut *conn).await?;

    for line in &draft.lines {
        sqlx::query(
            "INSERT INTO order_items (id, order_id, product_id, product_name, quantity, unit_price, size, color) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(Uuid::now_v7())
        .bind(order.id)
        .bind(line.product_id)
        .bind(&line.product_name)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(&line.size)
        .bind(&line.color)
        .execute(&mut *conn).await?;
    }
    Ok(order)
}

pub async fn find(conn: &mut PgConnection, id: Uuid) -> Result<Option<Order>> {
    Ok(sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?)
}

pub async fn lock(conn: &mut PgConnection, id: Uuid) -> Result<Option<Order>> {
    Ok(sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE").bind(id).fetch_optional(conn).await?)
}

pub async fn find_by_intent(conn: &mut PgConnection, payment_intent_id: &str) -> Result<Option<Order>> {
    Ok(sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE payment_intent_id = $1")
        .bind(payment_intent_id).fetch_optional(conn).await?)
}

pub async fn items(conn: &mut PgConnection, order_id: Uuid) -> Result<Vec<OrderItem>> {
    Ok(sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = $1 ORDER BY product_name, id")
        .bind(order_id).fetch_all(conn).await?)
}

pub async fn list_for_user(conn: &mut PgConnection, user_id: Uuid) -> Result<Vec<Order>> {
    Ok(sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC")
        .bind(user_id).fetch_all(conn).await?)
}

pub async fn list_all(conn: &mut PgConnection, status: Option<OrderStatus>, page: PageRequest) -> Result<(Vec<Order>, i64)> {
    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE ($1::order_status IS NULL OR status = $1) ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(status).bind(page.limit()).bind(page.offset())
    .fetch_all(&mut *conn).await?;
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE ($1::order_status IS NULL OR status = $1)")
        .bind(status).fetch_one(&mut *conn).await?;
    Ok((orders, total))
}

pub async fn update_status(conn: &mut PgConnection, id: Uuid, status: OrderStatus, payment_status: PaymentStatus) -> Result<Order> {
    Ok(sqlx::query_as::<_, Order>(
        "UPDATE orders SET status = $2, payment_status = $3, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id).bind(status).bind(payment_status)
    .fetch_one(conn).await?)
}

/// Whether the user has a paid order containing the product.
pub async fn has_purchased(conn: &mut PgConnection, user_id: Uuid, product_id: Uuid) -> Result<bool> {
    Ok(sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM orders o JOIN order_items oi ON oi.order_id = o.id \
         WHERE o.user_id = $1 AND oi.product_id = $2 AND o.payment_status = 'paid')",
    )
    .bind(user_id).bind(product_id)
    .fetch_one(conn).await?)
}
