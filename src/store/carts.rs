use sqlx::PgConnection;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, CartIdentity, CartLine};
use crate::Result;

/// Returns the single cart for `identity`, creating it on first use. Concurrent
/// callers race on the unique owner columns and all end up reading the same row.
pub async fn get_or_create(conn: &mut PgConnection, identity: &CartIdentity) -> Result<Cart> {
    let cart = match identity {
        CartIdentity::User(user_id) => {
            sqlx::query("INSERT INTO carts (id, user_id) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING")
                .bind(Uuid::now_v7()).bind(user_id).execute(&mut *conn).await?;
            sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE user_id = $1").bind(user_id).fetch_one(&mut *conn).await?
        }
        CartIdentity::Session(token) => {
            sqlx::query("INSERT INTO carts (id, session_token) VALUES ($1, $2) ON CONFLICT (session_token) DO NOTHING")
                .bind(Uuid::now_v7()).bind(token).execute(&mut *conn).await?;
            sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE session_token = $1").bind(token).fetch_one(&mut *conn).await?
        }
    };
    Ok(cart)
}

/// Looks up the cart for `identity` without creating one.
pub async fn find(conn: &mut PgConnection, identity: &CartIdentity) -> Result<Option<Cart>> {
    let query = match identity {
        CartIdentity::User(user_id) => sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE user_id = $1").bind(*user_id),
        CartIdentity::Session(token) => {
            sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE session_token = $1").bind(token.as_str())
        }
    };
    Ok(query.fetch_optional(conn).await?)
}

/// Takes the cart row lock held until the surrounding transaction ends.
pub async fn lock(conn: &mut PgConnection, cart_id: Uuid) -> Result<()> {
    sqlx::query("SELECT id FROM carts WHERE id = $1 FOR UPDATE").bind(cart_id).execute(conn).await?;
    Ok(())
}

pub async fn lines(conn: &mut PgConnection, cart_id: Uuid) -> Result<Vec<CartLine>> {
    Ok(sqlx::query_as::<_, CartLine>(
        "SELECT ci.id, ci.product_id, p.name AS product_name, p.slug AS product_slug, p.image, \
         p.price AS unit_price, ci.quantity, ci.size, ci.color \
         FROM cart_items ci JOIN products p ON p.id = ci.product_id \
         WHERE ci.cart_id = $1 ORDER BY ci.created_at, ci.id",
    )
    .bind(cart_id)
    .fetch_all(conn).await?)
}

pub async fn insert_item(
    conn: &mut PgConnection,
    cart_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    size: Option<&str>,
    color: Option<&str>,
) -> Result<Uuid> {
    let id = Uuid::now_v7();
    sqlx::query("INSERT INTO cart_items (id, cart_id, product_id, quantity, size, color) VALUES ($1, $2, $3, $4, $5, $6)")
        .bind(id).bind(cart_id).bind(product_id).bind(quantity).bind(size).bind(color)
        .execute(conn).await?;
    Ok(id)
}

pub async fn set_quantity(conn: &mut PgConnection, cart_id: Uuid, item_id: Uuid, quantity: i32) -> Result<bool> {
    let done = sqlx::query("UPDATE cart_items SET quantity = $3, updated_at = NOW() WHERE id = $1 AND cart_id = $2")
        .bind(item_id).bind(cart_id).bind(quantity)
        .execute(conn).await?;
    Ok(done.rows_affected() > 0)
}

pub async fn delete_item(conn: &mut PgConnection, cart_id: Uuid, item_id: Uuid) -> Result<bool> {
    let done = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND cart_id = $2")
        .bind(item_id).bind(cart_id)
        .execute(conn).await?;
    Ok(done.rows_affected() > 0)
}

pub async fn clear(conn: &mut PgConnection, cart_id: Uuid) -> Result<u64> {
    let done = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1").bind(cart_id).execute(conn).await?;
    Ok(done.rows_affected())
}

pub async fn touch(conn: &mut PgConnection, cart_id: Uuid) -> Result<()> {
    sqlx::query("UPDATE carts SET updated_at = NOW() WHERE id = $1").bind(cart_id).execute(conn).await?;
    Ok(())
}
