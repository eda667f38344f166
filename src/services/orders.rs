use uuid::Uuid;

use super::not_found;
use crate::domain::aggregates::{Order, OrderDetail, OrderStatus, PaymentStatus};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::identity::Identity;
use crate::store::{orders, PageRequest, Paginated};
use crate::{AppState, Result, StorefrontError};

pub async fn list_for_user(state: &AppState, user_id: Uuid) -> Result<Vec<Order>> {
    let mut conn = state.db.acquire().await?;
    orders::list_for_user(&mut conn, user_id).await
}

/// One order with its items, visible to its owner and to administrators.
pub async fn get_order(state: &AppState, identity: &Identity, order_id: Uuid) -> Result<OrderDetail> {
    let user_id = identity.require_user()?;
    let mut conn = state.db.acquire().await?;
    let order = orders::find(&mut conn, order_id).await?.ok_or_else(|| not_found("Order"))?;
    if order.user_id != user_id && !identity.is_admin {
        return Err(StorefrontError::Auth("You do not have access to this order".into()));
    }
    let items = orders::items(&mut conn, order.id).await?;
    Ok(OrderDetail { order, items })
}

pub async fn list_all(state: &AppState, status: Option<OrderStatus>, page: PageRequest) -> Result<Paginated<Order>> {
    let mut conn = state.db.acquire().await?;
    let (data, total) = orders::list_all(&mut conn, status, page).await?;
    Ok(Paginated::new(data, total, page))
}

#[tracing::instrument(skip_all, fields(%order_id, ?status, ?payment_status))]
pub async fn change_status(
    state: &AppState,
    order_id: Uuid,
    status: Option<OrderStatus>,
    payment_status: Option<PaymentStatus>,
) -> Result<Order> {
    if status.is_none() && payment_status.is_none() {
        return Err(StorefrontError::Validation("Nothing to update".into()));
    }
    let mut tx = state.db.begin().await?;
    let order = orders::lock(&mut tx, order_id).await?.ok_or_else(|| not_found("Order"))?;
    let (next_status, next_payment) = order.plan_status_change(status, payment_status)?;
    if (next_status, next_payment) == (order.status, order.payment_status) {
        return Ok(order);
    }
    let updated = orders::update_status(&mut tx, order_id, next_status, next_payment).await?;
    tx.commit().await?;

    tracing::info!(from = %order.status, to = %updated.status, "order status changed");
    state
        .events
        .publish(DomainEvent::Order(OrderEvent::StatusChanged {
            order_id,
            status: updated.status,
            payment_status: updated.payment_status,
        }))
        .await;
    Ok(updated)
}
