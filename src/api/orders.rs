use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{ok, ApiPath, Envelope};
use crate::identity::Identity;
use crate::services::orders;
use crate::{AppState, StorefrontError};

pub async fn list_orders(State(state): State<AppState>, identity: Identity) -> Result<Json<Envelope<Value>>, StorefrontError> {
    let user_id = identity.require_user()?;
    let orders = orders::list_for_user(&state, user_id).await?;
    Ok(ok(json!({ "count": orders.len(), "orders": orders })))
}

pub async fn get_order(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(order_id): ApiPath<Uuid>,
) -> Result<Json<Envelope<Value>>, StorefrontError> {
    let order = orders::get_order(&state, &identity, order_id).await?;
    Ok(ok(json!({ "order": order })))
}
