use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{created, ok, ApiJson, Envelope};
use crate::domain::aggregates::{Order, ShippingAddress};
use crate::identity::Identity;
use crate::services::checkout::{self, PaymentIntentCreated};
use crate::{AppState, StorefrontError};

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub payment_intent_id: String,
    #[serde(default)]
    pub shipping: ShippingAddress,
}

#[derive(Serialize)]
pub struct OrderPlaced {
    order: Order,
    message: &'static str,
}

pub async fn create_payment_intent(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Envelope<PaymentIntentCreated>>, StorefrontError> {
    let user_id = identity.require_user()?;
    Ok(ok(checkout::create_payment_intent(&state, user_id).await?))
}

pub async fn finalize(
    State(state): State<AppState>,
    identity: Identity,
    ApiJson(req): ApiJson<CheckoutRequest>,
) -> Result<(StatusCode, Json<Envelope<OrderPlaced>>), StorefrontError> {
    let user_id = identity.require_user()?;
    let order = checkout::finalize_checkout(&state, user_id, &req.payment_intent_id, &req.shipping).await?;
    Ok(created(OrderPlaced { order, message: "Order placed successfully" }))
}
