use axum::extract::State;
use axum::response::{AppendHeaders, IntoResponse, Response};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{ok, validated, ApiJson, ApiPath};
use crate::identity::{Identity, CART_SESSION_HEADER};
use crate::services::cart::{self, AddItem, CartSummary};
use crate::{AppState, StorefrontError};

#[derive(Debug, Deserialize, Validate)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    #[serde(default = "one")]
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub quantity: i32,
    #[validate(length(max = 20, message = "must be at most 20 characters"))]
    pub size: Option<String>,
    #[validate(length(max = 50, message = "must be at most 50 characters"))]
    pub color: Option<String>,
}

fn one() -> i32 { 1 }

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest { pub quantity: i32 }

#[derive(Serialize)]
struct CartPayload {
    cart: CartSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_token: Option<String>,
}

/// Hands a newly issued anonymous session token back in both the header and the body.
fn respond(cart: CartSummary, issued: Option<String>) -> Response {
    let body = ok(CartPayload { cart, session_token: issued.clone() });
    match issued {
        Some(token) => (AppendHeaders([(CART_SESSION_HEADER, token)]), body).into_response(),
        None => body.into_response(),
    }
}

pub async fn get_cart(State(state): State<AppState>, identity: Identity) -> Result<Response, StorefrontError> {
    let (owner, issued) = identity.cart_identity(&state.sessions);
    let summary = cart::get_cart(&state, &owner).await?;
    Ok(respond(summary, issued))
}

pub async fn add_item(
    State(state): State<AppState>,
    identity: Identity,
    ApiJson(req): ApiJson<AddItemRequest>,
) -> Result<Response, StorefrontError> {
    let req = validated(req)?;
    let (owner, issued) = identity.cart_identity(&state.sessions);
    let item = AddItem { product_id: req.product_id, quantity: req.quantity, size: req.size, color: req.color };
    let summary = cart::add_item(&state, &owner, item).await?;
    Ok(respond(summary, issued))
}

pub async fn update_item(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(item_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateItemRequest>,
) -> Result<Response, StorefrontError> {
    let (owner, issued) = identity.cart_identity(&state.sessions);
    let summary = cart::update_item(&state, &owner, item_id, req.quantity).await?;
    Ok(respond(summary, issued))
}

pub async fn remove_item(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(item_id): ApiPath<Uuid>,
) -> Result<Response, StorefrontError> {
    let (owner, issued) = identity.cart_identity(&state.sessions);
    let summary = cart::remove_item(&state, &owner, item_id).await?;
    Ok(respond(summary, issued))
}
