use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::{CartIdentity, CartTotals, Order, OrderDraft, OrderError, ShippingAddress};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::payment::{with_timeout, PaymentIntent, META_CART_ID, META_USER_ID};
use crate::store::{carts, orders};
use crate::{AppState, Result, StorefrontError};

#[derive(Debug, Clone, Serialize)]
pub struct PaymentIntentCreated {
    pub client_secret: Option<String>,
    pub payment_intent_id: String,
    /// Minor units.
    pub amount: i64,
    pub currency: String,
    #[serde(flatten)]
    pub totals: CartTotals,
}

#[tracing::instrument(skip_all, fields(%user_id))]
pub async fn create_payment_intent(state: &AppState, user_id: Uuid) -> Result<PaymentIntentCreated> {
    let mut conn = state.db.acquire().await?;
    let cart = carts::get_or_create(&mut conn, &CartIdentity::User(user_id)).await?;
    let lines = carts::lines(&mut conn, cart.id).await?;
    drop(conn);
    if lines.is_empty() { return Err(OrderError::NoItems.into()); }

    let totals = CartTotals::compute(&lines, &state.config.shipping);
    let amount = totals.total_minor_units().ok_or_else(|| StorefrontError::Business("Cart total is out of range".into()))?;
    let currency = state.config.payment.currency.clone();
    let metadata = BTreeMap::from([
        (META_USER_ID.to_string(), user_id.to_string()),
        (META_CART_ID.to_string(), cart.id.to_string()),
    ]);

    let intent = with_timeout(state.config.payment.timeout, state.payments.create_intent(amount, &currency, metadata))
        .await
        .map_err(|e| {
            tracing::error!(cart_id = %cart.id, error = %e, "failed to create payment intent");
            StorefrontError::Payment("Could not start the payment. Please try again.".into())
        })?;

    tracing::info!(cart_id = %cart.id, payment_intent_id = %intent.id, amount, "payment intent created");
    Ok(PaymentIntentCreated { client_secret: intent.client_secret, payment_intent_id: intent.id, amount, currency, totals })
}

/// Turns the caller's cart into an order once the gateway confirms the payment.
#[tracing::instrument(skip_all, fields(%user_id, %payment_intent_id))]
pub async fn finalize_checkout(
    state: &AppState,
    user_id: Uuid,
    payment_intent_id: &str,
    address: &ShippingAddress,
) -> Result<Order> {
    let payment_intent_id = payment_intent_id.trim();
    if payment_intent_id.is_empty() {
        return Err(StorefrontError::Validation("Payment id is required".into()));
    }

    let intent = with_timeout(state.config.payment.timeout, state.payments.retrieve_intent(payment_intent_id))
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "could not verify payment intent");
            StorefrontError::Payment("Payment could not be verified".into())
        })?;
    if !intent.succeeded() {
        tracing::info!(status = ?intent.status, "payment intent not succeeded");
        return Err(StorefrontError::Payment("Payment was not completed".into()));
    }

    let order = match place_order(state, user_id, &intent, address).await {
        Ok(order) => order,
        Err(e @ (StorefrontError::Business(_) | StorefrontError::Payment(_) | StorefrontError::Validation(_))) => return Err(e),
        Err(e) => {
            tracing::error!(payment_intent_id = %intent.id, error = %e, "order creation failed after payment confirmation");
            return Err(StorefrontError::Payment(
                "Your payment was received but the order could not be created. Please contact support.".into(),
            ));
        }
    };

    tracing::info!(order_id = %order.id, total = %order.total_amount, "order placed");
    state
        .events
        .publish(DomainEvent::Order(OrderEvent::Placed {
            order_id: order.id,
            user_id,
            total_amount: order.total_amount,
            payment_intent_id: intent.id.clone(),
        }))
        .await;
    Ok(order)
}

async fn place_order(state: &AppState, user_id: Uuid, intent: &PaymentIntent, address: &ShippingAddress) -> Result<Order> {
    let mut tx = state.db.begin().await?;
    let cart = carts::get_or_create(&mut tx, &CartIdentity::User(user_id)).await?;
    carts::lock(&mut tx, cart.id).await?;

    if orders::find_by_intent(&mut tx, &intent.id).await?.is_some() {
        return Err(StorefrontError::Business("This payment has already been used for an order".into()));
    }
    let lines = carts::lines(&mut tx, cart.id).await?;
    if lines.is_empty() { return Err(OrderError::NoItems.into()); }

    let totals = CartTotals::compute(&lines, &state.config.shipping);
    check_intent_matches(intent, &totals, cart.id, user_id)?;

    let draft = OrderDraft::from_cart(user_id, &lines, &totals, intent.id.clone(), intent.payment_method.clone(), address)?;
    let order = orders::insert(&mut tx, &draft).await?;
    let cleared = carts::clear(&mut tx, cart.id).await?;
    carts::touch(&mut tx, cart.id).await?;
    tx.commit().await?;

    tracing::debug!(order_id = %order.id, cart_id = %cart.id, cleared, "cart converted to order");
    Ok(order)
}

/// The paid amount and the intent's owner must match the cart being converted.
fn check_intent_matches(intent: &PaymentIntent, totals: &CartTotals, cart_id: Uuid, user_id: Uuid) -> Result<()> {
    let expected = totals.total_minor_units();
    let cart_matches = intent.metadata(META_CART_ID) == Some(cart_id.to_string().as_str());
    let user_matches = intent.metadata(META_USER_ID) == Some(user_id.to_string().as_str());

    if expected != Some(intent.amount) || !cart_matches || !user_matches {
        tracing::error!(
            payment_intent_id = %intent.id,
            paid = intent.amount,
            expected = ?expected,
            cart_matches,
            user_matches,
            "payment does not match cart; needs reconciliation"
        );
        return Err(StorefrontError::Payment("Payment does not match the current cart".into()));
    }
    Ok(())
}
