use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::not_found;
use crate::domain::aggregates::{plan_add, plan_update, AddPlan, CartError, CartIdentity, CartLine, CartTotals, ShippingPolicy, UpdatePlan};
use crate::store::{carts, catalog};
use crate::{AppState, Result};

#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    #[serde(flatten)]
    pub line: CartLine,
    pub selected_options: Option<String>,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartSummary {
    /// `None` until the visitor's first add persists a cart.
    pub cart_id: Option<Uuid>,
    pub items: Vec<CartLineView>,
    #[serde(flatten)]
    pub totals: CartTotals,
}

impl CartSummary {
    pub fn build(cart_id: Uuid, lines: Vec<CartLine>, policy: &ShippingPolicy) -> Self {
        let totals = CartTotals::compute(&lines, policy);
        let items = lines
            .into_iter()
            .map(|line| CartLineView { selected_options: line.selected_options(), subtotal: line.line_total(), line })
            .collect();
        Self { cart_id: Some(cart_id), items, totals }
    }

    pub fn empty(policy: &ShippingPolicy) -> Self {
        Self { cart_id: None, items: Vec::new(), totals: CartTotals::compute(&[], policy) }
    }
}

#[derive(Debug, Clone)]
pub struct AddItem {
    pub product_id: Uuid,
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
}

#[tracing::instrument(skip_all)]
pub async fn get_cart(state: &AppState, identity: &CartIdentity) -> Result<CartSummary> {
    let mut conn = state.db.acquire().await?;
    let Some(cart) = carts::find(&mut conn, identity).await? else {
        return Ok(CartSummary::empty(&state.config.shipping));
    };
    let lines = carts::lines(&mut conn, cart.id).await?;
    Ok(CartSummary::build(cart.id, lines, &state.config.shipping))
}

#[tracing::instrument(skip_all, fields(product_id = %item.product_id, quantity = item.quantity))]
pub async fn add_item(state: &AppState, identity: &CartIdentity, item: AddItem) -> Result<CartSummary> {
    if item.quantity < 1 { return Err(CartError::InvalidQuantity.into()); }

    let mut tx = state.db.begin().await?;
    let cart = carts::get_or_create(&mut tx, identity).await?;
    carts::lock(&mut tx, cart.id).await?;
    let product = catalog::find_active_product(&mut tx, item.product_id).await?.ok_or_else(|| not_found("Product"))?;
    let lines = carts::lines(&mut tx, cart.id).await?;

    match plan_add(&lines, &product, item.quantity, item.size.as_deref(), item.color.as_deref())? {
        AddPlan::Increment { item_id, quantity } => {
            carts::set_quantity(&mut tx, cart.id, item_id, quantity).await?;
        }
        AddPlan::Insert { size, color } => {
            carts::insert_item(&mut tx, cart.id, product.id, item.quantity, size.as_deref(), color.as_deref()).await?;
        }
    }
    carts::touch(&mut tx, cart.id).await?;
    let lines = carts::lines(&mut tx, cart.id).await?;
    tx.commit().await?;

    tracing::info!(cart_id = %cart.id, "item added to cart");
    Ok(CartSummary::build(cart.id, lines, &state.config.shipping))
}

#[tracing::instrument(skip_all, fields(%item_id, quantity))]
pub async fn update_item(state: &AppState, identity: &CartIdentity, item_id: Uuid, quantity: i32) -> Result<CartSummary> {
    let mut tx = state.db.begin().await?;
    let cart = carts::get_or_create(&mut tx, identity).await?;
    carts::lock(&mut tx, cart.id).await?;
    let lines = carts::lines(&mut tx, cart.id).await?;
    let line = lines.iter().find(|l| l.id == item_id).ok_or(CartError::ItemNotFound)?;
    let product = catalog::find_product(&mut tx, line.product_id).await?.ok_or_else(|| not_found("Product"))?;

    match plan_update(&lines, item_id, &product, quantity)? {
        UpdatePlan::Remove => { carts::delete_item(&mut tx, cart.id, item_id).await?; }
        UpdatePlan::Set(quantity) => { carts::set_quantity(&mut tx, cart.id, item_id, quantity).await?; }
    }
    carts::touch(&mut tx, cart.id).await?;
    let lines = carts::lines(&mut tx, cart.id).await?;
    tx.commit().await?;

    tracing::info!(cart_id = %cart.id, "cart item updated");
    Ok(CartSummary::build(cart.id, lines, &state.config.shipping))
}

#[tracing::instrument(skip_all, fields(%item_id))]
pub async fn remove_item(state: &AppState, identity: &CartIdentity, item_id: Uuid) -> Result<CartSummary> {
    let mut tx = state.db.begin().await?;
    let cart = carts::get_or_create(&mut tx, identity).await?;
    carts::lock(&mut tx, cart.id).await?;
    if !carts::delete_item(&mut tx, cart.id, item_id).await? {
        return Err(CartError::ItemNotFound.into());
    }
    carts::touch(&mut tx, cart.id).await?;
    let lines = carts::lines(&mut tx, cart.id).await?;
    tx.commit().await?;

    tracing::info!(cart_id = %cart.id, "cart item removed");
    Ok(CartSummary::build(cart.id, lines, &state.config.shipping))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_lines_carry_labels_and_subtotals() {
        let line = CartLine {
            id: Uuid::now_v7(), product_id: Uuid::now_v7(), product_name: "Camiseta".into(), product_slug: "camiseta".into(),
            image: None, unit_price: Decimal::new(5000, 2), quantity: 2, size: Some("M".into()), color: Some("Azul".into()),
        };
        let summary = CartSummary::build(Uuid::nil(), vec![line], &ShippingPolicy::default());
        assert_eq!(summary.items[0].subtotal, Decimal::new(10000, 2));
        assert_eq!(summary.items[0].selected_options.as_deref(), Some("Size: M | Color: Azul"));

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["total"], "115.90");
        assert_eq!(json["total_items"], 2);
        assert_eq!(json["items"][0]["product_name"], "Camiseta");
    }

    #[test]
    fn test_empty_summary_has_no_cart_and_no_shipping() {
        let summary = CartSummary::empty(&ShippingPolicy::default());
        assert_eq!(summary.cart_id, None);
        assert!(summary.items.is_empty());
        assert_eq!(summary.totals.shipping, Decimal::ZERO);
        assert_eq!(summary.totals.total, Decimal::ZERO);
        assert!(serde_json::to_value(&summary).unwrap()["cart_id"].is_null());
    }
}
