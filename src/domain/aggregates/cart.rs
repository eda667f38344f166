//! Cart Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::Product;
use crate::domain::value_objects::{normalize_option, round_money, selected_options, to_minor_units, SizeStockError};

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    #[serde(skip)]
    pub session_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Who a cart belongs to: a signed-in user or an anonymous session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CartIdentity {
    User(Uuid),
    Session(String),
}

/// A cart item joined with the product fields needed for pricing.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct CartLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_slug: String,
    pub image: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
}

impl CartLine {
    pub fn line_total(&self) -> Decimal { self.unit_price * Decimal::from(self.quantity) }

    pub fn matches(&self, product_id: Uuid, size: Option<&str>, color: Option<&str>) -> bool {
        self.product_id == product_id && self.size.as_deref() == size && self.color.as_deref() == color
    }

    /// Whether this line draws on the same stock as a request for `size`/`color`.
    /// An omitted selector matches every line of the product.
    pub fn shares_stock(&self, product_id: Uuid, size: Option<&str>, color: Option<&str>) -> bool {
        self.product_id == product_id
            && size.map_or(true, |s| self.size.as_deref() == Some(s))
            && color.map_or(true, |c| self.color.as_deref() == Some(c))
    }

    pub fn selected_options(&self) -> Option<String> { selected_options(self.size.as_deref(), self.color.as_deref()) }
}

// -----------------------------------------------------------------------------
// Totals
// -----------------------------------------------------------------------------

/// Flat shipping fee charged below the free-shipping threshold.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ShippingPolicy {
    pub fee: Decimal,
    pub free_threshold: Decimal,
}

impl Default for ShippingPolicy {
    fn default() -> Self { Self { fee: Decimal::new(1590, 2), free_threshold: Decimal::new(199, 0) } }
}

impl ShippingPolicy {
    pub fn shipping_for(&self, subtotal: Decimal) -> Decimal {
        if subtotal < self.free_threshold { self.fee } else { Decimal::ZERO }
    }
}

/// The one totals computation shared by the cart view, the payment amount and the order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CartTotals {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
    pub total_items: i64,
}

impl CartTotals {
    pub fn compute(lines: &[CartLine], policy: &ShippingPolicy) -> Self {
        let subtotal = round_money(lines.iter().map(CartLine::line_total).sum());
        let total_items = lines.iter().map(|l| i64::from(l.quantity)).sum();
        // An empty cart ships nothing.
        let shipping = if lines.is_empty() { Decimal::ZERO } else { policy.shipping_for(subtotal) };
        Self { subtotal, shipping, total: subtotal + shipping, total_items }
    }

    pub fn total_minor_units(&self) -> Option<i64> { to_minor_units(self.total) }
}

// -----------------------------------------------------------------------------
// Mutations
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddPlan {
    Increment { item_id: Uuid, quantity: i32 },
    Insert { size: Option<String>, color: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdatePlan {
    Remove,
    Set(i32),
}

/// Decides how an add-to-cart request changes `lines`, enforcing the stock ceiling
/// over every line that shares stock with the requested variant.
pub fn plan_add(
    lines: &[CartLine],
    product: &Product,
    quantity: i32,
    size: Option<&str>,
    color: Option<&str>,
) -> Result<AddPlan, CartError> {
    if quantity < 1 { return Err(CartError::InvalidQuantity); }
    let size = normalize_option(size);
    let color = normalize_option(color);
    if product.requires_color() && color.is_none() { return Err(CartError::ColorRequired); }

    let available = stock_as_i64(product.available_stock(size.as_deref())?);
    let in_cart: i64 = lines
        .iter()
        .filter(|l| l.shares_stock(product.id, size.as_deref(), color.as_deref()))
        .map(|l| i64::from(l.quantity))
        .sum();

    if in_cart + i64::from(quantity) > available {
        return Err(CartError::InsufficientStock { remaining: (available - in_cart).max(0) });
    }

    match lines.iter().find(|l| l.matches(product.id, size.as_deref(), color.as_deref())) {
        Some(line) => {
            let quantity = line.quantity.checked_add(quantity).ok_or(CartError::InvalidQuantity)?;
            Ok(AddPlan::Increment { item_id: line.id, quantity })
        }
        None => Ok(AddPlan::Insert { size, color }),
    }
}

/// Decides how a quantity change on `item_id` applies. Non-positive quantities remove
/// the line; anything else is held to the same ceiling as [`plan_add`].
pub fn plan_update(lines: &[CartLine], item_id: Uuid, product: &Product, quantity: i32) -> Result<UpdatePlan, CartError> {
    let line = lines.iter().find(|l| l.id == item_id).ok_or(CartError::ItemNotFound)?;
    if quantity <= 0 { return Ok(UpdatePlan::Remove); }

    let available = stock_as_i64(product.available_stock(line.size.as_deref())?);
    let others: i64 = lines
        .iter()
        .filter(|l| l.id != item_id && l.shares_stock(line.product_id, line.size.as_deref(), line.color.as_deref()))
        .map(|l| i64::from(l.quantity))
        .sum();
    if others + i64::from(quantity) > available {
        return Err(CartError::InsufficientStock { remaining: (available - others).max(0) });
    }
    Ok(UpdatePlan::Set(quantity))
}

fn stock_as_i64(stock: u64) -> i64 { i64::try_from(stock).unwrap_or(i64::MAX) }

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    InvalidQuantity,
    ColorRequired,
    InsufficientStock { remaining: i64 },
    ItemNotFound,
    Stock(SizeStockError),
}

impl From<SizeStockError> for CartError {
    fn from(e: SizeStockError) -> Self { Self::Stock(e) }
}

impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuantity => write!(f, "Quantity must be at least 1"),
            Self::ColorRequired => write!(f, "A color is required for this product"),
            Self::InsufficientStock { remaining } => write!(f, "Insufficient stock. Available: {remaining} units"),
            Self::ItemNotFound => write!(f, "Cart item not found"),
            Self::Stock(e) => write!(f, "{e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::tests::product;

    fn line(product: &Product, quantity: i32, size: Option<&str>, color: Option<&str>) -> CartLine {
        CartLine {
            id: Uuid::now_v7(), product_id: product.id, product_name: product.name.clone(),
            product_slug: product.slug.clone(), image: None, unit_price: product.price, quantity,
            size: size.map(String::from), color: color.map(String::from),
        }
    }

    #[test]
    fn test_size_ceiling_scenario() {
        let a = product(Decimal::new(5000, 2), 0, Some(r#"{"M": 2}"#), None);
        let lines = vec![line(&a, 2, Some("M"), None)];
        assert_eq!(plan_add(&lines, &a, 1, Some("M"), None), Err(CartError::InsufficientStock { remaining: 0 }));

        assert_eq!(plan_update(&lines, lines[0].id, &a, 0), Ok(UpdatePlan::Remove));
        let totals = CartTotals::compute(&[], &ShippingPolicy::default());
        assert_eq!(totals.total_items, 0);
    }

    #[test]
    fn test_add_merges_matching_variant() {
        let a = product(Decimal::new(50, 0), 10, None, None);
        let lines = vec![line(&a, 2, Some("M"), None)];
        assert_eq!(plan_add(&lines, &a, 3, Some(" M "), None), Ok(AddPlan::Increment { item_id: lines[0].id, quantity: 5 }));
        assert_eq!(plan_add(&lines, &a, 1, Some("G"), None), Ok(AddPlan::Insert { size: Some("G".into()), color: None }));
    }

    #[test]
    fn test_ceiling_counts_only_the_same_variant() {
        let a = product(Decimal::new(50, 0), 0, Some(r#"{"M": 2, "G": 5}"#), None);
        let lines = vec![line(&a, 2, Some("M"), None), line(&a, 4, Some("G"), None)];
        assert!(plan_add(&lines, &a, 1, Some("G"), None).is_ok());
        assert_eq!(plan_add(&lines, &a, 2, Some("G"), None), Err(CartError::InsufficientStock { remaining: 1 }));
        assert_eq!(plan_add(&lines, &a, 1, Some("P"), None), Err(CartError::InsufficientStock { remaining: 0 }));
    }

    #[test]
    fn test_sizeless_add_counts_every_line_of_the_product() {
        let a = product(Decimal::new(50, 0), 0, Some(r#"{"M": 2}"#), None);
        let lines = vec![line(&a, 2, Some("M"), None)];
        assert_eq!(plan_add(&lines, &a, 2, None, None), Err(CartError::InsufficientStock { remaining: 0 }));

        let b = product(Decimal::new(50, 0), 0, Some(r#"{"M": 2, "G": 3}"#), None);
        let lines = vec![line(&b, 2, Some("M"), None)];
        assert_eq!(plan_add(&lines, &b, 3, None, None), Ok(AddPlan::Insert { size: None, color: None }));
        assert_eq!(plan_add(&lines, &b, 4, None, None), Err(CartError::InsufficientStock { remaining: 3 }));
    }

    #[test]
    fn test_colorless_add_counts_all_colors() {
        let a = product(Decimal::new(50, 0), 3, None, None);
        let lines = vec![line(&a, 2, None, Some("Azul"))];
        assert_eq!(plan_add(&lines, &a, 2, None, None), Err(CartError::InsufficientStock { remaining: 1 }));
    }

    #[test]
    fn test_color_and_quantity_validation() {
        let a = product(Decimal::new(50, 0), 10, None, Some("Preto,Branco"));
        assert_eq!(plan_add(&[], &a, 1, None, Some("  ")), Err(CartError::ColorRequired));
        assert_eq!(plan_add(&[], &a, 0, None, Some("Preto")), Err(CartError::InvalidQuantity));
        assert!(plan_add(&[], &a, 1, None, Some("Preto")).is_ok());
    }

    #[test]
    fn test_update_is_held_to_stock() {
        let a = product(Decimal::new(50, 0), 3, None, None);
        let lines = vec![line(&a, 1, None, None)];
        assert_eq!(plan_update(&lines, lines[0].id, &a, 3), Ok(UpdatePlan::Set(3)));
        assert_eq!(plan_update(&lines, lines[0].id, &a, 4), Err(CartError::InsufficientStock { remaining: 3 }));
        assert_eq!(plan_update(&lines, Uuid::now_v7(), &a, 1), Err(CartError::ItemNotFound));
    }

    #[test]
    fn test_totals_and_shipping_threshold() {
        let cheap = product(Decimal::new(5000, 2), 10, None, None);
        let policy = ShippingPolicy::default();
        let totals = CartTotals::compute(&[line(&cheap, 2, Some("M"), None)], &policy);
        assert_eq!(totals.subtotal, Decimal::new(10000, 2));
        assert_eq!(totals.shipping, Decimal::new(1590, 2));
        assert_eq!(totals.total, Decimal::new(11590, 2));
        assert_eq!(totals.total_items, 2);
        assert_eq!(totals.total_minor_units(), Some(11590));

        let free = CartTotals::compute(&[line(&cheap, 4, None, None)], &policy);
        assert_eq!(free.shipping, Decimal::ZERO);
        assert_eq!(free.total, Decimal::new(200, 0));
    }

    #[test]
    fn test_selected_options_label() {
        let a = product(Decimal::new(50, 0), 3, None, None);
        assert_eq!(line(&a, 1, Some("M"), Some("Azul")).selected_options().as_deref(), Some("Size: M | Color: Azul"));
    }
}
