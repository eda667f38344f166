//! Order Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::{CartLine, CartTotals};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus { #[default] Pending, Paid, Shipped, Delivered, Cancelled }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus { #[default] Pending, Paid, Failed, Refunded }

impl OrderStatus {
    /// pending -> paid -> shipped -> delivered; anything not yet delivered may be cancelled.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (Pending, Paid) | (Paid, Shipped) | (Shipped, Delivered) => true,
            (Delivered | Cancelled, Cancelled) => false,
            (_, Cancelled) => true,
            _ => false,
        }
    }
}

impl PaymentStatus {
    /// pending -> paid or failed; a failed payment may still be settled; only paid may be refunded.
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!((self, next), (Pending, Paid | Failed) | (Failed, Paid) | (Paid, Refunded))
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        };
        f.write_str(s)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    pub payment_intent_id: Option<String>,
    pub payment_method_id: Option<String>,
    pub shipping_address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Validates an admin status change and returns the fields to persist.
    pub fn plan_status_change(
        &self,
        status: Option<OrderStatus>,
        payment_status: Option<PaymentStatus>,
    ) -> Result<(OrderStatus, PaymentStatus), OrderError> {
        let next_status = match status {
            Some(next) if next != self.status => {
                if !self.status.can_transition_to(next) {
                    return Err(OrderError::InvalidTransition { from: self.status, to: next });
                }
                next
            }
            _ => self.status,
        };
        let next_payment = match payment_status {
            Some(next) if next != self.payment_status => {
                if !self.payment_status.can_transition_to(next) {
                    if next == PaymentStatus::Refunded { return Err(OrderError::CannotRefund); }
                    return Err(OrderError::InvalidPaymentTransition { from: self.payment_status, to: next });
                }
                next
            }
            _ => self.payment_status,
        };
        Ok((next_status, next_payment))
    }
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub size: Option<String>,
    pub color: Option<String>,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal { self.unit_price * Decimal::from(self.quantity) }
}

/// Shipping fields collected at checkout, stored as one formatted line.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ShippingAddress {
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

impl std::fmt::Display for ShippingAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}, {}, {}, {}", self.name.trim(), self.address.trim(), self.city.trim(), self.state.trim(), self.zip.trim())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderLineDraft {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub size: Option<String>,
    pub color: Option<String>,
}

/// An order snapshot taken from a cart, ready to be inserted.
#[derive(Clone, Debug)]
pub struct OrderDraft {
    pub user_id: Uuid,
    pub total_amount: Decimal,
    pub payment_intent_id: String,
    pub payment_method_id: Option<String>,
    pub shipping_address: String,
    pub lines: Vec<OrderLineDraft>,
}

impl OrderDraft {
    pub const PAYMENT_METHOD: &'static str = "credit_card";

    pub fn from_cart(
        user_id: Uuid,
        lines: &[CartLine],
        totals: &CartTotals,
        payment_intent_id: impl Into<String>,
        payment_method_id: Option<String>,
        address: &ShippingAddress,
    ) -> Result<Self, OrderError> {
        if lines.is_empty() { return Err(OrderError::NoItems); }
        Ok(Self {
            user_id,
            total_amount: totals.total,
            payment_intent_id: payment_intent_id.into(),
            payment_method_id,
            shipping_address: address.to_string(),
            lines: lines
                .iter()
                .map(|l| OrderLineDraft {
                    product_id: l.product_id,
                    product_name: l.product_name.clone(),
                    quantity: l.quantity,
                    unit_price: l.unit_price,
                    size: l.size.clone(),
                    color: l.color.clone(),
                })
                .collect(),
        })
    }
}

/// An order together with its items.
#[derive(Clone, Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    NoItems,
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    InvalidPaymentTransition { from: PaymentStatus, to: PaymentStatus },
    CannotRefund,
}
impl std::error::Error for OrderError {}
impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoItems => write!(f, "Cart is empty"),
            Self::InvalidTransition { from, to } => write!(f, "Cannot change order status from {from} to {to}"),
            Self::InvalidPaymentTransition { from, to } => write!(f, "Cannot change payment status from {from} to {to}"),
            Self::CannotRefund => write!(f, "Only paid orders can be refunded"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(status: OrderStatus, payment_status: PaymentStatus) -> Order {
        Order {
            id: Uuid::now_v7(), user_id: Uuid::now_v7(), total_amount: Decimal::new(11590, 2), status,
            payment_method: OrderDraft::PAYMENT_METHOD.into(), payment_status, payment_intent_id: Some("pi_1".into()),
            payment_method_id: None, shipping_address: String::new(), created_at: Utc::now(), updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_order_lifecycle() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Paid));
        assert!(Paid.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));
        assert!(!Pending.can_transition_to(Shipped));
        assert!(!Delivered.can_transition_to(Pending));
        assert!(Shipped.can_transition_to(Cancelled));
        assert!(!Delivered.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Paid));
    }

    #[test]
    fn test_status_change_rules() {
        let o = order(OrderStatus::Pending, PaymentStatus::Paid);
        assert_eq!(o.plan_status_change(Some(OrderStatus::Paid), None), Ok((OrderStatus::Paid, PaymentStatus::Paid)));
        assert_eq!(
            o.plan_status_change(Some(OrderStatus::Delivered), None),
            Err(OrderError::InvalidTransition { from: OrderStatus::Pending, to: OrderStatus::Delivered })
        );
        assert_eq!(
            o.plan_status_change(Some(OrderStatus::Cancelled), Some(PaymentStatus::Refunded)),
            Ok((OrderStatus::Cancelled, PaymentStatus::Refunded))
        );

        let unpaid = order(OrderStatus::Pending, PaymentStatus::Failed);
        assert_eq!(unpaid.plan_status_change(None, Some(PaymentStatus::Refunded)), Err(OrderError::CannotRefund));
    }

    #[test]
    fn test_payment_status_follows_its_lifecycle() {
        use PaymentStatus::*;
        assert!(Pending.can_transition_to(Paid));
        assert!(Failed.can_transition_to(Paid));
        assert!(Paid.can_transition_to(Refunded));
        assert!(!Refunded.can_transition_to(Pending));
        assert!(!Paid.can_transition_to(Failed));

        let refunded = order(OrderStatus::Cancelled, Refunded);
        assert_eq!(
            refunded.plan_status_change(None, Some(Pending)),
            Err(OrderError::InvalidPaymentTransition { from: Refunded, to: Pending })
        );
        let delivered = order(OrderStatus::Delivered, Paid);
        assert_eq!(
            delivered.plan_status_change(None, Some(Failed)),
            Err(OrderError::InvalidPaymentTransition { from: Paid, to: Failed })
        );
        assert_eq!(delivered.plan_status_change(None, Some(Paid)), Ok((OrderStatus::Delivered, Paid)));
    }

    #[test]
    fn test_draft_from_cart() {
        let product_id = Uuid::now_v7();
        let lines = vec![CartLine {
            id: Uuid::now_v7(), product_id, product_name: "Camiseta".into(), product_slug: "camiseta".into(), image: None,
            unit_price: Decimal::new(5000, 2), quantity: 2, size: Some("M".into()), color: None,
        }];
        let totals = CartTotals::compute(&lines, &Default::default());
        let address = ShippingAddress { name: "Ana".into(), address: "Rua A, 1".into(), city: "Recife".into(), state: "PE".into(), zip: "50000-000".into() };
        let draft = OrderDraft::from_cart(Uuid::now_v7(), &lines, &totals, "pi_1", None, &address).unwrap();

        assert_eq!(draft.total_amount, Decimal::new(11590, 2));
        assert_eq!(draft.shipping_address, "Ana, Rua A, 1, Recife, PE, 50000-000");
        assert_eq!(draft.lines[0].size.as_deref(), Some("M"));
        assert_eq!(draft.lines[0].product_id, product_id);

        assert!(matches!(OrderDraft::from_cart(Uuid::now_v7(), &[], &totals, "pi_1", None, &address), Err(OrderError::NoItems)));
    }
}
