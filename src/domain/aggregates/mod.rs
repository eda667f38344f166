//! Aggregates module
pub mod cart;
pub mod category;
pub mod order;
pub mod product;
pub mod review;

pub use cart::{plan_add, plan_update, AddPlan, Cart, CartError, CartIdentity, CartLine, CartTotals, ShippingPolicy, UpdatePlan};
pub use category::{Category, CategorySummary};
pub use order::{Order, OrderDetail, OrderDraft, OrderError, OrderItem, OrderLineDraft, OrderStatus, PaymentStatus, ShippingAddress};
pub use product::{Product, ProductDraft, ProductError, ProductView};
pub use review::{ensure_admin, ensure_can_modify, rating_distribution, RatingSummary, Review, ReviewError, SiteReview, UserReview};
