//! Review Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::value_objects::average_rating;

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Review {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub rating: i16,
    pub title: Option<String>,
    pub comment: String,
    pub is_verified_purchase: bool,
    pub is_approved: bool,
    pub helpful_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A review listed on its author's page, with enough of the product to link to it.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct UserReview {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub review: Review,
    pub product_name: String,
    pub product_slug: String,
    pub product_image: Option<String>,
}

/// Store testimonial, either from a signed-in user or a named visitor.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct SiteReview {
    pub id: Uuid,
    #[serde(skip)]
    pub user_id: Option<Uuid>,
    pub name: Option<String>,
    pub rating: i16,
    pub comment: String,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SiteReview {
    pub const ANONYMOUS: &'static str = "Anônimo";
    pub fn display_name(&self) -> &str { self.name.as_deref().unwrap_or(Self::ANONYMOUS) }
}

/// Cached rating pair written back onto a product.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RatingSummary {
    pub rating: Decimal,
    pub review_count: i32,
}

impl RatingSummary {
    pub fn from_ratings(ratings: &[i16]) -> Self {
        Self { rating: average_rating(ratings), review_count: i32::try_from(ratings.len()).unwrap_or(i32::MAX) }
    }
}

/// Count of ratings per star, index 0 holding one-star reviews.
pub fn rating_distribution(ratings: &[i16]) -> [i64; 5] {
    let mut counts = [0i64; 5];
    for r in ratings {
        if let Ok(star) = usize::try_from(*r) {
            if (1..=5).contains(&star) { counts[star - 1] += 1; }
        }
    }
    counts
}

pub fn ensure_can_modify(owner: Uuid, actor: Uuid, is_admin: bool) -> Result<(), ReviewError> {
    if owner == actor || is_admin { Ok(()) } else { Err(ReviewError::NotOwner) }
}

pub fn ensure_admin(is_admin: bool) -> Result<(), ReviewError> {
    if is_admin { Ok(()) } else { Err(ReviewError::AdminOnly) }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewError { NotOwner, AdminOnly }
impl std::error::Error for ReviewError {}
impl std::fmt::Display for ReviewError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotOwner => write!(f, "You can only change your own reviews"),
            Self::AdminOnly => write!(f, "Administrator access required"),
        }
    }
}
