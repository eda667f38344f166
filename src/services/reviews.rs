use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgConnection;
use uuid::Uuid;

use super::not_found;
use crate::domain::aggregates::{ensure_admin, ensure_can_modify, RatingSummary, Review, SiteReview, UserReview};
use crate::domain::events::{DomainEvent, ReviewEvent};
use crate::domain::value_objects::{average_rating, normalize_option, Rating};
use crate::identity::Identity;
use crate::store::reviews::NewReview;
use crate::store::{catalog, orders, reviews};
use crate::{AppState, Result, StorefrontError};

/// Validated review text and score.
#[derive(Debug, Clone)]
pub struct ReviewInput {
    pub rating: Rating,
    pub title: Option<String>,
    pub comment: String,
}

impl ReviewInput {
    pub fn new(rating: i64, title: Option<&str>, comment: &str) -> Result<Self> {
        let rating = Rating::new(rating)?;
        let comment = comment.trim();
        if comment.is_empty() { return Err(StorefrontError::Validation("Comment is required".into())); }
        Ok(Self { rating, title: normalize_option(title), comment: comment.to_string() })
    }
}

/// Recomputes a product's cached rating and review count from its approved reviews.
/// Every review mutation calls this inside its own transaction.
pub async fn recompute_product_rating(conn: &mut PgConnection, product_id: Uuid) -> Result<RatingSummary> {
    catalog::lock_product(&mut *conn, product_id).await?.ok_or_else(|| not_found("Product"))?;
    let ratings = reviews::approved_ratings(&mut *conn, product_id).await?;
    let summary = RatingSummary::from_ratings(&ratings);
    catalog::set_product_rating(conn, product_id, summary).await?;
    Ok(summary)
}

async fn announce(state: &AppState, product_id: Uuid, summary: RatingSummary) {
    tracing::info!(%product_id, rating = %summary.rating, review_count = summary.review_count, "product rating recomputed");
    state
        .events
        .publish(DomainEvent::Review(ReviewEvent::RatingChanged {
            product_id,
            rating: summary.rating,
            review_count: summary.review_count,
        }))
        .await;
}

#[tracing::instrument(skip_all, fields(%user_id, %product_id))]
pub async fn submit(state: &AppState, user_id: Uuid, product_id: Uuid, input: ReviewInput) -> Result<Review> {
    let mut tx = state.db.begin().await?;
    catalog::lock_product(&mut tx, product_id).await?.ok_or_else(|| not_found("Product"))?;
    let is_verified_purchase = orders::has_purchased(&mut tx, user_id, product_id).await?;
    let review = reviews::insert(
        &mut tx,
        &NewReview {
            user_id,
            product_id,
            rating: input.rating,
            title: input.title.as_deref(),
            comment: &input.comment,
            is_verified_purchase,
        },
    )
    .await?
    .ok_or_else(|| StorefrontError::Business("You have already reviewed this product".into()))?;
    let summary = recompute_product_rating(&mut tx, product_id).await?;
    tx.commit().await?;

    announce(state, product_id, summary).await;
    Ok(review)
}

#[tracing::instrument(skip_all, fields(%review_id))]
pub async fn edit(state: &AppState, identity: &Identity, review_id: Uuid, input: ReviewInput) -> Result<Review> {
    let actor = identity.require_user()?;
    let mut tx = state.db.begin().await?;
    let existing = reviews::find(&mut tx, review_id).await?.ok_or_else(|| not_found("Review"))?;
    ensure_can_modify(existing.user_id, actor, identity.is_admin)?;

    catalog::lock_product(&mut tx, existing.product_id).await?;
    let review = reviews::update(&mut tx, review_id, input.rating, input.title.as_deref(), &input.comment).await?;
    let summary = recompute_product_rating(&mut tx, review.product_id).await?;
    tx.commit().await?;

    announce(state, review.product_id, summary).await;
    Ok(review)
}

#[tracing::instrument(skip_all, fields(%review_id))]
pub async fn delete(state: &AppState, identity: &Identity, review_id: Uuid) -> Result<()> {
    let actor = identity.require_user()?;
    let mut tx = state.db.begin().await?;
    let existing = reviews::find(&mut tx, review_id).await?.ok_or_else(|| not_found("Review"))?;
    ensure_can_modify(existing.user_id, actor, identity.is_admin)?;

    catalog::lock_product(&mut tx, existing.product_id).await?;
    reviews::delete(&mut tx, review_id).await?;
    let summary = recompute_product_rating(&mut tx, existing.product_id).await?;
    tx.commit().await?;

    announce(state, existing.product_id, summary).await;
    Ok(())
}

#[tracing::instrument(skip_all, fields(%review_id, is_approved))]
pub async fn moderate(state: &AppState, identity: &Identity, review_id: Uuid, is_approved: bool) -> Result<Review> {
    identity.require_user()?;
    ensure_admin(identity.is_admin)?;
    let mut tx = state.db.begin().await?;
    let existing = reviews::find(&mut tx, review_id).await?.ok_or_else(|| not_found("Review"))?;

    catalog::lock_product(&mut tx, existing.product_id).await?;
    let review = reviews::set_approval(&mut tx, review_id, is_approved).await?;
    let summary = recompute_product_rating(&mut tx, review.product_id).await?;
    tx.commit().await?;

    announce(state, review.product_id, summary).await;
    Ok(review)
}

/// Records the caller's helpful vote and returns the review's new helpful count.
#[tracing::instrument(skip_all, fields(%user_id, %review_id))]
pub async fn mark_helpful(state: &AppState, user_id: Uuid, review_id: Uuid) -> Result<i32> {
    let mut tx = state.db.begin().await?;
    reviews::find(&mut tx, review_id).await?.ok_or_else(|| not_found("Review"))?;
    if !reviews::insert_vote(&mut tx, review_id, user_id).await? {
        return Err(StorefrontError::Business("You already marked this review as helpful".into()));
    }
    let helpful_count = reviews::refresh_helpful_count(&mut tx, review_id).await?;
    tx.commit().await?;
    Ok(helpful_count)
}

#[derive(Debug, Serialize)]
pub struct ProductReviews {
    pub reviews: Vec<Review>,
    pub count: usize,
}

pub async fn for_product(state: &AppState, product_id: Uuid) -> Result<ProductReviews> {
    let mut conn = state.db.acquire().await?;
    catalog::find_product(&mut conn, product_id).await?.ok_or_else(|| not_found("Product"))?;
    let reviews = reviews::approved_for_product(&mut conn, product_id).await?;
    Ok(ProductReviews { count: reviews.len(), reviews })
}

pub async fn for_user(state: &AppState, user_id: Uuid) -> Result<Vec<UserReview>> {
    let mut conn = state.db.acquire().await?;
    reviews::for_user(&mut conn, user_id).await
}

// -----------------------------------------------------------------------------
// Site reviews
// -----------------------------------------------------------------------------

pub const SITE_REVIEWS_LIMIT: i64 = 50;

#[derive(Debug, Clone, Serialize)]
pub struct SiteReviewView {
    pub id: Uuid,
    pub name: String,
    pub rating: i16,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl From<SiteReview> for SiteReviewView {
    fn from(r: SiteReview) -> Self {
        Self { id: r.id, name: r.display_name().to_string(), rating: r.rating, comment: r.comment, created_at: r.created_at }
    }
}

#[derive(Debug, Serialize)]
pub struct SiteReviews {
    pub reviews: Vec<SiteReviewView>,
    pub site_rating: Decimal,
    pub total_reviews: usize,
}

pub async fn site_reviews(state: &AppState) -> Result<SiteReviews> {
    let mut conn = state.db.acquire().await?;
    let ratings = reviews::approved_site_ratings(&mut conn).await?;
    let reviews = reviews::approved_site_reviews(&mut conn, SITE_REVIEWS_LIMIT).await?;
    Ok(SiteReviews {
        reviews: reviews.into_iter().map(SiteReviewView::from).collect(),
        site_rating: average_rating(&ratings),
        total_reviews: ratings.len(),
    })
}

/// Signed-in users post under their account; anonymous visitors must give a name.
#[tracing::instrument(skip_all)]
pub async fn submit_site_review(
    state: &AppState,
    user_id: Option<Uuid>,
    name: Option<&str>,
    rating: i64,
    comment: &str,
) -> Result<SiteReviewView> {
    let rating = Rating::new(rating)?;
    let comment = comment.trim();
    if comment.is_empty() { return Err(StorefrontError::Validation("Comment is required".into())); }
    let name = normalize_option(name);
    if user_id.is_none() && name.is_none() {
        return Err(StorefrontError::Validation("Name is required for anonymous reviews".into()));
    }

    let mut conn = state.db.acquire().await?;
    let review = reviews::insert_site_review(&mut conn, user_id, name.as_deref(), rating, comment).await?;
    tracing::info!(site_review_id = %review.id, "site review submitted");
    Ok(review.into())
}
