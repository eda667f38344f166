use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{created, ok, ApiJson, ApiPath, Envelope};
use crate::domain::aggregates::Review;
use crate::identity::Identity;
use crate::services::reviews::{self, ProductReviews, ReviewInput, SiteReviewView, SiteReviews};
use crate::{AppState, StorefrontError};

#[derive(Debug, Deserialize)]
pub struct SubmitReviewRequest {
    pub product_id: Uuid,
    pub rating: i64,
    pub title: Option<String>,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct EditReviewRequest {
    pub rating: i64,
    pub title: Option<String>,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct ModerateRequest { pub is_approved: bool }

#[derive(Debug, Deserialize)]
pub struct SiteReviewRequest {
    pub name: Option<String>,
    pub rating: i64,
    #[serde(default)]
    pub comment: String,
}

pub async fn product_reviews(
    State(state): State<AppState>,
    ApiPath(product_id): ApiPath<Uuid>,
) -> Result<Json<Envelope<ProductReviews>>, StorefrontError> {
    Ok(ok(reviews::for_product(&state, product_id).await?))
}

pub async fn submit(
    State(state): State<AppState>,
    identity: Identity,
    ApiJson(req): ApiJson<SubmitReviewRequest>,
) -> Result<(StatusCode, Json<Envelope<Value>>), StorefrontError> {
    let user_id = identity.require_user()?;
    let input = ReviewInput::new(req.rating, req.title.as_deref(), &req.comment)?;
    let review = reviews::submit(&state, user_id, req.product_id, input).await?;
    Ok(created(json!({ "review": review })))
}

pub async fn edit(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(review_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<EditReviewRequest>,
) -> Result<Json<Envelope<Value>>, StorefrontError> {
    identity.require_user()?;
    let input = ReviewInput::new(req.rating, req.title.as_deref(), &req.comment)?;
    let review: Review = reviews::edit(&state, &identity, review_id, input).await?;
    Ok(ok(json!({ "review": review })))
}

pub async fn delete(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(review_id): ApiPath<Uuid>,
) -> Result<Json<Envelope<Value>>, StorefrontError> {
    identity.require_user()?;
    reviews::delete(&state, &identity, review_id).await?;
    Ok(ok(json!({ "message": "Review deleted" })))
}

pub async fn moderate(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(review_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<ModerateRequest>,
) -> Result<Json<Envelope<Value>>, StorefrontError> {
    identity.require_admin()?;
    let review = reviews::moderate(&state, &identity, review_id, req.is_approved).await?;
    Ok(ok(json!({ "review": review })))
}

pub async fn mark_helpful(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(review_id): ApiPath<Uuid>,
) -> Result<Json<Envelope<Value>>, StorefrontError> {
    let user_id = identity.require_user()?;
    let helpful_count = reviews::mark_helpful(&state, user_id, review_id).await?;
    Ok(ok(json!({ "helpful_count": helpful_count })))
}

pub async fn user_reviews(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<Json<Envelope<Value>>, StorefrontError> {
    let reviews = reviews::for_user(&state, user_id).await?;
    Ok(ok(json!({ "count": reviews.len(), "reviews": reviews })))
}

pub async fn site_reviews(State(state): State<AppState>) -> Result<Json<Envelope<SiteReviews>>, StorefrontError> {
    Ok(ok(reviews::site_reviews(&state).await?))
}

pub async fn submit_site_review(
    State(state): State<AppState>,
    identity: Identity,
    ApiJson(req): ApiJson<SiteReviewRequest>,
) -> Result<(StatusCode, Json<Envelope<SiteReviewView>>), StorefrontError> {
    let review = reviews::submit_site_review(&state, identity.user_id, req.name.as_deref(), req.rating, &req.comment).await?;
    Ok(created(review))
}
