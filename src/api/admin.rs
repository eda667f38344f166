//! Admin catalog and order management. Every handler checks the admin role first.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use super::{created, ok, validated, ApiJson, ApiPath, ApiQuery, Envelope};
use crate::domain::aggregates::{Order, OrderStatus, PaymentStatus, ProductDraft};
use crate::domain::value_objects::SizeStock;
use crate::identity::Identity;
use crate::services::{catalog, orders};
use crate::store::{PageRequest, Paginated};
use crate::{AppState, StorefrontError};

fn yes() -> bool { true }

#[derive(Debug, Deserialize, Validate)]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "yes")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProductRequest {
    pub category_id: Uuid,
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub short_description: Option<String>,
    pub price: Decimal,
    pub old_price: Option<Decimal>,
    pub brand: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub stock: i32,
    /// Size label to quantity.
    #[serde(default)]
    pub stock_sizes: BTreeMap<String, i64>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default = "yes")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_new: bool,
}

impl ProductRequest {
    pub fn into_draft(self) -> Result<ProductDraft, StorefrontError> {
        let size_stock = SizeStock::from_entries(self.stock_sizes).map_err(|e| StorefrontError::Validation(e.to_string()))?;
        Ok(ProductDraft {
            category_id: self.category_id,
            name: self.name.trim().to_string(),
            description: self.description,
            short_description: self.short_description,
            price: self.price,
            old_price: self.old_price,
            brand: self.brand,
            image_urls: self.images,
            stock: self.stock,
            size_stock,
            sizes: self.sizes,
            colors: self.colors,
            is_active: self.is_active,
            is_featured: self.is_featured,
            is_new: self.is_new,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct StatusChangeRequest {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
}

pub async fn create_category(
    State(state): State<AppState>,
    identity: Identity,
    ApiJson(req): ApiJson<CategoryRequest>,
) -> Result<(StatusCode, Json<Envelope<Value>>), StorefrontError> {
    identity.require_admin()?;
    let req = validated(req)?;
    let category = catalog::create_category(&state, req.name.trim(), req.description.as_deref()).await?;
    Ok(created(json!({ "category": category })))
}

pub async fn update_category(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<CategoryRequest>,
) -> Result<Json<Envelope<Value>>, StorefrontError> {
    identity.require_admin()?;
    let req = validated(req)?;
    let category = catalog::update_category(&state, id, req.name.trim(), req.description.as_deref(), req.is_active).await?;
    Ok(ok(json!({ "category": category })))
}

pub async fn delete_category(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Envelope<Value>>, StorefrontError> {
    identity.require_admin()?;
    catalog::delete_category(&state, id).await?;
    Ok(ok(json!({ "message": "Category deleted" })))
}

pub async fn create_product(
    State(state): State<AppState>,
    identity: Identity,
    ApiJson(req): ApiJson<ProductRequest>,
) -> Result<(StatusCode, Json<Envelope<Value>>), StorefrontError> {
    identity.require_admin()?;
    let draft = validated(req)?.into_draft()?;
    let product = catalog::create_product(&state, &draft).await?;
    Ok(created(json!({ "product": product })))
}

pub async fn update_product(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<ProductRequest>,
) -> Result<Json<Envelope<Value>>, StorefrontError> {
    identity.require_admin()?;
    let draft = validated(req)?.into_draft()?;
    let product = catalog::update_product(&state, id, &draft).await?;
    Ok(ok(json!({ "product": product })))
}

pub async fn delete_product(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Envelope<Value>>, StorefrontError> {
    identity.require_admin()?;
    catalog::delete_product(&state, id).await?;
    Ok(ok(json!({ "message": "Product deleted" })))
}

pub async fn list_orders(
    State(state): State<AppState>,
    identity: Identity,
    ApiQuery(query): ApiQuery<OrderListQuery>,
) -> Result<Json<Envelope<Paginated<Order>>>, StorefrontError> {
    identity.require_admin()?;
    let page = PageRequest::new(query.page, query.per_page);
    Ok(ok(orders::list_all(&state, query.status, page).await?))
}

pub async fn change_order_status(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(order_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<StatusChangeRequest>,
) -> Result<Json<Envelope<Value>>, StorefrontError> {
    identity.require_admin()?;
    let order = orders::change_status(&state, order_id, req.status, req.payment_status).await?;
    Ok(ok(json!({ "order": order })))
}
