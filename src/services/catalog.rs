use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::not_found;
use crate::domain::aggregates::{rating_distribution, Category, CategorySummary, Product, ProductDraft, ProductView, Review};
use crate::store::catalog::{self, ProductFilter};
use crate::store::{reviews, PageRequest, Paginated};
use crate::{AppState, Result, StorefrontError};

pub const RELATED_PRODUCTS: i64 = 4;

pub async fn list_products(state: &AppState, filter: &ProductFilter, page: PageRequest) -> Result<Paginated<ProductView>> {
    if let (Some(min), Some(max)) = (filter.min_price, filter.max_price) {
        if min > max { return Err(StorefrontError::Validation("min_price cannot exceed max_price".into())); }
    }
    let mut conn = state.db.acquire().await?;
    let (products, total) = catalog::list_products(&mut conn, filter, page).await?;
    let views = products.iter().map(Product::view).collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Paginated::new(views, total, page))
}

#[derive(Debug, Serialize)]
pub struct ProductDetail {
    pub product: ProductView,
    pub related_products: Vec<ProductView>,
    pub reviews: Vec<Review>,
    pub average_rating: Decimal,
    pub review_count: i32,
    /// Counts for 1 to 5 stars.
    pub rating_distribution: [i64; 5],
}

pub async fn product_detail(state: &AppState, slug: &str) -> Result<ProductDetail> {
    let mut conn = state.db.acquire().await?;
    let product = catalog::find_product_by_slug(&mut conn, slug).await?.ok_or_else(|| not_found("Product"))?;
    let related = catalog::related_products(&mut conn, &product, RELATED_PRODUCTS).await?;
    let reviews = reviews::approved_for_product(&mut conn, product.id).await?;
    let ratings: Vec<i16> = reviews.iter().map(|r| r.rating).collect();

    Ok(ProductDetail {
        product: product.view()?,
        related_products: related.iter().map(Product::view).collect::<std::result::Result<Vec<_>, _>>()?,
        average_rating: product.rating,
        review_count: product.review_count,
        rating_distribution: rating_distribution(&ratings),
        reviews,
    })
}

pub async fn list_categories(state: &AppState) -> Result<Vec<CategorySummary>> {
    let mut conn = state.db.acquire().await?;
    catalog::list_categories(&mut conn).await
}

// -----------------------------------------------------------------------------
// Admin
// -----------------------------------------------------------------------------

#[tracing::instrument(skip_all, fields(%name))]
pub async fn create_category(state: &AppState, name: &str, description: Option<&str>) -> Result<Category> {
    let mut conn = state.db.acquire().await?;
    let category = catalog::insert_category(&mut conn, name, description).await?;
    tracing::info!(category_id = %category.id, slug = %category.slug, "category created");
    Ok(category)
}

#[tracing::instrument(skip_all, fields(%id))]
pub async fn update_category(state: &AppState, id: Uuid, name: &str, description: Option<&str>, is_active: bool) -> Result<Category> {
    let mut tx = state.db.begin().await?;
    let category = catalog::update_category(&mut tx, id, name, description, is_active).await?.ok_or_else(|| not_found("Category"))?;
    tx.commit().await?;
    Ok(category)
}

#[tracing::instrument(skip_all, fields(%id))]
pub async fn delete_category(state: &AppState, id: Uuid) -> Result<()> {
    let mut conn = state.db.acquire().await?;
    if !catalog::delete_category(&mut conn, id).await? { return Err(not_found("Category")); }
    tracing::info!("category deleted with its products");
    Ok(())
}

#[tracing::instrument(skip_all, fields(name = %draft.name))]
pub async fn create_product(state: &AppState, draft: &ProductDraft) -> Result<ProductView> {
    draft.validate()?;
    let mut tx = state.db.begin().await?;
    if !catalog::category_exists(&mut tx, draft.category_id).await? { return Err(not_found("Category")); }
    let product = catalog::insert_product(&mut tx, draft).await?;
    tx.commit().await?;
    tracing::info!(product_id = %product.id, slug = %product.slug, "product created");
    Ok(product.view()?)
}

#[tracing::instrument(skip_all, fields(%id))]
pub async fn update_product(state: &AppState, id: Uuid, draft: &ProductDraft) -> Result<ProductView> {
    draft.validate()?;
    let mut tx = state.db.begin().await?;
    if !catalog::category_exists(&mut tx, draft.category_id).await? { return Err(not_found("Category")); }
    let product = catalog::update_product(&mut tx, id, draft).await?.ok_or_else(|| not_found("Product"))?;
    tx.commit().await?;
    Ok(product.view()?)
}

#[tracing::instrument(skip_all, fields(%id))]
pub async fn delete_product(state: &AppState, id: Uuid) -> Result<()> {
    let mut conn = state.db.acquire().await?;
    if !catalog::delete_product(&mut conn, id).await? { return Err(not_found("Product")); }
    tracing::info!("product deleted");
    Ok(())
}
