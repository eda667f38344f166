use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{like_pattern, PageRequest};
use crate::domain::aggregates::{Category, CategorySummary, Product, ProductDraft, RatingSummary};
use crate::domain::value_objects::{join_tags, slugify};
use crate::{Result, StorefrontError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort { NameAsc, NameDesc, PriceAsc, PriceDesc, #[default] Newest }

impl ProductSort {
    fn order_by(self) -> &'static str {
        match self {
            Self::NameAsc => " ORDER BY p.name ASC, p.id",
            Self::NameDesc => " ORDER BY p.name DESC, p.id",
            Self::PriceAsc => " ORDER BY p.price ASC, p.id",
            Self::PriceDesc => " ORDER BY p.price DESC, p.id",
            Self::Newest => " ORDER BY p.created_at DESC, p.id",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub categories: Vec<String>,
    pub search: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub featured: Option<bool>,
    pub is_new: Option<bool>,
    pub sort: ProductSort,
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, f: &ProductFilter) {
    qb.push(" FROM products p JOIN categories c ON c.id = p.category_id WHERE p.is_active");
    if !f.categories.is_empty() {
        qb.push(" AND c.slug = ANY(").push_bind(f.categories.clone()).push(")");
    }
    if let Some(search) = f.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = like_pattern(search);
        qb.push(" AND (p.name ILIKE ").push_bind(pattern.clone());
        qb.push(" OR p.description ILIKE ").push_bind(pattern.clone());
        qb.push(" OR c.name ILIKE ").push_bind(pattern).push(")");
    }
    if let Some(min) = f.min_price { qb.push(" AND p.price >= ").push_bind(min); }
    if let Some(max) = f.max_price { qb.push(" AND p.price <= ").push_bind(max); }
    if let Some(featured) = f.featured { qb.push(" AND p.is_featured = ").push_bind(featured); }
    if let Some(is_new) = f.is_new { qb.push(" AND p.is_new = ").push_bind(is_new); }
}

pub async fn list_products(conn: &mut PgConnection, filter: &ProductFilter, page: PageRequest) -> Result<(Vec<Product>, i64)> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*)");
    push_filters(&mut count, filter);
    let total = count.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;

    let mut rows = QueryBuilder::<Postgres>::new("SELECT p.*");
    push_filters(&mut rows, filter);
    rows.push(filter.sort.order_by());
    rows.push(" LIMIT ").push_bind(page.limit()).push(" OFFSET ").push_bind(page.offset());
    let products = rows.build_query_as::<Product>().fetch_all(&mut *conn).await?;
    Ok((products, total))
}

pub async fn find_active_product(conn: &mut PgConnection, id: Uuid) -> Result<Option<Product>> {
    Ok(sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 AND is_active")
        .bind(id).fetch_optional(conn).await?)
}

pub async fn find_product(conn: &mut PgConnection, id: Uuid) -> Result<Option<Product>> {
    Ok(sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(conn).await?)
}

/// Row-locks the product for the rest of the transaction.
pub async fn lock_product(conn: &mut PgConnection, id: Uuid) -> Result<Option<Product>> {
    Ok(sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 FOR UPDATE")
        .bind(id).fetch_optional(conn).await?)
}

pub async fn find_product_by_slug(conn: &mut PgConnection, slug: &str) -> Result<Option<Product>> {
    Ok(sqlx::query_as::<_, Product>("SELECT * FROM products WHERE slug = $1 AND is_active")
        .bind(slug).fetch_optional(conn).await?)
}

pub async fn related_products(conn: &mut PgConnection, product: &Product, limit: i64) -> Result<Vec<Product>> {
    Ok(sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE category_id = $1 AND id <> $2 AND is_active ORDER BY created_at DESC LIMIT $3",
    )
    .bind(product.category_id).bind(product.id).bind(limit)
    .fetch_all(conn).await?)
}

pub async fn set_product_rating(conn: &mut PgConnection, id: Uuid, summary: RatingSummary) -> Result<()> {
    sqlx::query("UPDATE products SET rating = $2, review_count = $3, updated_at = NOW() WHERE id = $1")
        .bind(id).bind(summary.rating).bind(summary.review_count)
        .execute(conn).await?;
    Ok(())
}

// -----------------------------------------------------------------------------
// Categories
// -----------------------------------------------------------------------------

pub async fn list_categories(conn: &mut PgConnection) -> Result<Vec<CategorySummary>> {
    Ok(sqlx::query_as::<_, CategorySummary>(
        "SELECT c.id, c.name, c.slug, c.description, COUNT(p.id) AS product_count \
         FROM categories c LEFT JOIN products p ON p.category_id = c.id AND p.is_active \
         WHERE c.is_active GROUP BY c.id ORDER BY c.name",
    )
    .fetch_all(conn).await?)
}

pub async fn find_category(conn: &mut PgConnection, id: Uuid) -> Result<Option<Category>> {
    Ok(sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1").bind(id).fetch_optional(conn).await?)
}

pub async fn insert_category(conn: &mut PgConnection, name: &str, description: Option<&str>) -> Result<Category> {
    let slug = unique_slug(&mut *conn, SlugTable::Categories, name, None).await?;
    Ok(sqlx::query_as::<_, Category>(
        "INSERT INTO categories (id, name, slug, description) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(Uuid::now_v7()).bind(name.trim()).bind(&slug).bind(description)
    .fetch_one(conn).await?)
}

pub async fn update_category(
    conn: &mut PgConnection,
    id: Uuid,
    name: &str,
    description: Option<&str>,
    is_active: bool,
) -> Result<Option<Category>> {
    let Some(current) = find_category(&mut *conn, id).await? else { return Ok(None) };
    let slug = if current.name == name.trim() { current.slug } else { unique_slug(&mut *conn, SlugTable::Categories, name, Some(id)).await? };
    Ok(sqlx::query_as::<_, Category>(
        "UPDATE categories SET name = $2, slug = $3, description = $4, is_active = $5, updated_at = NOW() \
         WHERE id = $1 RETURNING *",
    )
    .bind(id).bind(name.trim()).bind(&slug).bind(description).bind(is_active)
    .fetch_optional(conn).await?)
}

/// Deletes the category and, by cascade, its products.
pub async fn delete_category(conn: &mut PgConnection, id: Uuid) -> Result<bool> {
    let done = sqlx::query("DELETE FROM categories WHERE id = $1").bind(id).execute(conn).await?;
    Ok(done.rows_affected() > 0)
}

// -----------------------------------------------------------------------------
// Admin product writes
// -----------------------------------------------------------------------------

pub async fn insert_product(conn: &mut PgConnection, draft: &ProductDraft) -> Result<Product> {
    let slug = unique_slug(&mut *conn, SlugTable::Products, &draft.name, None).await?;
    Ok(sqlx::query_as::<_, Product>(
        "INSERT INTO products (id, category_id, name, slug, description, short_description, price, old_price, brand, \
         image, images, stock, stock_sizes, sizes, colors, is_active, is_featured, is_new) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(draft.category_id)
    .bind(draft.name.trim())
    .bind(&slug)
    .bind(&draft.description)
    .bind(&draft.short_description)
    .bind(draft.price)
    .bind(draft.old_price)
    .bind(&draft.brand)
    .bind(draft.main_image())
    .bind(join_tags(&draft.image_urls))
    .bind(draft.stock)
    .bind(draft.size_stock.to_text()?)
    .bind(join_tags(&draft.sizes))
    .bind(join_tags(&draft.colors))
    .bind(draft.is_active)
    .bind(draft.is_featured)
    .bind(draft.is_new)
    .fetch_one(conn).await?)
}

pub async fn update_product(conn: &mut PgConnection, id: Uuid, draft: &ProductDraft) -> Result<Option<Product>> {
    let Some(current) = find_product(&mut *conn, id).await? else { return Ok(None) };
    let slug = if current.name == draft.name.trim() {
        current.slug
    } else {
        unique_slug(&mut *conn, SlugTable::Products, &draft.name, Some(id)).await?
    };
    // Keep the existing images when the edit doesn't supply any.
    let (image, images) = if draft.image_urls.is_empty() {
        (current.image, current.images)
    } else {
        (draft.main_image().map(String::from), join_tags(&draft.image_urls))
    };
    Ok(sqlx::query_as::<_, Product>(
        "UPDATE products SET category_id = $2, name = $3, slug = $4, description = $5, short_description = $6, \
         price = $7, old_price = $8, brand = $9, image = $10, images = $11, stock = $12, stock_sizes = $13, \
         sizes = $14, colors = $15, is_active = $16, is_featured = $17, is_new = $18, updated_at = NOW() \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(draft.category_id)
    .bind(draft.name.trim())
    .bind(&slug)
    .bind(&draft.description)
    .bind(&draft.short_description)
    .bind(draft.price)
    .bind(draft.old_price)
    .bind(&draft.brand)
    .bind(image)
    .bind(images)
    .bind(draft.stock)
    .bind(draft.size_stock.to_text()?)
    .bind(join_tags(&draft.sizes))
    .bind(join_tags(&draft.colors))
    .bind(draft.is_active)
    .bind(draft.is_featured)
    .bind(draft.is_new)
    .fetch_optional(conn).await?)
}

/// Deletes a product. Cart items, reviews and votes go with it; order items keep
/// their snapshot with the product reference cleared.
pub async fn delete_product(conn: &mut PgConnection, id: Uuid) -> Result<bool> {
    let done = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(conn).await?;
    Ok(done.rows_affected() > 0)
}

pub async fn category_exists(conn: &mut PgConnection, id: Uuid) -> Result<bool> {
    Ok(sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
        .bind(id).fetch_one(conn).await?)
}

#[derive(Debug, Clone, Copy)]
enum SlugTable { Categories, Products }

/// `base`, then `base-1`, `base-2`, ... until no other row holds it.
async fn unique_slug(conn: &mut PgConnection, table: SlugTable, name: &str, exclude: Option<Uuid>) -> Result<String> {
    let sql = match table {
        SlugTable::Categories => "SELECT EXISTS(SELECT 1 FROM categories WHERE slug = $1 AND ($2::uuid IS NULL OR id <> $2))",
        SlugTable::Products => "SELECT EXISTS(SELECT 1 FROM products WHERE slug = $1 AND ($2::uuid IS NULL OR id <> $2))",
    };
    let base = slugify(name);
    let mut candidate = base.clone();
    for n in 1..=1000u32 {
        let taken: bool = sqlx::query_scalar(sql).bind(&candidate).bind(exclude).fetch_one(&mut *conn).await?;
        if !taken { return Ok(candidate); }
        candidate = format!("{base}-{n}");
    }
    Err(StorefrontError::Business(format!("Could not find a free slug for {name:?}")))
}
