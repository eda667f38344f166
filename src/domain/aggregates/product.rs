//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::value_objects::{split_tags, SizeStock, SizeStockError};

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub short_description: Option<String>,
    pub price: Decimal,
    pub old_price: Option<Decimal>,
    pub brand: Option<String>,
    pub image: Option<String>,
    pub images: Option<String>,
    pub stock: i32,
    pub stock_sizes: Option<String>,
    pub sizes: Option<String>,
    pub colors: Option<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub is_new: bool,
    pub rating: Decimal,
    pub review_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn size_stock(&self) -> Result<SizeStock, SizeStockError> { SizeStock::parse(self.stock_sizes.as_deref()) }

    /// Sum of the per-size table when one is tracked, the flat count otherwise.
    pub fn total_stock(&self) -> Result<u64, SizeStockError> {
        let sizes = self.size_stock()?;
        Ok(if sizes.is_tracked() { sizes.total() } else { u64::try_from(self.stock).unwrap_or(0) })
    }

    /// Stock that a cart line for `size` may draw on.
    pub fn available_stock(&self, size: Option<&str>) -> Result<u64, SizeStockError> {
        let sizes = self.size_stock()?;
        match size {
            Some(size) if sizes.is_tracked() => Ok(u64::from(sizes.for_size(size))),
            _ => self.total_stock(),
        }
    }

    pub fn color_options(&self) -> Vec<String> { split_tags(self.colors.as_deref()) }
    pub fn requires_color(&self) -> bool { !self.color_options().is_empty() }

    pub fn view(&self) -> Result<ProductView, SizeStockError> {
        let size_stock = self.size_stock()?;
        let total_stock = if size_stock.is_tracked() { size_stock.total() } else { u64::try_from(self.stock).unwrap_or(0) };
        Ok(ProductView {
            id: self.id,
            category_id: self.category_id,
            name: self.name.clone(),
            slug: self.slug.clone(),
            description: self.description.clone(),
            short_description: self.short_description.clone().or_else(|| Some(excerpt(&self.description, 50))),
            price: self.price,
            old_price: self.old_price,
            brand: self.brand.clone(),
            image: self.image.clone(),
            images: split_tags(self.images.as_deref()),
            stock: total_stock,
            stock_sizes: size_stock,
            sizes: split_tags(self.sizes.as_deref()),
            colors: self.color_options(),
            is_featured: self.is_featured,
            is_new: self.is_new,
            rating: self.rating,
            review_count: self.review_count,
            created_at: self.created_at,
        })
    }
}

/// Public projection of a product.
#[derive(Clone, Debug, Serialize)]
pub struct ProductView {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub short_description: Option<String>,
    pub price: Decimal,
    pub old_price: Option<Decimal>,
    pub brand: Option<String>,
    pub image: Option<String>,
    pub images: Vec<String>,
    pub stock: u64,
    pub stock_sizes: SizeStock,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub is_featured: bool,
    pub is_new: bool,
    pub rating: Decimal,
    pub review_count: i32,
    pub created_at: DateTime<Utc>,
}

fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars { return text.to_string(); }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}...")
}

/// Validated admin input for creating or replacing a product.
#[derive(Clone, Debug)]
pub struct ProductDraft {
    pub category_id: Uuid,
    pub name: String,
    pub description: String,
    pub short_description: Option<String>,
    pub price: Decimal,
    pub old_price: Option<Decimal>,
    pub brand: Option<String>,
    pub image_urls: Vec<String>,
    pub stock: i32,
    pub size_stock: SizeStock,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub is_new: bool,
}

impl ProductDraft {
    pub fn validate(&self) -> Result<(), ProductError> {
        if self.name.trim().is_empty() { return Err(ProductError::MissingName); }
        if self.price <= Decimal::ZERO { return Err(ProductError::InvalidPrice); }
        if matches!(self.old_price, Some(p) if p <= Decimal::ZERO) { return Err(ProductError::InvalidPrice); }
        if self.stock < 0 { return Err(ProductError::NegativeStock); }
        if let Some(url) = self.image_urls.iter().find(|u| !(u.starts_with("http://") || u.starts_with("https://"))) {
            return Err(ProductError::InvalidImageUrl(url.clone()));
        }
        Ok(())
    }

    pub fn main_image(&self) -> Option<&str> { self.image_urls.first().map(String::as_str) }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductError { MissingName, InvalidPrice, NegativeStock, InvalidImageUrl(String) }
impl std::error::Error for ProductError {}
impl std::fmt::Display for ProductError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingName => write!(f, "Product name is required"),
            Self::InvalidPrice => write!(f, "Price must be greater than zero"),
            Self::NegativeStock => write!(f, "Stock cannot be negative"),
            Self::InvalidImageUrl(url) => write!(f, "Image links must start with http:// or https://: {url}"),
        }
    }
}
