use axum::extract::State;
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ok, ApiPath, ApiQuery, Envelope};
use crate::domain::aggregates::ProductView;
use crate::domain::value_objects::split_tags;
use crate::services::catalog::{self, ProductDetail};
use crate::store::catalog::{ProductFilter, ProductSort};
use crate::store::{PageRequest, Paginated};
use crate::{AppState, StorefrontError};

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    /// Comma-separated category slugs.
    pub categories: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub featured: Option<bool>,
    pub new: Option<bool>,
    pub sort: Option<ProductSort>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ProductQuery {
    pub fn filter(&self) -> ProductFilter {
        let mut categories = split_tags(self.categories.as_deref());
        if let Some(single) = self.category.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            if !categories.iter().any(|c| c == single) { categories.push(single.to_string()); }
        }
        ProductFilter {
            categories,
            search: self.search.clone(),
            min_price: self.min_price,
            max_price: self.max_price,
            featured: self.featured,
            is_new: self.new,
            sort: self.sort.unwrap_or_default(),
        }
    }

    pub fn page(&self) -> PageRequest { PageRequest::new(self.page, self.per_page) }
}

pub async fn list_products(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> Result<Json<Envelope<Paginated<ProductView>>>, StorefrontError> {
    Ok(ok(catalog::list_products(&state, &query.filter(), query.page()).await?))
}

pub async fn product_detail(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> Result<Json<Envelope<ProductDetail>>, StorefrontError> {
    Ok(ok(catalog::product_detail(&state, &slug).await?))
}

pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Envelope<Value>>, StorefrontError> {
    let categories = catalog::list_categories(&state).await?;
    Ok(ok(json!({ "categories": categories })))
}
