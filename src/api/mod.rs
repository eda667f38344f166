//! HTTP surface: routing, the `{success, ...}` envelope and error mapping.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use validator::Validate;

use crate::{AppState, StorefrontError};

mod admin;
mod cart;
mod catalog;
mod checkout;
mod orders;
mod reviews;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/cart", get(cart::get_cart))
        .route("/cart/items", post(cart::add_item))
        .route("/cart/items/:id", put(cart::update_item).delete(cart::remove_item))
        .route("/checkout/payment-intent", post(checkout::create_payment_intent))
        .route("/checkout", post(checkout::finalize))
        .route("/orders", get(orders::list_orders))
        .route("/orders/:id", get(orders::get_order))
        .route("/products", get(catalog::list_products))
        .route("/products/:product", get(catalog::product_detail))
        .route("/products/:product/reviews", get(reviews::product_reviews))
        .route("/categories", get(catalog::list_categories))
        .route("/reviews", post(reviews::submit))
        .route("/reviews/:id", put(reviews::edit).delete(reviews::delete))
        .route("/reviews/:id/moderate", put(reviews::moderate))
        .route("/reviews/:id/helpful", post(reviews::mark_helpful))
        .route("/users/:id/reviews", get(reviews::user_reviews))
        .route("/site-reviews", get(reviews::site_reviews).post(reviews::submit_site_review))
        .route("/admin/categories", post(admin::create_category))
        .route("/admin/categories/:id", put(admin::update_category).delete(admin::delete_category))
        .route("/admin/products", post(admin::create_product))
        .route("/admin/products/:id", put(admin::update_product).delete(admin::delete_product))
        .route("/admin/orders", get(admin::list_orders))
        .route("/admin/orders/:id/status", put(admin::change_order_status));

    Router::new()
        .route("/health", get(health))
        .route("/health/db", get(db_health))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"success": true, "status": "healthy", "service": "storefront"}))
}

async fn db_health(State(state): State<AppState>) -> Result<Json<serde_json::Value>, StorefrontError> {
    sqlx::query("SELECT 1").execute(&state.db).await?;
    Ok(Json(json!({"success": true, "status": "healthy", "database": "reachable"})))
}

// =============================================================================
// Envelope
// =============================================================================

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    success: bool,
    #[serde(flatten)]
    payload: T,
}

pub fn ok<T: Serialize>(payload: T) -> Json<Envelope<T>> { Json(Envelope { success: true, payload }) }

pub fn created<T: Serialize>(payload: T) -> (StatusCode, Json<Envelope<T>>) { (StatusCode::CREATED, ok(payload)) }

impl IntoResponse for StorefrontError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) | Self::Business(_) | Self::Stock { .. } => StatusCode::BAD_REQUEST,
            Self::Auth(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Payment(_) => StatusCode::PAYMENT_REQUIRED,
            Self::DataCorruption(_) | Self::Database(_) | Self::Serialization(_) | Self::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let mut body = json!({"success": false, "error": message});
        if let Self::Stock { remaining } = self {
            body["remaining"] = json!(remaining);
        }
        (status, Json(body)).into_response()
    }
}

// =============================================================================
// Extractors
// =============================================================================

/// JSON body whose rejections come back in the error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(StorefrontError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(StorefrontError))]
pub struct ApiPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(StorefrontError))]
pub struct ApiQuery<T>(pub T);

impl From<JsonRejection> for StorefrontError {
    fn from(rejection: JsonRejection) -> Self { Self::Validation(format!("Invalid request body: {}", rejection.body_text())) }
}

impl From<PathRejection> for StorefrontError {
    fn from(rejection: PathRejection) -> Self { Self::Validation(format!("Invalid path: {}", rejection.body_text())) }
}

impl From<QueryRejection> for StorefrontError {
    fn from(rejection: QueryRejection) -> Self { Self::Validation(format!("Invalid query: {}", rejection.body_text())) }
}

/// Runs the derive validators on a request body.
pub fn validated<T: Validate>(value: T) -> Result<T, StorefrontError> {
    value.validate().map_err(|errors| {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let detail = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| "is invalid".to_string());
                format!("{field}: {detail}")
            })
            .collect();
        fields.sort();
        StorefrontError::Validation(fields.join("; "))
    })?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1, message = "must not be empty"))]
        name: String,
        #[validate(range(min = 1))]
        quantity: i32,
    }

    #[test]
    fn test_validation_message_lists_fields() {
        let err = validated(Sample { name: String::new(), quantity: 0 }).err().unwrap();
        assert_eq!(err.to_string(), "name: must not be empty; quantity: is invalid");
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (StorefrontError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (StorefrontError::Stock { remaining: 0 }, StatusCode::BAD_REQUEST),
            (StorefrontError::Auth("x".into()), StatusCode::FORBIDDEN),
            (StorefrontError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (StorefrontError::Payment("x".into()), StatusCode::PAYMENT_REQUIRED),
            (StorefrontError::DataCorruption("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
