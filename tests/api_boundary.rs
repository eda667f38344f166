//! Router-level checks that are decided before any query runs, so the pool is
//! lazy and never connects.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use uuid::Uuid;

use storefront::config::AppConfig;
use storefront::domain::events::EventPublisher;
use storefront::identity::{USER_ID_HEADER, USER_ROLE_HEADER};
use storefront::payment::SandboxGateway;
use storefront::{api, AppState};

fn app() -> Router {
    let config = AppConfig::with_defaults("postgres://localhost/storefront_unused", "sk_test_unused", "test-secret");
    let pool = PgPoolOptions::new().connect_lazy(&config.database_url).unwrap();
    api::router(AppState::new(pool, config, Arc::new(SandboxGateway::new()), EventPublisher::disabled()))
}

fn request(method: &str, uri: &str, user: Option<(Uuid, &str)>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, role)) = user {
        builder = builder.header(USER_ID_HEADER, id.to_string()).header(USER_ROLE_HEADER, role);
    }
    match body {
        Some(body) => builder.header("content-type", "application/json").body(Body::from(body.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(req: Request<Body>) -> (StatusCode, Value) {
    let response = app().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn customer() -> Option<(Uuid, &'static str)> { Some((Uuid::new_v4(), "customer")) }

#[tokio::test]
async fn test_health() {
    let (status, body) = send(request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_moderation_requires_admin() {
    let uri = format!("/api/v1/reviews/{}/moderate", Uuid::new_v4());
    let (status, body) = send(request("PUT", &uri, customer(), Some(json!({"is_approved": false})))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_admin_product_create_requires_admin() {
    let product = json!({"category_id": Uuid::new_v4(), "name": "Boné", "price": "59.90"});
    let (status, _) = send(request("POST", "/api/v1/admin/products", customer(), Some(product))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_review_rating_out_of_range() {
    let review = json!({"product_id": Uuid::new_v4(), "rating": 6, "comment": "Excelente"});
    let (status, body) = send(request("POST", "/api/v1/reviews", customer(), Some(review))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_checkout_requires_user() {
    let (status, _) = send(request("POST", "/api/v1/checkout/payment-intent", None, None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_checkout_requires_payment_id() {
    let body = json!({"payment_intent_id": "  ", "shipping": {"name": "Ana"}});
    let (status, body) = send(request("POST", "/api/v1/checkout", customer(), Some(body))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Payment id is required");
}

#[tokio::test]
async fn test_malformed_json_uses_error_envelope() {
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/cart/items")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_invalid_path_id() {
    let (status, body) = send(request("GET", "/api/v1/orders/not-a-uuid", customer(), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_add_item_rejects_zero_quantity() {
    let item = json!({"product_id": Uuid::new_v4(), "quantity": 0});
    let (status, body) = send(request("POST", "/api/v1/cart/items", None, Some(item))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "quantity: must be at least 1");
}

#[tokio::test]
async fn test_add_item_rejects_oversized_variant_labels() {
    let item = json!({"product_id": Uuid::new_v4(), "size": "x".repeat(25)});
    let (status, body) = send(request("POST", "/api/v1/cart/items", None, Some(item))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "size: must be at most 20 characters");

    let item = json!({"product_id": Uuid::new_v4(), "size": "M", "color": "c".repeat(51)});
    let (status, body) = send(request("POST", "/api/v1/cart/items", None, Some(item))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "color: must be at most 50 characters");
}

#[tokio::test]
async fn test_invalid_user_header() {
    let req = Request::builder().uri("/api/v1/orders").header(USER_ID_HEADER, "nobody").body(Body::empty()).unwrap();
    let (status, _) = send(req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_product_listing_rejects_bad_filters() {
    let (status, _) = send(request("GET", "/api/v1/products?sort=cheapest", None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(request("GET", "/api/v1/products?min_price=100&max_price=10", None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "min_price cannot exceed max_price");
}

#[tokio::test]
async fn test_anonymous_site_review_needs_name() {
    let review = json!({"rating": 5, "comment": "Entrega rápida"});
    let (status, _) = send(request("POST", "/api/v1/site-reviews", None, Some(review))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
