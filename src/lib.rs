//! Storefront service
//!
//! Catalog browsing, carts, card checkout and product reviews over PostgreSQL.
//!
//! ## Features
//! - Product catalog with flat or per-size stock
//! - Visitor carts (user or anonymous session) with stock-aware line items
//! - Checkout gated on an external payment confirmation
//! - Product reviews with cached rating aggregates and helpful votes
//! - Site testimonials and an admin surface for catalog, orders and moderation

use std::sync::Arc;

use thiserror::Error;

pub mod api;
pub mod config;
pub mod domain;
pub mod identity;
pub mod payment;
pub mod services;
pub mod store;

use crate::config::{AppConfig, ConfigError};
use crate::domain::aggregates::{CartError, OrderError, ProductError, ReviewError};
use crate::domain::events::EventPublisher;
use crate::domain::value_objects::{RatingError, SizeStockError};
use crate::identity::SessionTokens;
use crate::payment::PaymentGateway;

// =============================================================================
// Shared state
// =============================================================================

/// Everything a request handler needs, cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<AppConfig>,
    pub payments: Arc<dyn PaymentGateway>,
    pub events: EventPublisher,
    pub sessions: SessionTokens,
}

impl AppState {
    pub fn new(
        db: sqlx::PgPool,
        config: AppConfig,
        payments: Arc<dyn PaymentGateway>,
        events: EventPublisher,
    ) -> Self {
        let sessions = SessionTokens::new(&config.session_secret);
        Self { db, config: Arc::new(config), payments, events, sessions }
    }
}

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    Business(String),

    #[error("Insufficient stock. Available: {remaining} units")]
    Stock { remaining: i64 },

    #[error("{0}")]
    Payment(String),

    #[error("Corrupted data: {0}")]
    DataCorruption(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, StorefrontError>;

impl From<CartError> for StorefrontError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::InvalidQuantity => Self::Validation(e.to_string()),
            CartError::ColorRequired => Self::Validation(e.to_string()),
            CartError::InsufficientStock { remaining } => Self::Stock { remaining },
            CartError::ItemNotFound => Self::NotFound(e.to_string()),
            CartError::Stock(inner) => Self::DataCorruption(inner.to_string()),
        }
    }
}

impl From<OrderError> for StorefrontError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::NoItems => Self::Business(e.to_string()),
            OrderError::InvalidTransition { .. } | OrderError::InvalidPaymentTransition { .. } | OrderError::CannotRefund => {
                Self::Business(e.to_string())
            }
        }
    }
}

impl From<ReviewError> for StorefrontError {
    fn from(e: ReviewError) -> Self { Self::Auth(e.to_string()) }
}

impl From<ProductError> for StorefrontError {
    fn from(e: ProductError) -> Self { Self::Validation(e.to_string()) }
}

impl From<RatingError> for StorefrontError {
    fn from(e: RatingError) -> Self { Self::Validation(e.to_string()) }
}

impl From<SizeStockError> for StorefrontError {
    fn from(e: SizeStockError) -> Self { Self::DataCorruption(e.to_string()) }
}
