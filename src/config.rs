//! Process configuration, read once from the environment at startup.

use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::aggregates::ShippingPolicy;

pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub secret_key: String,
    pub api_base: String,
    pub currency: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub port: u16,
    pub payment: PaymentConfig,
    pub shipping: ShippingPolicy,
    pub session_secret: String,
    pub nats_url: Option<String>,
}

impl AppConfig {
    /// Configuration with every optional setting at its default.
    pub fn with_defaults(
        database_url: impl Into<String>,
        stripe_secret_key: impl Into<String>,
        session_secret: impl Into<String>,
    ) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 10,
            port: 8083,
            payment: PaymentConfig {
                secret_key: stripe_secret_key.into(),
                api_base: DEFAULT_STRIPE_API_BASE.to_string(),
                currency: "brl".to_string(),
                timeout: Duration::from_secs(10),
            },
            shipping: ShippingPolicy::default(),
            session_secret: session_secret.into(),
            nats_url: None,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| {
            lookup(key).filter(|v| !v.trim().is_empty()).ok_or(ConfigError::Missing(key))
        };
        let mut config = Self::with_defaults(
            required("DATABASE_URL")?,
            required("STRIPE_SECRET_KEY")?,
            required("SESSION_SECRET")?,
        );

        if let Some(v) = parsed::<u32>(&lookup, "DATABASE_MAX_CONNECTIONS")? { config.max_connections = v; }
        if let Some(v) = parsed::<u16>(&lookup, "PORT")? { config.port = v; }
        if let Some(v) = lookup("STRIPE_API_BASE") { config.payment.api_base = v.trim_end_matches('/').to_string(); }
        if let Some(v) = lookup("PAYMENT_CURRENCY") { config.payment.currency = v.to_lowercase(); }
        if let Some(v) = parsed::<u64>(&lookup, "PAYMENT_TIMEOUT_SECS")? { config.payment.timeout = Duration::from_secs(v); }
        if let Some(v) = parsed::<Decimal>(&lookup, "SHIPPING_FEE")? { config.shipping.fee = v; }
        if let Some(v) = parsed::<Decimal>(&lookup, "FREE_SHIPPING_THRESHOLD")? { config.shipping.free_threshold = v; }
        config.nats_url = lookup("NATS_URL").filter(|v| !v.trim().is_empty());

        if config.shipping.fee.is_sign_negative() {
            return Err(ConfigError::Invalid { key: "SHIPPING_FEE", value: config.shipping.fee.to_string() });
        }
        if config.payment.timeout.is_zero() {
            return Err(ConfigError::Invalid { key: "PAYMENT_TIMEOUT_SECS", value: "0".into() });
        }
        Ok(config)
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}
