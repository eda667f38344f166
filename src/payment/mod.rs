//! Card payment gateway boundary.
//!
//! Checkout only needs two calls from the provider: create an intent for an
//! amount and later read it back to confirm it succeeded.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod sandbox;
pub mod stripe;

pub use sandbox::SandboxGateway;
pub use stripe::StripeGateway;

pub const META_CART_ID: &str = "cart_id";
pub const META_USER_ID: &str = "user_id";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    /// Amount in minor units.
    pub amount: i64,
    pub currency: String,
    pub status: IntentStatus,
    pub payment_method: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl PaymentIntent {
    pub fn succeeded(&self) -> bool { self.status == IntentStatus::Succeeded }
    pub fn metadata(&self, key: &str) -> Option<&str> { self.metadata.get(key).map(String::as_str) }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("payment gateway unreachable: {0}")]
    Transport(String),
    #[error("payment gateway rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("unexpected payment gateway response: {0}")]
    Decode(String),
    #[error("payment gateway timed out")]
    Timeout,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<PaymentIntent, GatewayError>;

    async fn retrieve_intent(&self, id: &str) -> Result<PaymentIntent, GatewayError>;
}

/// Bounds a gateway call; an elapsed deadline is a [`GatewayError::Timeout`].
pub async fn with_timeout<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, GatewayError>>,
) -> Result<T, GatewayError> {
    tokio::time::timeout(limit, call).await.unwrap_or(Err(GatewayError::Timeout))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_timeout_maps_to_gateway_error() {
        let slow = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, GatewayError>(())
        };
        assert!(matches!(with_timeout(Duration::from_millis(10), slow).await, Err(GatewayError::Timeout)));
        assert!(with_timeout(Duration::from_secs(1), async { Ok::<_, GatewayError>(1) }).await.is_ok());
    }

    #[test]
    fn test_unknown_status_is_tolerated() {
        let status: IntentStatus = serde_json::from_str("\"something_new\"").unwrap();
        assert_eq!(status, IntentStatus::Unknown);
        let status: IntentStatus = serde_json::from_str("\"succeeded\"").unwrap();
        assert_eq!(status, IntentStatus::Succeeded);
    }
}
