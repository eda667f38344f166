//! Stripe PaymentIntents over the REST API.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{GatewayError, IntentStatus, PaymentGateway, PaymentIntent};
use crate::config::PaymentConfig;

#[derive(Clone)]
pub struct StripeGateway {
    agent: ureq::Agent,
    api_base: String,
    secret_key: String,
}

#[derive(Deserialize)]
struct StripeIntent {
    id: String,
    client_secret: Option<String>,
    amount: i64,
    currency: String,
    status: IntentStatus,
    payment_method: Option<String>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct StripeErrorBody { error: StripeErrorDetail }
#[derive(Deserialize)]
struct StripeErrorDetail { message: Option<String> }

impl From<StripeIntent> for PaymentIntent {
    fn from(i: StripeIntent) -> Self {
        Self {
            id: i.id, client_secret: i.client_secret, amount: i.amount, currency: i.currency,
            status: i.status, payment_method: i.payment_method, metadata: i.metadata,
        }
    }
}

impl StripeGateway {
    pub fn new(config: &PaymentConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout)
            .timeout_connect(Duration::from_secs(5).min(config.timeout))
            .build();
        Self { agent, api_base: config.api_base.clone(), secret_key: config.secret_key.clone() }
    }

    fn url(&self, path: &str) -> String { format!("{}/v1/payment_intents{path}", self.api_base) }

    async fn call<F>(&self, request: F) -> Result<PaymentIntent, GatewayError>
    where
        F: FnOnce(&ureq::Agent, &str) -> Result<ureq::Response, ureq::Error> + Send + 'static,
    {
        let agent = self.agent.clone();
        let auth = format!("Bearer {}", self.secret_key);
        tokio::task::spawn_blocking(move || {
            let response = request(&agent, &auth).map_err(map_error)?;
            response.into_json::<StripeIntent>().map(PaymentIntent::from).map_err(|e| GatewayError::Decode(e.to_string()))
        })
        .await
        .map_err(|e| GatewayError::Transport(e.to_string()))?
    }
}

fn map_error(e: ureq::Error) -> GatewayError {
    match e {
        ureq::Error::Status(status, response) => {
            let message = response
                .into_json::<StripeErrorBody>()
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or_else(|| "no error message".to_string());
            GatewayError::Rejected { status, message }
        }
        ureq::Error::Transport(t) => GatewayError::Transport(t.to_string()),
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<PaymentIntent, GatewayError> {
        let url = self.url("");
        let mut form = vec![("amount".to_string(), amount_minor.to_string()), ("currency".to_string(), currency.to_string())];
        form.extend(metadata.into_iter().map(|(k, v)| (format!("metadata[{k}]"), v)));

        self.call(move |agent, auth| {
            let pairs: Vec<(&str, &str)> = form.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
            agent.post(&url).set("Authorization", auth).send_form(&pairs)
        })
        .await
    }

    async fn retrieve_intent(&self, id: &str) -> Result<PaymentIntent, GatewayError> {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(GatewayError::Rejected { status: 404, message: "unknown payment intent".into() });
        }
        let url = self.url(&format!("/{id}"));
        self.call(move |agent, auth| agent.get(&url).set("Authorization", auth).call()).await
    }
}
