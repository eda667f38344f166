//! In-memory gateway with scriptable intent statuses, used by tests and local runs.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{GatewayError, IntentStatus, PaymentGateway, PaymentIntent};

#[derive(Default)]
pub struct SandboxGateway {
    intents: Mutex<HashMap<String, PaymentIntent>>,
    sequence: AtomicU64,
    unreachable: AtomicBool,
}

impl SandboxGateway {
    pub fn new() -> Self { Self::default() }

    /// Marks an intent as paid, the way a client-side card confirmation would.
    pub fn confirm(&self, id: &str) -> bool { self.set_status(id, IntentStatus::Succeeded) }

    pub fn set_status(&self, id: &str, status: IntentStatus) -> bool {
        let mut intents = self.intents.lock().unwrap_or_else(|e| e.into_inner());
        match intents.get_mut(id) {
            Some(intent) => {
                intent.status = status;
                if status == IntentStatus::Succeeded && intent.payment_method.is_none() {
                    intent.payment_method = Some(format!("pm_sandbox_{id}"));
                }
                true
            }
            None => false,
        }
    }

    /// Inserts or replaces an intent verbatim.
    pub fn insert(&self, intent: PaymentIntent) {
        self.intents.lock().unwrap_or_else(|e| e.into_inner()).insert(intent.id.clone(), intent);
    }

    pub fn set_unreachable(&self, unreachable: bool) { self.unreachable.store(unreachable, Ordering::SeqCst); }

    fn check_reachable(&self) -> Result<(), GatewayError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(GatewayError::Transport("sandbox gateway is offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for SandboxGateway {
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<PaymentIntent, GatewayError> {
        self.check_reachable()?;
        let n = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("pi_sandbox_{n}");
        let intent = PaymentIntent {
            client_secret: Some(format!("{id}_secret")),
            id,
            amount: amount_minor,
            currency: currency.to_string(),
            status: IntentStatus::RequiresPaymentMethod,
            payment_method: None,
            metadata,
        };
        self.insert(intent.clone());
        Ok(intent)
    }

    async fn retrieve_intent(&self, id: &str) -> Result<PaymentIntent, GatewayError> {
        self.check_reachable()?;
        self.intents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::Rejected { status: 404, message: format!("No such payment_intent: '{id}'") })
    }
}
