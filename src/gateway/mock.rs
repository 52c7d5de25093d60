//! Mock payment gateway for development and testing.
//!
//! Signs and verifies exactly like the wallet gateway (same canonical
//! strings, same keys from its settings) but answers refunds in-process,
//! so cancellation paths can be exercised without network access.

use super::{
    CallbackEnvelope, CallbackEvent, GatewayError, OrderIntent, OrderRequest, PaymentGateway,
    RefundIntent, RefundReceipt, WalletGateway,
};
use crate::config::GatewaySettings;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// How the mock answers refund requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefundBehavior {
    /// Every refund succeeds
    Succeed,
    /// Every refund is rejected by the "gateway"
    Reject,
}

/// In-process gateway: wallet signing semantics, scripted refunds.
pub struct MockGateway {
    inner: WalletGateway,
    behavior: RefundBehavior,
    refund_count: AtomicUsize,
    refunds: Mutex<Vec<RefundIntent>>,
}

impl MockGateway {
    /// Create a mock with the given settings and refund behavior
    #[must_use]
    pub fn new(settings: GatewaySettings, behavior: RefundBehavior) -> Self {
        Self {
            inner: WalletGateway::new(settings),
            behavior,
            refund_count: AtomicUsize::new(0),
            refunds: Mutex::new(Vec::new()),
        }
    }

    /// Creates an Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared(settings: GatewaySettings, behavior: RefundBehavior) -> Arc<Self> {
        Arc::new(Self::new(settings, behavior))
    }

    /// Number of refund calls received
    #[must_use]
    pub fn refund_calls(&self) -> usize {
        self.refund_count.load(Ordering::SeqCst)
    }

    /// Refund intents received so far
    #[must_use]
    pub fn recorded_refunds(&self) -> Vec<RefundIntent> {
        self.refunds.lock().map_or_else(|_| Vec::new(), |g| g.clone())
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    fn name(&self) -> &'static str {
        WalletGateway::NAME
    }

    fn requires_refund(&self) -> bool {
        true
    }

    fn create_order(&self, intent: &OrderIntent) -> Result<OrderRequest, GatewayError> {
        self.inner.create_order(intent)
    }

    fn verify_callback(&self, envelope: &CallbackEnvelope) -> Result<CallbackEvent, GatewayError> {
        self.inner.verify_callback(envelope)
    }

    async fn refund(&self, intent: &RefundIntent) -> Result<RefundReceipt, GatewayError> {
        self.refund_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut refunds) = self.refunds.lock() {
            refunds.push(intent.clone());
        }
        match self.behavior {
            RefundBehavior::Succeed => {
                let refund_id = format!("mock_refund_{}", uuid::Uuid::new_v4());
                tracing::info!(
                    transaction_id = %intent.transaction_id,
                    amount = %intent.amount,
                    refund_id = %refund_id,
                    "mock refund processed"
                );
                Ok(RefundReceipt { refund_id })
            }
            RefundBehavior::Reject => Err(GatewayError::RefundRejected {
                code: -1,
                message: "scripted rejection".to_string(),
            }),
        }
    }
}
