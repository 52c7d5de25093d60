//! Payment gateway adapters.
//!
//! Gateways are polymorphic over a small capability set: build a signed
//! order-creation request, verify an inbound signed callback, and issue a
//! refund. The adapter knows nothing about the booking domain beyond the
//! fields it needs to route a callback back to a booking: the correlation
//! id carries the human-facing booking code.

pub mod mock;
pub mod signature;
pub mod wallet;

pub use mock::{MockGateway, RefundBehavior};
pub use wallet::WalletGateway;

use crate::types::Money;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Gateway-side failure.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Callback signature did not verify
    #[error("callback signature mismatch")]
    Signature,

    /// Callback payload could not be parsed or is missing required fields
    #[error("malformed callback payload: {0}")]
    MalformedPayload(String),

    /// Gateway answered the refund request with a non-success code
    #[error("refund rejected by gateway (code {code}): {message}")]
    RefundRejected {
        /// Gateway return code
        code: i64,
        /// Gateway message
        message: String,
    },

    /// Transport failure talking to the gateway
    #[error("gateway transport error: {0}")]
    Transport(String),
}

/// Everything the adapter needs to build an order-creation request.
#[derive(Clone, Debug)]
pub struct OrderIntent {
    /// Human-facing booking code embedded in the correlation id
    pub booking_code: String,
    /// Amount in minor units
    pub amount: Money,
    /// Opaque user reference forwarded to the gateway
    pub app_user: String,
    /// Current instant (correlation id prefix and request timestamp)
    pub now: DateTime<Utc>,
}

/// Signed outbound order-creation request, ready for the gateway.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Merchant/application id
    pub app_id: String,
    /// Correlation id: `<yymmdd>_<bookingCode>`
    pub app_trans_id: String,
    /// User reference
    pub app_user: String,
    /// Amount in minor units
    pub amount: u64,
    /// Request timestamp in epoch milliseconds
    pub app_time: i64,
    /// Merchant-defined embedded data (echoed back in the callback)
    pub embed_data: String,
    /// URL the gateway will call back with the payment outcome
    pub callback_url: String,
    /// HMAC-SHA256 over the canonical field string, create-key
    pub mac: String,
}

/// Inbound callback envelope: opaque payload plus its mac.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CallbackEnvelope {
    /// Raw payload; the mac is computed over these exact bytes
    pub data: String,
    /// Hex HMAC-SHA256 of `data` under the verify-key
    pub mac: String,
}

/// Verified, parsed callback.
#[derive(Clone, Debug)]
pub struct CallbackEvent {
    /// Correlation id from the payload (`<yymmdd>_<bookingCode>`)
    pub app_trans_id: String,
    /// Gateway-side transaction id
    pub transaction_id: String,
    /// Amount the gateway reports as paid, minor units
    pub amount: Money,
    /// Whether the gateway reports the payment as successful
    pub success: bool,
    /// Instant the gateway reports for the payment
    pub paid_at: Option<DateTime<Utc>>,
    /// The payload parsed as JSON, kept verbatim
    pub raw: serde_json::Value,
}

/// Refund request parameters.
#[derive(Clone, Debug)]
pub struct RefundIntent {
    /// Gateway transaction id of the original payment
    pub transaction_id: String,
    /// Full amount to refund, minor units
    pub amount: Money,
    /// Operator-supplied reason
    pub description: String,
    /// Current instant (request timestamp)
    pub now: DateTime<Utc>,
}

/// Gateway acknowledgement of a refund.
#[derive(Clone, Debug)]
pub struct RefundReceipt {
    /// Gateway-side refund id
    pub refund_id: String,
}

/// Payment gateway capability set.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Gateway name as it appears in payment records and callback routes
    fn name(&self) -> &'static str;

    /// Whether canceling a confirmed booking paid through this gateway
    /// requires an explicit refund call
    fn requires_refund(&self) -> bool;

    /// Build a signed order-creation request.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Signature`] if signing fails.
    fn create_order(&self, intent: &OrderIntent) -> Result<OrderRequest, GatewayError>;

    /// Verify an inbound callback and parse it.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Signature`] on mac mismatch,
    /// [`GatewayError::MalformedPayload`] on missing or unparsable fields.
    /// Unknown extra fields are tolerated.
    fn verify_callback(&self, envelope: &CallbackEnvelope) -> Result<CallbackEvent, GatewayError>;

    /// Issue a refund for a previously confirmed payment.
    ///
    /// # Errors
    ///
    /// [`GatewayError::RefundRejected`] when the gateway answers with a
    /// non-success code, [`GatewayError::Transport`] on wire failures.
    async fn refund(&self, intent: &RefundIntent) -> Result<RefundReceipt, GatewayError>;
}

/// Correlation id for a booking code at `now`: `<yymmdd>_<code>`.
#[must_use]
pub fn correlation_id(booking_code: &str, now: DateTime<Utc>) -> String {
    format!("{}_{booking_code}", now.format("%y%m%d"))
}

/// Extract the booking code from a correlation id.
///
/// The date prefix is informational only; resolution goes through the code
/// so clock skew between us and the gateway cannot orphan a callback.
#[must_use]
pub fn booking_code_from_correlation(app_trans_id: &str) -> Option<&str> {
    let (prefix, code) = app_trans_id.split_once('_')?;
    if prefix.is_empty() || code.is_empty() {
        return None;
    }
    Some(code)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn correlation_id_round_trips() {
        let now = Utc::now();
        let id = correlation_id("AB12CD34", now);
        assert_eq!(booking_code_from_correlation(&id), Some("AB12CD34"));
    }

    #[test]
    fn malformed_correlation_ids_are_rejected() {
        assert_eq!(booking_code_from_correlation("no-separator"), None);
        assert_eq!(booking_code_from_correlation("_code"), None);
        assert_eq!(booking_code_from_correlation("250101_"), None);
    }
}
