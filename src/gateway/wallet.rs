//! Deferred-confirmation wallet gateway.
//!
//! The wallet confirms payments asynchronously: we send a signed order,
//! the customer pays in their wallet app, and the gateway calls our IPN
//! endpoint with a signed payload. Two separate secrets are in play: the
//! create-key signs everything we send (orders, refunds), the verify-key
//! authenticates everything the gateway sends us.

use super::{
    signature, CallbackEnvelope, CallbackEvent, GatewayError, OrderIntent, OrderRequest,
    PaymentGateway, RefundIntent, RefundReceipt,
};
use crate::config::GatewaySettings;
use crate::types::Money;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use std::sync::Arc;

/// Callback payload fields we consume; everything else is tolerated and
/// preserved in the raw payload.
#[derive(Debug, Deserialize)]
struct CallbackData {
    app_trans_id: String,
    trans_id: String,
    amount: u64,
    status: i64,
    #[serde(default)]
    server_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RefundResponse {
    return_code: i64,
    #[serde(default)]
    return_message: String,
    #[serde(default)]
    refund_id: Option<i64>,
}

/// Production wallet gateway adapter.
pub struct WalletGateway {
    settings: GatewaySettings,
    client: reqwest::Client,
}

impl WalletGateway {
    /// Gateway name used in routes and payment records
    pub const NAME: &'static str = "wallet";

    /// Create an adapter with the given settings
    #[must_use]
    pub fn new(settings: GatewaySettings) -> Self {
        Self {
            settings,
            client: reqwest::Client::new(),
        }
    }

    /// Creates an Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared(settings: GatewaySettings) -> Arc<dyn PaymentGateway> {
        Arc::new(Self::new(settings))
    }
}

#[async_trait]
impl PaymentGateway for WalletGateway {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn requires_refund(&self) -> bool {
        true
    }

    fn create_order(&self, intent: &OrderIntent) -> Result<OrderRequest, GatewayError> {
        let app_trans_id = super::correlation_id(&intent.booking_code, intent.now);
        let app_time = intent.now.timestamp_millis();
        let embed_data = "{}".to_string();
        let canonical = format!(
            "{}|{}|{}|{}|{}|{}",
            self.settings.app_id,
            app_trans_id,
            intent.app_user,
            intent.amount.minor(),
            app_time,
            embed_data,
        );
        let mac = signature::sign(&self.settings.create_key, canonical.as_bytes())?;
        Ok(OrderRequest {
            app_id: self.settings.app_id.clone(),
            app_trans_id,
            app_user: intent.app_user.clone(),
            amount: intent.amount.minor(),
            app_time,
            embed_data,
            callback_url: self.settings.callback_url.clone(),
            mac,
        })
    }

    fn verify_callback(&self, envelope: &CallbackEnvelope) -> Result<CallbackEvent, GatewayError> {
        if !signature::verify(&self.settings.verify_key, envelope.data.as_bytes(), &envelope.mac) {
            return Err(GatewayError::Signature);
        }

        let raw: serde_json::Value = serde_json::from_str(&envelope.data)
            .map_err(|e| GatewayError::MalformedPayload(e.to_string()))?;
        let data: CallbackData = serde_json::from_value(raw.clone())
            .map_err(|e| GatewayError::MalformedPayload(e.to_string()))?;

        let paid_at = data
            .server_time
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single());

        Ok(CallbackEvent {
            app_trans_id: data.app_trans_id,
            transaction_id: data.trans_id,
            amount: Money::from_minor(data.amount),
            success: data.status == 1,
            paid_at,
            raw,
        })
    }

    async fn refund(&self, intent: &RefundIntent) -> Result<RefundReceipt, GatewayError> {
        let timestamp = intent.now.timestamp_millis();
        let canonical = format!(
            "{}|{}|{}|{}|{}",
            self.settings.app_id,
            intent.transaction_id,
            intent.amount.minor(),
            intent.description,
            timestamp,
        );
        let mac = signature::sign(&self.settings.create_key, canonical.as_bytes())?;

        let body = serde_json::json!({
            "app_id": self.settings.app_id,
            "zp_trans_id": intent.transaction_id,
            "amount": intent.amount.minor(),
            "description": intent.description,
            "timestamp": timestamp,
            "mac": mac,
        });

        let response = self
            .client
            .post(&self.settings.refund_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let parsed: RefundResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if parsed.return_code != 1 {
            return Err(GatewayError::RefundRejected {
                code: parsed.return_code,
                message: parsed.return_message,
            });
        }

        Ok(RefundReceipt {
            refund_id: parsed
                .refund_id
                .map_or_else(|| intent.transaction_id.clone(), |id| id.to_string()),
        })
    }
}

/// Build a signed callback envelope the way the gateway would.
///
/// Lives outside `cfg(test)` so integration tests can forge gateway
/// traffic against a known verify-key.
///
/// # Errors
///
/// Returns [`GatewayError::Signature`] if signing fails.
pub fn forge_callback(
    verify_key: &str,
    app_trans_id: &str,
    transaction_id: &str,
    amount: Money,
    success: bool,
    paid_at: DateTime<Utc>,
) -> Result<CallbackEnvelope, GatewayError> {
    let data = serde_json::json!({
        "app_trans_id": app_trans_id,
        "trans_id": transaction_id,
        "amount": amount.minor(),
        "status": if success { 1 } else { 0 },
        "server_time": paid_at.timestamp_millis(),
        "channel": 38,
    })
    .to_string();
    let mac = signature::sign(verify_key, data.as_bytes())?;
    Ok(CallbackEnvelope { data, mac })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn settings() -> GatewaySettings {
        GatewaySettings {
            app_id: "2553".to_string(),
            create_key: "create-key".to_string(),
            verify_key: "verify-key".to_string(),
            callback_url: "http://localhost:8080/payments/wallet/ipn".to_string(),
            refund_url: "http://localhost:9999/refund".to_string(),
        }
    }

    #[test]
    fn order_request_is_signed_and_correlated() {
        let gateway = WalletGateway::new(settings());
        let now = Utc::now();
        let order = gateway
            .create_order(&OrderIntent {
                booking_code: "AB12CD34".to_string(),
                amount: Money::from_minor(120_000),
                app_user: "customer-1".to_string(),
                now,
            })
            .unwrap();

        assert_eq!(order.app_trans_id, format!("{}_AB12CD34", now.format("%y%m%d")));
        assert_eq!(order.amount, 120_000);
        assert!(!order.mac.is_empty());
    }

    #[test]
    fn valid_callback_verifies_and_parses() {
        let gateway = WalletGateway::new(settings());
        let now = Utc::now();
        let envelope = forge_callback(
            "verify-key",
            "250101_AB12CD34",
            "zp-777",
            Money::from_minor(120_000),
            true,
            now,
        )
        .unwrap();

        let event = gateway.verify_callback(&envelope).unwrap();
        assert_eq!(event.app_trans_id, "250101_AB12CD34");
        assert_eq!(event.transaction_id, "zp-777");
        assert_eq!(event.amount, Money::from_minor(120_000));
        assert!(event.success);
        assert!(event.paid_at.is_some());
    }

    #[test]
    fn callback_signed_with_wrong_key_is_rejected() {
        let gateway = WalletGateway::new(settings());
        let envelope = forge_callback(
            "wrong-key",
            "250101_AB12CD34",
            "zp-777",
            Money::from_minor(120_000),
            true,
            Utc::now(),
        )
        .unwrap();

        assert!(matches!(
            gateway.verify_callback(&envelope),
            Err(GatewayError::Signature)
        ));
    }

    #[test]
    fn tampered_amount_is_rejected() {
        let gateway = WalletGateway::new(settings());
        let mut envelope = forge_callback(
            "verify-key",
            "250101_AB12CD34",
            "zp-777",
            Money::from_minor(120_000),
            true,
            Utc::now(),
        )
        .unwrap();
        envelope.data = envelope.data.replace("120000", "1");

        assert!(matches!(
            gateway.verify_callback(&envelope),
            Err(GatewayError::Signature)
        ));
    }

    #[test]
    fn missing_fields_are_malformed_not_panics() {
        let gateway = WalletGateway::new(settings());
        let data = "{\"app_trans_id\": \"250101_X\"}".to_string();
        let mac = signature::sign("verify-key", data.as_bytes()).unwrap();
        let envelope = CallbackEnvelope { data, mac };

        assert!(matches!(
            gateway.verify_callback(&envelope),
            Err(GatewayError::MalformedPayload(_))
        ));
    }

    #[test]
    fn extra_fields_are_tolerated() {
        let gateway = WalletGateway::new(settings());
        let envelope = forge_callback(
            "verify-key",
            "250101_AB12CD34",
            "zp-777",
            Money::from_minor(60_000),
            false,
            Utc::now(),
        )
        .unwrap();

        // forge_callback includes a "channel" field no struct declares
        let event = gateway.verify_callback(&envelope).unwrap();
        assert!(!event.success);
    }
}
