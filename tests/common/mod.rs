//! Shared test harness: in-memory stores, fixed clock, mock gateway.

#![allow(clippy::unwrap_used, dead_code)]

use chrono::{Duration, Utc};
use cinema_booking::clock::{Clock, FixedClock};
use cinema_booking::config::GatewaySettings;
use cinema_booking::gateway::{
    wallet::forge_callback, CallbackEnvelope, MockGateway, RefundBehavior,
};
use cinema_booking::pricing::FlatRate;
use cinema_booking::services::holds::HoldTtl;
use cinema_booking::services::{BookingService, HoldService, ReconciliationService};
use cinema_booking::store::{InMemoryBookingStore, InMemoryHoldStore, InMemorySeatLedger};
use cinema_booking::types::Money;
use std::sync::Arc;

pub const VERIFY_KEY: &str = "test-verify-key";
pub const SEAT_PRICE: u64 = 60_000;

pub fn gateway_settings() -> GatewaySettings {
    GatewaySettings {
        app_id: "2553".to_string(),
        create_key: "test-create-key".to_string(),
        verify_key: VERIFY_KEY.to_string(),
        callback_url: "http://localhost:8080/payments/wallet/ipn".to_string(),
        refund_url: "http://localhost:9999/refund".to_string(),
    }
}

/// Fully wired booking core over in-memory stores.
pub struct TestEnv {
    pub ledger: Arc<InMemorySeatLedger>,
    pub holds: Arc<InMemoryHoldStore>,
    pub bookings: Arc<InMemoryBookingStore>,
    pub clock: Arc<FixedClock>,
    pub gateway: Arc<MockGateway>,
    pub hold_service: Arc<HoldService>,
    pub booking_service: Arc<BookingService>,
    pub reconciliation: Arc<ReconciliationService>,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_refunds(RefundBehavior::Succeed)
    }

    pub fn with_refunds(behavior: RefundBehavior) -> Self {
        let ledger = Arc::new(InMemorySeatLedger::new());
        let holds = Arc::new(InMemoryHoldStore::new());
        let bookings = Arc::new(InMemoryBookingStore::new());
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let gateway = MockGateway::shared(gateway_settings(), behavior);

        let hold_service = Arc::new(HoldService::new(
            ledger.clone(),
            holds.clone(),
            FlatRate::shared(Money::from_minor(SEAT_PRICE)),
            clock.clone(),
            HoldTtl {
                default: Duration::minutes(15),
                max: Duration::minutes(30),
            },
        ));
        let booking_service = Arc::new(BookingService::new(
            ledger.clone(),
            holds.clone(),
            bookings.clone(),
            gateway.clone(),
            clock.clone(),
        ));
        let reconciliation = Arc::new(ReconciliationService::new(
            ledger.clone(),
            holds.clone(),
            bookings.clone(),
            gateway.clone(),
        ));

        Self {
            ledger,
            holds,
            bookings,
            clock,
            gateway,
            hold_service,
            booking_service,
            reconciliation,
        }
    }

    /// Forge a signed success/failure callback the way the gateway would
    /// send it for the given order.
    pub fn gateway_callback(
        &self,
        app_trans_id: &str,
        transaction_id: &str,
        amount: Money,
        success: bool,
    ) -> CallbackEnvelope {
        forge_callback(
            VERIFY_KEY,
            app_trans_id,
            transaction_id,
            amount,
            success,
            self.clock.now(),
        )
        .unwrap()
    }
}

pub fn seat_list(codes: &[&str]) -> Vec<String> {
    codes.iter().map(|c| (*c).to_string()).collect()
}
