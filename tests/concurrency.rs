//! Races over the seat ledger and the reconciliation path.
//!
//! The stores are shared behind `Arc`, so spawned tasks contend on the
//! same state exactly as concurrent requests would.

#![allow(clippy::unwrap_used)]

mod common;

use async_trait::async_trait;
use cinema_booking::clock::Clock;
use cinema_booking::error::BookingError;
use cinema_booking::services::{ReconcileOutcome, ReconciliationService};
use cinema_booking::store::{BookingStore, InMemoryBookingStore, SeatLedgerStore, StoreResult};
use cinema_booking::types::{
    Booking, BookingId, BookingStatus, CustomerId, Money, PaymentMethod, PaymentRecord, SeatCode,
    SeatState, ShowtimeId,
};
use common::{seat_list, TestEnv};
use std::sync::Arc;

#[tokio::test]
async fn only_one_of_many_racing_holds_wins_a_seat() {
    let env = TestEnv::new();
    let showtime = ShowtimeId::new();

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let service = env.hold_service.clone();
        tasks.push(tokio::spawn(async move {
            service
                .create_hold(CustomerId::new(), showtime, &seat_list(&["A1"]), None)
                .await
        }));
    }

    let mut winners = 0;
    let mut conflicts = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => winners += 1,
            Err(BookingError::Conflict { seats, .. }) => {
                assert_eq!(seats, vec![SeatCode::parse("A1").unwrap()]);
                conflicts += 1;
            }
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(conflicts, 7);
}

#[tokio::test]
async fn racing_multi_seat_holds_never_deadlock_or_double_claim() {
    let env = TestEnv::new();
    let showtime = ShowtimeId::new();

    // Overlapping seat sets claimed in different orders.
    let a = {
        let service = env.hold_service.clone();
        tokio::spawn(async move {
            service
                .create_hold(CustomerId::new(), showtime, &seat_list(&["B1", "B2"]), None)
                .await
        })
    };
    let b = {
        let service = env.hold_service.clone();
        tokio::spawn(async move {
            service
                .create_hold(CustomerId::new(), showtime, &seat_list(&["B2", "B1"]), None)
                .await
        })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);

    // Both seats belong to the single winning hold; nothing is stranded.
    let winner = results.iter().find_map(|r| r.as_ref().ok()).unwrap();
    let states = env
        .ledger
        .seat_states(
            showtime,
            &[SeatCode::parse("B1").unwrap(), SeatCode::parse("B2").unwrap()],
            env.clock.now(),
        )
        .await
        .unwrap();
    for (_, state) in states {
        assert!(matches!(state, SeatState::Held { hold_id, .. } if hold_id == winner.hold_id));
    }
}

#[tokio::test]
async fn replayed_callbacks_confirm_exactly_once() {
    let env = TestEnv::new();
    let customer = CustomerId::new();
    let showtime = ShowtimeId::new();

    let hold = env
        .hold_service
        .create_hold(customer, showtime, &seat_list(&["C1"]), None)
        .await
        .unwrap();
    let receipt = env
        .booking_service
        .create_booking(hold.hold_id, customer, PaymentMethod::Wallet)
        .await
        .unwrap();
    let order = receipt.gateway_order.unwrap();
    let envelope =
        env.gateway_callback(&order.app_trans_id, "zp-race", Money::from_minor(order.amount), true);

    let mut tasks = Vec::new();
    for _ in 0..6 {
        let reconciliation = env.reconciliation.clone();
        let envelope = envelope.clone();
        tasks.push(tokio::spawn(
            async move { reconciliation.reconcile(&envelope).await },
        ));
    }

    let mut confirmed = 0;
    let mut replays = 0;
    for task in tasks {
        match task.await.unwrap().unwrap() {
            ReconcileOutcome::Confirmed => confirmed += 1,
            ReconcileOutcome::AlreadyConfirmed => replays += 1,
            ReconcileOutcome::Canceled => panic!("success callback must not cancel"),
        }
    }
    assert_eq!(confirmed, 1);
    assert_eq!(replays, 5);

    let booking = env.bookings.get(receipt.booking.id).await.unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);
    let states = env
        .ledger
        .seat_states(showtime, &[SeatCode::parse("C1").unwrap()], env.clock.now())
        .await
        .unwrap();
    assert_eq!(states[0].1, SeatState::Confirmed { booking_id: booking.id });
}

/// Booking store whose code lookups lag behind the real store, the way a
/// reconcile invocation sees the world when a concurrent callback lands
/// between its read and its write.
struct StaleStatusReads {
    inner: Arc<InMemoryBookingStore>,
}

#[async_trait]
impl BookingStore for StaleStatusReads {
    async fn insert(&self, booking: Booking) -> StoreResult<()> {
        self.inner.insert(booking).await
    }

    async fn get(&self, id: BookingId) -> StoreResult<Option<Booking>> {
        self.inner.get(id).await
    }

    async fn get_by_code(&self, code: &str) -> StoreResult<Option<Booking>> {
        Ok(self.inner.get_by_code(code).await?.map(|mut booking| {
            booking.status = BookingStatus::PendingPayment;
            booking
        }))
    }

    async fn transition_status(
        &self,
        id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
        payment: Option<PaymentRecord>,
    ) -> StoreResult<bool> {
        self.inner.transition_status(id, from, to, payment).await
    }
}

#[tokio::test]
async fn failure_callback_losing_to_success_does_not_report_canceled() {
    let env = TestEnv::new();
    let customer = CustomerId::new();
    let showtime = ShowtimeId::new();

    let hold = env
        .hold_service
        .create_hold(customer, showtime, &seat_list(&["E1"]), None)
        .await
        .unwrap();
    let receipt = env
        .booking_service
        .create_booking(hold.hold_id, customer, PaymentMethod::Wallet)
        .await
        .unwrap();
    let order = receipt.gateway_order.unwrap();

    // The success callback wins first.
    let success =
        env.gateway_callback(&order.app_trans_id, "zp-700", Money::from_minor(order.amount), true);
    env.reconciliation.reconcile(&success).await.unwrap();

    // A failure callback that read the booking before the success landed:
    // its view says PendingPayment, the store says Confirmed.
    let stale = ReconciliationService::new(
        env.ledger.clone(),
        env.holds.clone(),
        Arc::new(StaleStatusReads {
            inner: env.bookings.clone(),
        }),
        env.gateway.clone(),
    );
    let failure =
        env.gateway_callback(&order.app_trans_id, "zp-700", Money::from_minor(order.amount), false);
    let outcome = stale.reconcile(&failure).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::AlreadyConfirmed);

    let booking = env.bookings.get(receipt.booking.id).await.unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);
    let states = env
        .ledger
        .seat_states(showtime, &[SeatCode::parse("E1").unwrap()], env.clock.now())
        .await
        .unwrap();
    assert_eq!(states[0].1, SeatState::Confirmed { booking_id: booking.id });
}

#[tokio::test]
async fn racing_cash_bookings_on_one_hold_confirm_once() {
    let env = TestEnv::new();
    let customer = CustomerId::new();
    let showtime = ShowtimeId::new();

    let hold = env
        .hold_service
        .create_hold(customer, showtime, &seat_list(&["D1"]), None)
        .await
        .unwrap();

    let mut tasks = Vec::new();
    for _ in 0..4 {
        let service = env.booking_service.clone();
        tasks.push(tokio::spawn(async move {
            service.create_booking(hold.hold_id, customer, PaymentMethod::Cash).await
        }));
    }

    let mut confirmed_ids = Vec::new();
    for task in tasks {
        if let Ok(receipt) = task.await.unwrap() {
            confirmed_ids.push(receipt.booking.id);
        }
    }
    assert_eq!(confirmed_ids.len(), 1);

    let states = env
        .ledger
        .seat_states(showtime, &[SeatCode::parse("D1").unwrap()], env.clock.now())
        .await
        .unwrap();
    assert_eq!(
        states[0].1,
        SeatState::Confirmed { booking_id: confirmed_ids[0] }
    );
}
