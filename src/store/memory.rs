//! In-memory store implementations.
//!
//! Used by tests and development. Each store serializes its mutations
//! behind a single mutex, so a bulk transition evaluates every per-seat
//! condition and applies the writes without interleaving with another
//! caller, the same observable semantics as the `PostgreSQL` store's
//! conditional bulk `UPDATE`.

use super::{BookingStore, HoldStore, SeatLedgerStore, StoreError, StoreResult};
use crate::types::{
    Booking, BookingId, BookingStatus, Hold, HoldId, PaymentRecord, SeatCode, SeatState,
    ShowtimeId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

type LedgerKey = (ShowtimeId, SeatCode);

/// In-memory seat ledger.
#[derive(Debug, Default)]
pub struct InMemorySeatLedger {
    entries: Mutex<HashMap<LedgerKey, SeatState>>,
}

impl InMemorySeatLedger {
    /// Create an empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, HashMap<LedgerKey, SeatState>>> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Backend("ledger mutex poisoned".to_string()))
    }
}

#[async_trait]
impl SeatLedgerStore for InMemorySeatLedger {
    async fn hold_seats(
        &self,
        showtime: ShowtimeId,
        seats: &[SeatCode],
        hold_id: HoldId,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let mut entries = self.lock()?;
        let mut transitioned = 0;
        for seat in seats {
            let key = (showtime, seat.clone());
            let claimable = entries.get(&key).is_none_or(|state| state.claimable_at(now));
            if claimable {
                entries.insert(key, SeatState::Held { hold_id, expires_at });
                transitioned += 1;
            }
        }
        Ok(transitioned)
    }

    async fn confirm_seats(
        &self,
        showtime: ShowtimeId,
        seats: &[SeatCode],
        hold_id: HoldId,
        booking_id: BookingId,
    ) -> StoreResult<u64> {
        let mut entries = self.lock()?;
        let mut transitioned = 0;
        for seat in seats {
            let key = (showtime, seat.clone());
            if let Some(state) = entries.get_mut(&key) {
                if matches!(state, SeatState::Held { hold_id: h, .. } if *h == hold_id) {
                    *state = SeatState::Confirmed { booking_id };
                    transitioned += 1;
                }
            }
        }
        Ok(transitioned)
    }

    async fn release_held(
        &self,
        showtime: ShowtimeId,
        seats: &[SeatCode],
        hold_id: HoldId,
    ) -> StoreResult<u64> {
        let mut entries = self.lock()?;
        let mut transitioned = 0;
        for seat in seats {
            let key = (showtime, seat.clone());
            if let Some(state) = entries.get_mut(&key) {
                if matches!(state, SeatState::Held { hold_id: h, .. } if *h == hold_id) {
                    *state = SeatState::Free;
                    transitioned += 1;
                }
            }
        }
        Ok(transitioned)
    }

    async fn release_confirmed(
        &self,
        showtime: ShowtimeId,
        seats: &[SeatCode],
        booking_id: BookingId,
    ) -> StoreResult<u64> {
        let mut entries = self.lock()?;
        let mut transitioned = 0;
        for seat in seats {
            let key = (showtime, seat.clone());
            if let Some(state) = entries.get_mut(&key) {
                if matches!(state, SeatState::Confirmed { booking_id: b } if *b == booking_id) {
                    *state = SeatState::Free;
                    transitioned += 1;
                }
            }
        }
        Ok(transitioned)
    }

    async fn seat_states(
        &self,
        showtime: ShowtimeId,
        seats: &[SeatCode],
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<(SeatCode, SeatState)>> {
        let entries = self.lock()?;
        let mut out = Vec::with_capacity(seats.len());
        for seat in seats {
            let state = match entries.get(&(showtime, seat.clone())) {
                Some(state) if !state.claimable_at(now) => state.clone(),
                _ => SeatState::Free,
            };
            out.push((seat.clone(), state));
        }
        Ok(out)
    }
}

/// In-memory hold store.
#[derive(Debug, Default)]
pub struct InMemoryHoldStore {
    holds: Mutex<HashMap<HoldId, Hold>>,
}

impl InMemoryHoldStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, HashMap<HoldId, Hold>>> {
        self.holds
            .lock()
            .map_err(|_| StoreError::Backend("hold mutex poisoned".to_string()))
    }
}

#[async_trait]
impl HoldStore for InMemoryHoldStore {
    async fn insert(&self, hold: Hold) -> StoreResult<()> {
        self.lock()?.insert(hold.id, hold);
        Ok(())
    }

    async fn get(&self, id: HoldId) -> StoreResult<Option<Hold>> {
        Ok(self.lock()?.get(&id).cloned())
    }

    async fn delete(&self, id: HoldId) -> StoreResult<()> {
        self.lock()?.remove(&id);
        Ok(())
    }
}

/// In-memory booking store.
#[derive(Debug, Default)]
pub struct InMemoryBookingStore {
    bookings: Mutex<HashMap<BookingId, Booking>>,
}

impl InMemoryBookingStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, HashMap<BookingId, Booking>>> {
        self.bookings
            .lock()
            .map_err(|_| StoreError::Backend("booking mutex poisoned".to_string()))
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn insert(&self, booking: Booking) -> StoreResult<()> {
        self.lock()?.insert(booking.id, booking);
        Ok(())
    }

    async fn get(&self, id: BookingId) -> StoreResult<Option<Booking>> {
        Ok(self.lock()?.get(&id).cloned())
    }

    async fn get_by_code(&self, code: &str) -> StoreResult<Option<Booking>> {
        Ok(self
            .lock()?
            .values()
            .find(|b| b.code == code)
            .cloned())
    }

    async fn transition_status(
        &self,
        id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
        payment: Option<PaymentRecord>,
    ) -> StoreResult<bool> {
        let mut bookings = self.lock()?;
        match bookings.get_mut(&id) {
            Some(booking) if booking.status == from => {
                booking.status = to;
                if payment.is_some() {
                    booking.payment = payment;
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{CustomerId, Money};
    use chrono::Duration;

    fn seats(codes: &[&str]) -> Vec<SeatCode> {
        codes.iter().map(|c| SeatCode::parse(c).unwrap()).collect()
    }

    #[tokio::test]
    async fn hold_claims_free_and_absent_seats() {
        let ledger = InMemorySeatLedger::new();
        let now = Utc::now();
        let showtime = ShowtimeId::new();
        let hold = HoldId::new();

        let n = ledger
            .hold_seats(showtime, &seats(&["A1", "A2"]), hold, now + Duration::minutes(15), now)
            .await
            .unwrap();
        assert_eq!(n, 2);
    }

    #[tokio::test]
    async fn live_hold_blocks_second_hold() {
        let ledger = InMemorySeatLedger::new();
        let now = Utc::now();
        let showtime = ShowtimeId::new();
        let expiry = now + Duration::minutes(15);

        let first = HoldId::new();
        ledger
            .hold_seats(showtime, &seats(&["B1"]), first, expiry, now)
            .await
            .unwrap();

        let second = HoldId::new();
        let n = ledger
            .hold_seats(showtime, &seats(&["B1"]), second, expiry, now)
            .await
            .unwrap();
        assert_eq!(n, 0);

        // Still held by the first hold.
        let states = ledger.seat_states(showtime, &seats(&["B1"]), now).await.unwrap();
        assert_eq!(
            states[0].1,
            SeatState::Held { hold_id: first, expires_at: expiry }
        );
    }

    #[tokio::test]
    async fn expired_hold_is_reclaimed_in_place() {
        let ledger = InMemorySeatLedger::new();
        let now = Utc::now();
        let showtime = ShowtimeId::new();

        let stale = HoldId::new();
        ledger
            .hold_seats(showtime, &seats(&["C1"]), stale, now + Duration::minutes(1), now)
            .await
            .unwrap();

        let later = now + Duration::minutes(2);
        let fresh = HoldId::new();
        let n = ledger
            .hold_seats(showtime, &seats(&["C1"]), fresh, later + Duration::minutes(15), later)
            .await
            .unwrap();
        assert_eq!(n, 1);
    }

    #[tokio::test]
    async fn confirm_requires_matching_hold() {
        let ledger = InMemorySeatLedger::new();
        let now = Utc::now();
        let showtime = ShowtimeId::new();
        let hold = HoldId::new();
        let booking = BookingId::new();

        ledger
            .hold_seats(showtime, &seats(&["D1"]), hold, now + Duration::minutes(15), now)
            .await
            .unwrap();

        // Wrong hold id: nothing moves.
        let n = ledger
            .confirm_seats(showtime, &seats(&["D1"]), HoldId::new(), booking)
            .await
            .unwrap();
        assert_eq!(n, 0);

        let n = ledger
            .confirm_seats(showtime, &seats(&["D1"]), hold, booking)
            .await
            .unwrap();
        assert_eq!(n, 1);

        // Confirmed seats do not revert through the held-release path.
        let n = ledger
            .release_held(showtime, &seats(&["D1"]), hold)
            .await
            .unwrap();
        assert_eq!(n, 0);

        let n = ledger
            .release_confirmed(showtime, &seats(&["D1"]), booking)
            .await
            .unwrap();
        assert_eq!(n, 1);
    }

    #[tokio::test]
    async fn booking_status_cas_applies_once() {
        let store = InMemoryBookingStore::new();
        let hold = Hold {
            id: HoldId::new(),
            customer_id: CustomerId::new(),
            showtime_id: ShowtimeId::new(),
            seats: seats(&["A1"]),
            amount: Money::from_minor(60_000),
            expires_at: Utc::now() + Duration::minutes(15),
        };
        let booking = Booking::from_hold(&hold, BookingStatus::PendingPayment, None, Utc::now());
        let id = booking.id;
        store.insert(booking).await.unwrap();

        let first = store
            .transition_status(id, BookingStatus::PendingPayment, BookingStatus::Confirmed, None)
            .await
            .unwrap();
        let second = store
            .transition_status(id, BookingStatus::PendingPayment, BookingStatus::Confirmed, None)
            .await
            .unwrap();
        assert!(first);
        assert!(!second);
    }
}
