//! Storage contracts for the seat ledger, holds, and bookings.
//!
//! The ledger is the single source of truth for seat availability and the
//! arbiter of every race: each mutation is a bulk compare-and-swap whose
//! predicate includes the expected prior state, the owning reference, and
//! time-based staleness for hold reclamation. Services never read a ledger
//! entry and then write it back; the condition travels with the write.
//!
//! Two implementations exist side by side, mirroring each other's
//! semantics: [`memory`] for tests and development, [`postgres`] for
//! production where `rows_affected` is the CAS success count.

pub mod memory;
pub mod postgres;

use crate::types::{
    Booking, BookingId, BookingStatus, Hold, HoldId, PaymentRecord, SeatCode, SeatState,
    ShowtimeId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use memory::{InMemoryBookingStore, InMemoryHoldStore, InMemorySeatLedger};
pub use postgres::{PgBookingStore, PgHoldStore, PgSeatLedger};

/// Storage-layer error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend failure (connection, query, serialization)
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Durable per-(showtime, seat) occupancy ledger with conditional bulk
/// transitions.
///
/// Every method returns the number of entries actually transitioned; a
/// caller requesting N seats treats anything less than N as failure and
/// compensates. No method here is read-then-write: the expected-state
/// predicate is evaluated atomically with the write.
#[async_trait]
pub trait SeatLedgerStore: Send + Sync {
    /// Claim `seats` for `hold_id`: each entry transitions to
    /// `Held(hold_id, expires_at)` iff it is currently `Free`, absent
    /// (implicit upsert), or `Held` with a deadline at or before `now`.
    async fn hold_seats(
        &self,
        showtime: ShowtimeId,
        seats: &[SeatCode],
        hold_id: HoldId,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> StoreResult<u64>;

    /// Transition `Held(hold_id)` entries to `Confirmed(booking_id)`.
    async fn confirm_seats(
        &self,
        showtime: ShowtimeId,
        seats: &[SeatCode],
        hold_id: HoldId,
        booking_id: BookingId,
    ) -> StoreResult<u64>;

    /// Transition `Held(hold_id)` entries back to `Free` (hold rollback or
    /// optimistic release after a failed payment).
    async fn release_held(
        &self,
        showtime: ShowtimeId,
        seats: &[SeatCode],
        hold_id: HoldId,
    ) -> StoreResult<u64>;

    /// Transition `Confirmed(booking_id)` entries back to `Free`
    /// (cancellation after refund).
    async fn release_confirmed(
        &self,
        showtime: ShowtimeId,
        seats: &[SeatCode],
        booking_id: BookingId,
    ) -> StoreResult<u64>;

    /// Expiry-aware read of the given seats: an absent entry or a `Held`
    /// entry whose deadline passed reads as `Free`.
    async fn seat_states(
        &self,
        showtime: ShowtimeId,
        seats: &[SeatCode],
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<(SeatCode, SeatState)>>;
}

/// Durable store of hold records.
#[async_trait]
pub trait HoldStore: Send + Sync {
    /// Persist a new hold
    async fn insert(&self, hold: Hold) -> StoreResult<()>;
    /// Fetch a hold by id
    async fn get(&self, id: HoldId) -> StoreResult<Option<Hold>>;
    /// Delete a hold (consumed or rolled back); deleting a missing hold is
    /// a no-op
    async fn delete(&self, id: HoldId) -> StoreResult<()>;
}

/// Durable store of booking records.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Persist a new booking
    async fn insert(&self, booking: Booking) -> StoreResult<()>;
    /// Fetch a booking by id
    async fn get(&self, id: BookingId) -> StoreResult<Option<Booking>>;
    /// Fetch a booking by its human-facing code
    async fn get_by_code(&self, code: &str) -> StoreResult<Option<Booking>>;
    /// Status compare-and-swap: move the booking from `from` to `to`,
    /// attaching `payment` when given. Returns `false` if the stored status
    /// was not `from`; exactly one of two racing callers observes `true`.
    async fn transition_status(
        &self,
        id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
        payment: Option<PaymentRecord>,
    ) -> StoreResult<bool>;
}
