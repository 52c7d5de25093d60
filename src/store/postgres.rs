//! `PostgreSQL`-backed store implementations.
//!
//! Every ledger transition is a single conditional statement; the
//! compare-and-swap predicate travels inside the `WHERE` clause and
//! `rows_affected()` is the success count the services compare against
//! the requested seat count. Hold claiming is one upsert over the whole
//! seat set, so a racing hold for the same seats loses at the row level,
//! not in application code.

use super::{BookingStore, HoldStore, SeatLedgerStore, StoreError, StoreResult};
use crate::types::{
    Booking, BookingId, BookingStatus, Hold, HoldId, CustomerId, Money, PaymentRecord, SeatCode,
    SeatState, ShowtimeId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

/// Create the booking tables if they do not exist yet.
///
/// # Errors
///
/// Returns a [`StoreError`] when a DDL statement fails.
pub async fn migrate(pool: &PgPool) -> StoreResult<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS seat_ledger (
            showtime_id UUID NOT NULL,
            seat TEXT NOT NULL,
            state TEXT NOT NULL,
            ref_id UUID,
            expires_at TIMESTAMPTZ,
            PRIMARY KEY (showtime_id, seat)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS holds (
            id UUID PRIMARY KEY,
            customer_id UUID NOT NULL,
            showtime_id UUID NOT NULL,
            seats TEXT[] NOT NULL,
            amount BIGINT NOT NULL,
            expires_at TIMESTAMPTZ NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS bookings (
            id UUID PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            customer_id UUID NOT NULL,
            showtime_id UUID NOT NULL,
            seats TEXT[] NOT NULL,
            amount BIGINT NOT NULL,
            status TEXT NOT NULL,
            hold_id UUID NOT NULL,
            gateway TEXT,
            transaction_id TEXT,
            paid_at TIMESTAMPTZ,
            raw_payload JSONB,
            created_at TIMESTAMPTZ NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    Ok(())
}

fn amount_to_db(amount: Money) -> StoreResult<i64> {
    i64::try_from(amount.minor())
        .map_err(|_| StoreError::Backend("amount exceeds storable range".to_string()))
}

fn amount_from_db(raw: i64) -> StoreResult<Money> {
    u64::try_from(raw)
        .map(Money::from_minor)
        .map_err(|_| StoreError::Backend("negative amount in storage".to_string()))
}

fn seats_to_db(seats: &[SeatCode]) -> Vec<String> {
    seats.iter().map(|s| s.as_str().to_string()).collect()
}

fn seats_from_db(raw: Vec<String>) -> StoreResult<Vec<SeatCode>> {
    raw.iter()
        .map(|s| {
            SeatCode::parse(s)
                .ok_or_else(|| StoreError::Backend(format!("corrupt seat code in storage: {s:?}")))
        })
        .collect()
}

// ============================================================================
// Seat ledger
// ============================================================================

/// `PostgreSQL` seat ledger.
#[derive(Clone, Debug)]
pub struct PgSeatLedger {
    pool: PgPool,
}

impl PgSeatLedger {
    /// Create a ledger over the given pool
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SeatLedgerStore for PgSeatLedger {
    async fn hold_seats(
        &self,
        showtime: ShowtimeId,
        seats: &[SeatCode],
        hold_id: HoldId,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> StoreResult<u64> {
        // Upsert over the whole seat set; the DO UPDATE predicate is the
        // compare-and-swap: free, or held but past its deadline. Rows whose
        // predicate fails are not counted in rows_affected.
        let result = sqlx::query(
            "INSERT INTO seat_ledger (showtime_id, seat, state, ref_id, expires_at)
             SELECT $1, s, 'held', $2, $3 FROM UNNEST($4::text[]) AS s
             ON CONFLICT (showtime_id, seat) DO UPDATE
             SET state = 'held', ref_id = $2, expires_at = $3
             WHERE seat_ledger.state = 'free'
                OR (seat_ledger.state = 'held' AND seat_ledger.expires_at <= $5)",
        )
        .bind(showtime.as_uuid())
        .bind(hold_id.as_uuid())
        .bind(expires_at)
        .bind(seats_to_db(seats))
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn confirm_seats(
        &self,
        showtime: ShowtimeId,
        seats: &[SeatCode],
        hold_id: HoldId,
        booking_id: BookingId,
    ) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE seat_ledger
             SET state = 'confirmed', ref_id = $1, expires_at = NULL
             WHERE showtime_id = $2 AND seat = ANY($3)
               AND state = 'held' AND ref_id = $4",
        )
        .bind(booking_id.as_uuid())
        .bind(showtime.as_uuid())
        .bind(seats_to_db(seats))
        .bind(hold_id.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn release_held(
        &self,
        showtime: ShowtimeId,
        seats: &[SeatCode],
        hold_id: HoldId,
    ) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE seat_ledger
             SET state = 'free', ref_id = NULL, expires_at = NULL
             WHERE showtime_id = $1 AND seat = ANY($2)
               AND state = 'held' AND ref_id = $3",
        )
        .bind(showtime.as_uuid())
        .bind(seats_to_db(seats))
        .bind(hold_id.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn release_confirmed(
        &self,
        showtime: ShowtimeId,
        seats: &[SeatCode],
        booking_id: BookingId,
    ) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE seat_ledger
             SET state = 'free', ref_id = NULL, expires_at = NULL
             WHERE showtime_id = $1 AND seat = ANY($2)
               AND state = 'confirmed' AND ref_id = $3",
        )
        .bind(showtime.as_uuid())
        .bind(seats_to_db(seats))
        .bind(booking_id.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn seat_states(
        &self,
        showtime: ShowtimeId,
        seats: &[SeatCode],
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<(SeatCode, SeatState)>> {
        let rows: Vec<(String, String, Option<Uuid>, Option<DateTime<Utc>>)> = sqlx::query_as(
            "SELECT seat, state, ref_id, expires_at FROM seat_ledger
             WHERE showtime_id = $1 AND seat = ANY($2)",
        )
        .bind(showtime.as_uuid())
        .bind(seats_to_db(seats))
        .fetch_all(&self.pool)
        .await?;

        let mut by_seat: HashMap<String, SeatState> = HashMap::with_capacity(rows.len());
        for (seat, state, ref_id, expires_at) in rows {
            let decoded = match (state.as_str(), ref_id, expires_at) {
                ("free", _, _) => SeatState::Free,
                ("held", Some(id), Some(deadline)) => SeatState::Held {
                    hold_id: HoldId::from_uuid(id),
                    expires_at: deadline,
                },
                ("confirmed", Some(id), _) => SeatState::Confirmed {
                    booking_id: BookingId::from_uuid(id),
                },
                _ => {
                    return Err(StoreError::Backend(format!(
                        "corrupt ledger row for seat {seat:?}"
                    )))
                }
            };
            by_seat.insert(seat, decoded);
        }

        Ok(seats
            .iter()
            .map(|seat| {
                let state = match by_seat.remove(seat.as_str()) {
                    Some(state) if !state.claimable_at(now) => state,
                    _ => SeatState::Free,
                };
                (seat.clone(), state)
            })
            .collect())
    }
}

// ============================================================================
// Holds
// ============================================================================

#[derive(sqlx::FromRow)]
struct HoldRow {
    id: Uuid,
    customer_id: Uuid,
    showtime_id: Uuid,
    seats: Vec<String>,
    amount: i64,
    expires_at: DateTime<Utc>,
}

impl HoldRow {
    fn into_hold(self) -> StoreResult<Hold> {
        Ok(Hold {
            id: HoldId::from_uuid(self.id),
            customer_id: CustomerId::from_uuid(self.customer_id),
            showtime_id: ShowtimeId::from_uuid(self.showtime_id),
            seats: seats_from_db(self.seats)?,
            amount: amount_from_db(self.amount)?,
            expires_at: self.expires_at,
        })
    }
}

/// `PostgreSQL` hold store.
#[derive(Clone, Debug)]
pub struct PgHoldStore {
    pool: PgPool,
}

impl PgHoldStore {
    /// Create a store over the given pool
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HoldStore for PgHoldStore {
    async fn insert(&self, hold: Hold) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO holds (id, customer_id, showtime_id, seats, amount, expires_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(hold.id.as_uuid())
        .bind(hold.customer_id.as_uuid())
        .bind(hold.showtime_id.as_uuid())
        .bind(seats_to_db(&hold.seats))
        .bind(amount_to_db(hold.amount)?)
        .bind(hold.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: HoldId) -> StoreResult<Option<Hold>> {
        let row: Option<HoldRow> = sqlx::query_as(
            "SELECT id, customer_id, showtime_id, seats, amount, expires_at
             FROM holds WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(HoldRow::into_hold).transpose()
    }

    async fn delete(&self, id: HoldId) -> StoreResult<()> {
        sqlx::query("DELETE FROM holds WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// ============================================================================
// Bookings
// ============================================================================

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    code: String,
    customer_id: Uuid,
    showtime_id: Uuid,
    seats: Vec<String>,
    amount: i64,
    status: String,
    hold_id: Uuid,
    gateway: Option<String>,
    transaction_id: Option<String>,
    paid_at: Option<DateTime<Utc>>,
    raw_payload: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_booking(self) -> StoreResult<Booking> {
        let status = BookingStatus::from_str_tag(&self.status).ok_or_else(|| {
            StoreError::Backend(format!("unknown booking status in storage: {:?}", self.status))
        })?;
        let payment = self.gateway.map(|gateway| PaymentRecord {
            gateway,
            transaction_id: self.transaction_id,
            paid_at: self.paid_at,
            raw_payload: self.raw_payload,
        });
        Ok(Booking {
            id: BookingId::from_uuid(self.id),
            code: self.code,
            customer_id: CustomerId::from_uuid(self.customer_id),
            showtime_id: ShowtimeId::from_uuid(self.showtime_id),
            seats: seats_from_db(self.seats)?,
            amount: amount_from_db(self.amount)?,
            status,
            hold_id: HoldId::from_uuid(self.hold_id),
            payment,
            created_at: self.created_at,
        })
    }
}

const BOOKING_COLUMNS: &str = "id, code, customer_id, showtime_id, seats, amount, status, \
                               hold_id, gateway, transaction_id, paid_at, raw_payload, created_at";

/// `PostgreSQL` booking store.
#[derive(Clone, Debug)]
pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    /// Create a store over the given pool
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn insert(&self, booking: Booking) -> StoreResult<()> {
        let (gateway, transaction_id, paid_at, raw_payload) = match booking.payment {
            Some(p) => (Some(p.gateway), p.transaction_id, p.paid_at, p.raw_payload),
            None => (None, None, None, None),
        };
        sqlx::query(
            "INSERT INTO bookings (id, code, customer_id, showtime_id, seats, amount, status,
                                   hold_id, gateway, transaction_id, paid_at, raw_payload, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(booking.id.as_uuid())
        .bind(&booking.code)
        .bind(booking.customer_id.as_uuid())
        .bind(booking.showtime_id.as_uuid())
        .bind(seats_to_db(&booking.seats))
        .bind(amount_to_db(booking.amount)?)
        .bind(booking.status.as_str())
        .bind(booking.hold_id.as_uuid())
        .bind(gateway)
        .bind(transaction_id)
        .bind(paid_at)
        .bind(raw_payload)
        .bind(booking.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: BookingId) -> StoreResult<Option<Booking>> {
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(BookingRow::into_booking).transpose()
    }

    async fn get_by_code(&self, code: &str) -> StoreResult<Option<Booking>> {
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        row.map(BookingRow::into_booking).transpose()
    }

    async fn transition_status(
        &self,
        id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
        payment: Option<PaymentRecord>,
    ) -> StoreResult<bool> {
        let (gateway, transaction_id, paid_at, raw_payload) = match payment {
            Some(p) => (Some(p.gateway), p.transaction_id, p.paid_at, p.raw_payload),
            None => (None, None, None, None),
        };
        let result = sqlx::query(
            "UPDATE bookings
             SET status = $1,
                 gateway = COALESCE($2, gateway),
                 transaction_id = COALESCE($3, transaction_id),
                 paid_at = COALESCE($4, paid_at),
                 raw_payload = COALESCE($5, raw_payload)
             WHERE id = $6 AND status = $7",
        )
        .bind(to.as_str())
        .bind(gateway)
        .bind(transaction_id)
        .bind(paid_at)
        .bind(raw_payload)
        .bind(id.as_uuid())
        .bind(from.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
