//! Hold creation: the all-or-nothing seat claim.

use crate::clock::Clock;
use crate::error::{BookingError, Result};
use crate::pricing::PricingRule;
use crate::store::{HoldStore, SeatLedgerStore};
use crate::types::{normalize_seats, CustomerId, Hold, HoldId, Money, SeatState, ShowtimeId};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Bounds on hold lifetimes.
#[derive(Clone, Copy, Debug)]
pub struct HoldTtl {
    /// TTL applied when the caller does not request one
    pub default: Duration,
    /// Upper bound on caller-requested TTLs
    pub max: Duration,
}

impl HoldTtl {
    fn clamp(&self, requested: Option<Duration>) -> Duration {
        match requested {
            Some(ttl) if ttl > Duration::zero() => ttl.min(self.max),
            _ => self.default,
        }
    }
}

/// Outcome of a successful hold.
#[derive(Clone, Debug, Serialize)]
pub struct HoldReceipt {
    /// Created hold id
    pub hold_id: HoldId,
    /// Computed price for the whole seat set
    pub amount: Money,
    /// Instant the hold expires
    pub expires_at: DateTime<Utc>,
}

/// Creates holds: reserves a seat set across the ledger with an
/// all-or-nothing outcome from the caller's perspective.
pub struct HoldService {
    ledger: Arc<dyn SeatLedgerStore>,
    holds: Arc<dyn HoldStore>,
    pricing: Arc<dyn PricingRule>,
    clock: Arc<dyn Clock>,
    ttl: HoldTtl,
}

impl HoldService {
    /// Wire up a hold service
    #[must_use]
    pub fn new(
        ledger: Arc<dyn SeatLedgerStore>,
        holds: Arc<dyn HoldStore>,
        pricing: Arc<dyn PricingRule>,
        clock: Arc<dyn Clock>,
        ttl: HoldTtl,
    ) -> Self {
        Self {
            ledger,
            holds,
            pricing,
            clock,
            ttl,
        }
    }

    /// Create a hold over `raw_seats` for `showtime`.
    ///
    /// Seat codes are normalized (trim, uppercase, de-duplicate preserving
    /// first occurrence) before pricing. The ledger claim is one bulk
    /// conditional write; if fewer seats transition than requested, the
    /// whole hold is void: claimed seats are released, the hold record is
    /// deleted, and the conflict names the seats that were unavailable.
    ///
    /// # Errors
    ///
    /// [`BookingError::Unauthorized`] without a caller identity,
    /// [`BookingError::Validation`] for empty or malformed seat lists,
    /// [`BookingError::Conflict`] when any requested seat is unavailable.
    pub async fn create_hold(
        &self,
        customer_id: CustomerId,
        showtime_id: ShowtimeId,
        raw_seats: &[String],
        requested_ttl: Option<Duration>,
    ) -> Result<HoldReceipt> {
        if customer_id.is_nil() {
            return Err(BookingError::Unauthorized);
        }
        if showtime_id.as_uuid().is_nil() {
            return Err(BookingError::Validation("showtime is required".to_string()));
        }
        if raw_seats.is_empty() {
            return Err(BookingError::Validation("seat list is empty".to_string()));
        }
        let seats = normalize_seats(raw_seats)
            .ok_or_else(|| BookingError::Validation("malformed seat code".to_string()))?;
        if seats.is_empty() {
            return Err(BookingError::Validation(
                "seat list is empty after normalization".to_string(),
            ));
        }

        let mut amount = Money::ZERO;
        for seat in &seats {
            amount = amount
                .checked_add(self.pricing.price(&showtime_id, seat))
                .ok_or_else(|| BookingError::Validation("amount overflow".to_string()))?;
        }

        let now = self.clock.now();
        let expires_at = now + self.ttl.clamp(requested_ttl);
        let hold = Hold {
            id: HoldId::new(),
            customer_id,
            showtime_id,
            seats: seats.clone(),
            amount,
            expires_at,
        };
        let hold_id = hold.id;
        self.holds.insert(hold).await?;

        let requested = seats.len() as u64;
        let claimed = self
            .ledger
            .hold_seats(showtime_id, &seats, hold_id, expires_at, now)
            .await?;

        if claimed < requested {
            // Partial claim: void the whole hold. Seats we did claim go
            // back, the hold record goes away, and the caller learns which
            // seats lost.
            let released = self.ledger.release_held(showtime_id, &seats, hold_id).await?;
            self.holds.delete(hold_id).await?;
            debug!(
                hold_id = %hold_id,
                claimed,
                released,
                requested,
                "hold rolled back after partial claim"
            );

            let states = self.ledger.seat_states(showtime_id, &seats, now).await?;
            let unavailable: Vec<_> = states
                .into_iter()
                .filter_map(|(seat, state)| (state != SeatState::Free).then_some(seat))
                .collect();
            warn!(
                showtime_id = %showtime_id,
                customer_id = %customer_id,
                unavailable = ?unavailable,
                "hold rejected: seats unavailable"
            );
            return Err(BookingError::seat_conflict("seats unavailable", unavailable));
        }

        info!(
            hold_id = %hold_id,
            showtime_id = %showtime_id,
            customer_id = %customer_id,
            seats = requested,
            amount = %amount,
            expires_at = %expires_at,
            "hold created"
        );
        Ok(HoldReceipt {
            hold_id,
            amount,
            expires_at,
        })
    }
}
