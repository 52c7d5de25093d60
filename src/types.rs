//! Domain types for the cinema booking system.
//!
//! This module contains the value objects and entities the booking core
//! operates on: identifiers, money, seat codes, the per-seat ledger state,
//! holds, and bookings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a showtime
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShowtimeId(Uuid);

impl ShowtimeId {
    /// Creates a new random `ShowtimeId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `ShowtimeId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ShowtimeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ShowtimeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a hold (a time-boxed seat lock)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HoldId(Uuid);

impl HoldId {
    /// Creates a new random `HoldId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `HoldId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for HoldId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HoldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(Uuid);

impl BookingId {
    /// Creates a new random `BookingId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `BookingId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Human-facing booking code derived from this id.
    ///
    /// Short, uppercase, and unique per deployment; embedded in the payment
    /// gateway's correlation id so a callback can be routed back here.
    #[must_use]
    pub fn code(&self) -> String {
        let mut code = self.0.simple().to_string();
        code.truncate(8);
        code.to_uppercase()
    }
}

impl Default for BookingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a customer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(Uuid);

impl CustomerId {
    /// Creates a new random `CustomerId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `CustomerId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Whether this is the nil UUID (no authenticated caller)
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for CustomerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Money
// ============================================================================

/// Monetary amount in minor currency units.
///
/// Stored as an integer, never floating point. Gateway payloads carry the
/// same integer representation, so amount-equality checks are exact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from minor units (e.g. cents)
    #[must_use]
    pub const fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    /// Returns the amount in minor units
    #[must_use]
    pub const fn minor(&self) -> u64 {
        self.0
    }

    /// Checked addition
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Checked multiplication by a count
    #[must_use]
    pub const fn checked_mul(self, count: u64) -> Option<Self> {
        match self.0.checked_mul(count) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Seats
// ============================================================================

/// Validated seat code (e.g. "A1", "H12").
///
/// Always trimmed and uppercase; constructed only through [`SeatCode::parse`]
/// or [`normalize_seats`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeatCode(String);

impl SeatCode {
    /// Maximum accepted length of a seat code after trimming
    pub const MAX_LEN: usize = 8;

    /// Parse a raw seat code: trim, uppercase, reject empty or oversized
    /// input and anything outside ASCII alphanumerics.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.len() > Self::MAX_LEN {
            return None;
        }
        if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(Self(trimmed.to_ascii_uppercase()))
    }

    /// The seat code as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeatCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Normalize a raw seat list: parse each entry and de-duplicate while
/// preserving the first occurrence.
///
/// Returns `None` if any entry fails to parse; an empty input yields an
/// empty output (the caller rejects it).
#[must_use]
pub fn normalize_seats(raw: &[String]) -> Option<Vec<SeatCode>> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(raw.len());
    for entry in raw {
        let seat = SeatCode::parse(entry)?;
        if seen.insert(seat.clone()) {
            out.push(seat);
        }
    }
    Some(out)
}

/// Occupancy state of one (showtime, seat) ledger entry.
///
/// The reference and expiry live inside the variant, so an entry can never
/// be `Held` without a lock reference and a deadline, nor `Confirmed`
/// without a booking reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SeatState {
    /// Seat is available
    Free,
    /// Seat is locked by a pending hold until `expires_at`
    Held {
        /// The hold claiming this seat
        hold_id: HoldId,
        /// Instant the hold becomes reclaimable
        expires_at: DateTime<Utc>,
    },
    /// Seat is sold to a confirmed booking
    Confirmed {
        /// The booking owning this seat
        booking_id: BookingId,
    },
}

impl SeatState {
    /// Whether this state can be claimed by a new hold at `now`.
    ///
    /// `Free` is claimable; a `Held` entry whose deadline has passed is
    /// reclaimable in place without any background sweep.
    #[must_use]
    pub fn claimable_at(&self, now: DateTime<Utc>) -> bool {
        match self {
            Self::Free => true,
            Self::Held { expires_at, .. } => *expires_at <= now,
            Self::Confirmed { .. } => false,
        }
    }
}

// ============================================================================
// Hold
// ============================================================================

/// A time-boxed reservation claim over a seat set.
///
/// Backs a pending booking attempt; consumed by a booking transition or
/// left to expire, at which point its ledger locks become reclaimable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hold {
    /// Hold identifier
    pub id: HoldId,
    /// Customer who created the hold
    pub customer_id: CustomerId,
    /// Showtime the seats belong to
    pub showtime_id: ShowtimeId,
    /// Ordered, de-duplicated seat codes
    pub seats: Vec<SeatCode>,
    /// Price computed at hold time
    pub amount: Money,
    /// Instant the hold expires
    pub expires_at: DateTime<Utc>,
}

impl Hold {
    /// Whether the hold is still valid at `now`
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

// ============================================================================
// Booking
// ============================================================================

/// Lifecycle status of a booking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Created against a deferred gateway; waiting for the payment callback
    PendingPayment,
    /// Paid (or cash-equivalent); seats are sold
    Confirmed,
    /// Terminal failure: payment failed, or explicitly canceled and refunded
    Canceled,
}

impl BookingStatus {
    /// Storage tag for this status
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PendingPayment => "pending_payment",
            Self::Confirmed => "confirmed",
            Self::Canceled => "canceled",
        }
    }

    /// Parse a storage tag
    #[must_use]
    pub fn from_str_tag(tag: &str) -> Option<Self> {
        match tag {
            "pending_payment" => Some(Self::PendingPayment),
            "confirmed" => Some(Self::Confirmed),
            "canceled" => Some(Self::Canceled),
            _ => None,
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the customer pays for a booking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Asynchronous wallet gateway; confirmation arrives via signed callback
    Wallet,
    /// Cash-equivalent; confirmed immediately at the counter
    Cash,
}

/// Payment sub-record attached to a booking once a gateway is involved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Gateway name (e.g. "wallet")
    pub gateway: String,
    /// Gateway-side transaction id, present once the gateway reported one
    pub transaction_id: Option<String>,
    /// Instant the gateway reported payment
    pub paid_at: Option<DateTime<Utc>>,
    /// Raw callback payload, kept verbatim for audits and disputes
    pub raw_payload: Option<serde_json::Value>,
}

impl PaymentRecord {
    /// A record naming only the gateway, before any callback arrived
    #[must_use]
    pub const fn pending(gateway: String) -> Self {
        Self {
            gateway,
            transaction_id: None,
            paid_at: None,
            raw_payload: None,
        }
    }
}

/// Durable record of a completed or in-progress seat purchase.
///
/// `seats` and `amount` are snapshots from the originating hold and never
/// change after creation; only `status` and `payment` mutate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Booking identifier
    pub id: BookingId,
    /// Human-facing unique code
    pub code: String,
    /// Customer who owns the booking
    pub customer_id: CustomerId,
    /// Showtime the seats belong to
    pub showtime_id: ShowtimeId,
    /// Seat snapshot from the hold
    pub seats: Vec<SeatCode>,
    /// Amount snapshot from the hold
    pub amount: Money,
    /// Current lifecycle status
    pub status: BookingStatus,
    /// Hold this booking was created from
    pub hold_id: HoldId,
    /// Payment sub-record, absent for cash bookings until set
    pub payment: Option<PaymentRecord>,
    /// Creation instant
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Create a booking from a hold with the given initial status.
    #[must_use]
    pub fn from_hold(hold: &Hold, status: BookingStatus, payment: Option<PaymentRecord>, now: DateTime<Utc>) -> Self {
        let id = BookingId::new();
        Self {
            id,
            code: id.code(),
            customer_id: hold.customer_id,
            showtime_id: hold.showtime_id,
            seats: hold.seats.clone(),
            amount: hold.amount,
            status,
            hold_id: hold.id,
            payment,
            created_at: now,
        }
    }
}
