//! Typed error taxonomy for the booking core.
//!
//! Every store and service failure surfaces as a [`BookingError`]; nothing
//! in the core swallows a conflict. Seat conflicts and expired holds are
//! ordinary outcomes and carry enough detail for a client to react
//! (re-pick seats, restart the hold).

use crate::gateway::GatewayError;
use crate::store::StoreError;
use crate::types::{HoldId, SeatCode};
use thiserror::Error;

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, BookingError>;

/// Domain error for hold, booking, reconciliation, and cancellation paths.
#[derive(Debug, Error)]
pub enum BookingError {
    /// Missing or malformed input; the caller's fault
    #[error("invalid request: {0}")]
    Validation(String),

    /// No authenticated caller identity
    #[error("caller identity required")]
    Unauthorized,

    /// Caller does not own the resource it is acting on
    #[error("caller does not own this resource")]
    Forbidden,

    /// A referenced record does not exist
    #[error("{what} {id} not found")]
    NotFound {
        /// Kind of record ("booking", "hold", ...)
        what: &'static str,
        /// Identifier that failed to resolve
        id: String,
    },

    /// Concurrent interference or tampering: seats taken, ledger moved
    /// underneath us, or a callback amount that does not match
    #[error("conflict: {reason}")]
    Conflict {
        /// What went wrong
        reason: String,
        /// Seats involved, when the conflict is seat-shaped
        seats: Vec<SeatCode>,
    },

    /// The hold expired or never existed
    #[error("hold {0} expired or no longer exists")]
    HoldGone(HoldId),

    /// Upstream payment gateway failure
    #[error("payment gateway failure: {0}")]
    Gateway(#[from] GatewayError),

    /// Storage-layer failure
    #[error("storage failure: {0}")]
    Storage(String),
}

impl BookingError {
    /// Seat-shaped conflict helper.
    #[must_use]
    pub fn seat_conflict(reason: impl Into<String>, seats: Vec<SeatCode>) -> Self {
        Self::Conflict {
            reason: reason.into(),
            seats,
        }
    }

    /// Conflict without seat detail.
    #[must_use]
    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
            seats: Vec::new(),
        }
    }
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err.to_string())
    }
}
