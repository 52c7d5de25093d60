//! Application state for the booking HTTP server.

use crate::clock::Clock;
use crate::services::{BookingService, HoldService, ReconciliationService};
use crate::store::SeatLedgerStore;
use std::sync::Arc;

/// Shared state handed to every HTTP handler.
///
/// Cloned (cheaply via `Arc`) per request.
#[derive(Clone)]
pub struct AppState {
    /// Hold creation
    pub hold_service: Arc<HoldService>,
    /// Booking lifecycle (create, read, cancel)
    pub booking_service: Arc<BookingService>,
    /// Payment callback reconciliation
    pub reconciliation: Arc<ReconciliationService>,
    /// Ledger, for availability reads
    pub ledger: Arc<dyn SeatLedgerStore>,
    /// Clock, for expiry-aware reads
    pub clock: Arc<dyn Clock>,
    /// Name of the configured gateway; callbacks for other names are
    /// acknowledged but not applied
    pub gateway_name: String,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        hold_service: Arc<HoldService>,
        booking_service: Arc<BookingService>,
        reconciliation: Arc<ReconciliationService>,
        ledger: Arc<dyn SeatLedgerStore>,
        clock: Arc<dyn Clock>,
        gateway_name: String,
    ) -> Self {
        Self {
            hold_service,
            booking_service,
            reconciliation,
            ledger,
            clock,
            gateway_name,
        }
    }
}
