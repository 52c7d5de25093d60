//! The booking core: hold creation, booking lifecycle, and payment
//! reconciliation.
//!
//! Each operation is a short-lived request; correctness comes entirely
//! from conditional writes at the seat ledger, never from locks held
//! across operations.

pub mod bookings;
pub mod holds;
pub mod reconciliation;

pub use bookings::{BookingReceipt, BookingService};
pub use holds::{HoldReceipt, HoldService};
pub use reconciliation::{ReconcileOutcome, ReconciliationService};
