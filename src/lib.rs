//! Cinema seat booking service.
//!
//! Books seats for cinema showtimes with two guarantees:
//!
//! - no two customers can simultaneously confirm the same seat, and
//! - an asynchronous, not-fully-trusted payment callback (IPN) that may
//!   arrive late, out of order, or repeatedly is applied to a booking
//!   exactly once.
//!
//! # Architecture
//!
//! ```text
//!            POST /showtimes/:id/hold          POST /bookings
//!                     │                              │
//!                     ▼                              ▼
//!               ┌───────────┐                 ┌──────────────┐
//!               │   Hold    │                 │   Booking    │
//!               │  Service  │                 │   Service    │──── cancel ──► Gateway.refund
//!               └───────────┘                 └──────────────┘
//!                     │                              │
//!                     ▼                              ▼
//!            ┌──────────────────────────────────────────────┐
//!            │   Seat Ledger  (per-seat CAS: FREE/HELD/     │
//!            │   CONFIRMED, expiry-aware reclamation)       │
//!            └──────────────────────────────────────────────┘
//!                                  ▲
//!                                  │ confirm / release
//!                          ┌───────────────┐        POST /payments/:gw/ipn
//!                          │ Reconciliation│◄───────────────┘
//!                          │    Service    │   (HMAC-verified callback)
//!                          └───────────────┘
//! ```
//!
//! The ledger is the single source of truth: every transition is a bulk
//! compare-and-swap whose predicate includes the expected prior state, the
//! owning hold or booking, and time-based staleness: an expired hold is
//! reclaimable in place, with no background sweep. Hold and booking
//! records are projections that must agree with the ledger's references.
//!
//! Payment confirmation is reconciled exactly once: callbacks are
//! HMAC-verified, routed by a correlation id carrying the booking code,
//! gated on the booking status, and checked for exact amount equality
//! before any write happens.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod gateway;
pub mod pricing;
pub mod server;
pub mod services;
pub mod store;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use error::{BookingError, Result};
pub use services::{BookingService, HoldService, ReconciliationService};
pub use types::*;
