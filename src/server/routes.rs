//! Router configuration for the booking service.

use super::health::{health_check, readiness_check};
use super::state::AppState;
use crate::api::{availability, bookings, holds, ipn};
use axum::{
    routing::{get, post},
    Router,
};

/// Build the complete Axum router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health checks (no authentication)
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // Holds and availability
        .route("/showtimes/:id/hold", post(holds::create_hold))
        .route("/showtimes/:id/seats", get(availability::get_seat_states))
        // Bookings
        .route("/bookings", post(bookings::create_booking))
        .route("/bookings/:id", get(bookings::get_booking))
        .route("/bookings/:id/cancel", post(bookings::cancel_booking))
        // Server-to-server payment callbacks
        .route("/payments/:gateway/ipn", post(ipn::receive_ipn))
        .with_state(state)
}
