//! Seat availability queries.
//!
//! - GET /showtimes/:id/seats?seats=A1,A2: expiry-aware occupancy read

use super::ApiError;
use crate::server::state::AppState;
use crate::types::{normalize_seats, SeatState, ShowtimeId};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Query parameters for the availability read.
#[derive(Debug, Deserialize)]
pub struct SeatQuery {
    /// Comma-separated seat codes
    pub seats: String,
}

/// Occupancy of a single seat.
#[derive(Debug, Serialize)]
pub struct SeatStatus {
    /// Seat code
    pub seat: String,
    /// Current state; an expired hold reads as free
    #[serde(flatten)]
    pub state: SeatState,
}

/// Availability response.
#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    /// Showtime queried
    pub showtime_id: Uuid,
    /// Per-seat occupancy
    pub seats: Vec<SeatStatus>,
}

/// Read the current occupancy of the given seats.
pub async fn get_seat_states(
    State(state): State<AppState>,
    Path(showtime_id): Path<Uuid>,
    Query(query): Query<SeatQuery>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    let raw: Vec<String> = query
        .seats
        .split(',')
        .map(str::to_string)
        .collect();
    let seats = normalize_seats(&raw)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("malformed seat list"))?;

    let states = state
        .ledger
        .seat_states(
            ShowtimeId::from_uuid(showtime_id),
            &seats,
            state.clock.now(),
        )
        .await
        .map_err(crate::error::BookingError::from)?;

    Ok(Json(AvailabilityResponse {
        showtime_id,
        seats: states
            .into_iter()
            .map(|(seat, seat_state)| SeatStatus {
                seat: seat.as_str().to_string(),
                state: seat_state,
            })
            .collect(),
    }))
}
