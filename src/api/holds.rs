//! Seat hold endpoint.
//!
//! - POST /showtimes/:id/hold: claim a seat set for a limited time

use super::{customer_from_headers, ApiError};
use crate::server::state::AppState;
use crate::types::{Money, ShowtimeId};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to hold seats for a showtime.
#[derive(Debug, Deserialize)]
pub struct CreateHoldRequest {
    /// Seat codes to claim (normalized server-side)
    pub seats: Vec<String>,
    /// Optional hold duration override in minutes (clamped server-side)
    pub ttl_minutes: Option<i64>,
}

/// Response after a successful hold.
#[derive(Debug, Serialize)]
pub struct HoldResponse {
    /// Created hold id
    pub hold_id: Uuid,
    /// Price for the whole seat set, minor units
    pub amount: Money,
    /// Instant the hold expires
    pub expires_at: DateTime<Utc>,
}

/// Claim a seat set for a showtime.
///
/// Returns 201 with the hold id, amount, and expiry; 409 when any seat is
/// unavailable (the body names the losing seats); 401 without an identity.
pub async fn create_hold(
    State(state): State<AppState>,
    Path(showtime_id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<CreateHoldRequest>,
) -> Result<(StatusCode, Json<HoldResponse>), ApiError> {
    let customer_id = customer_from_headers(&headers)?;
    let ttl = parse_ttl(request.ttl_minutes)?;
    let receipt = state
        .hold_service
        .create_hold(
            customer_id,
            ShowtimeId::from_uuid(showtime_id),
            &request.seats,
            ttl,
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(HoldResponse {
            hold_id: *receipt.hold_id.as_uuid(),
            amount: receipt.amount,
            expires_at: receipt.expires_at,
        }),
    ))
}

/// Convert a client-supplied TTL override into a duration.
///
/// The value is untrusted input: absurd magnitudes must come back as a
/// 400 rather than overflow inside the duration arithmetic. The service
/// still clamps whatever passes here against the configured maximum.
fn parse_ttl(minutes: Option<i64>) -> Result<Option<Duration>, ApiError> {
    minutes
        .map(|m| {
            Duration::try_minutes(m).ok_or_else(|| ApiError::bad_request("ttl out of range"))
        })
        .transpose()
}
