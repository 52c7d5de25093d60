//! Booking endpoints.
//!
//! - POST /bookings: convert a hold into a booking
//! - GET /bookings/:id: read a booking back
//! - POST /bookings/:id/cancel: cancel a confirmed booking (with refund)

use super::{customer_from_headers, ApiError};
use crate::gateway::OrderRequest;
use crate::server::state::AppState;
use crate::types::{Booking, BookingId, BookingStatus, HoldId, Money, PaymentMethod};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to create a booking from a hold.
#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    /// Hold to consume
    pub hold_id: Uuid,
    /// How the customer pays
    pub payment_method: PaymentMethod,
}

/// Booking details as returned to clients.
#[derive(Debug, Serialize)]
pub struct BookingResponse {
    /// Booking id
    pub booking_id: Uuid,
    /// Human-facing code
    pub code: String,
    /// Current status
    pub status: BookingStatus,
    /// Amount, minor units
    pub amount: Money,
    /// Seat codes
    pub seats: Vec<String>,
    /// Creation instant
    pub created_at: DateTime<Utc>,
    /// Signed gateway order, present for deferred-payment bookings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_order: Option<OrderRequest>,
}

impl BookingResponse {
    fn from_booking(booking: Booking, gateway_order: Option<OrderRequest>) -> Self {
        Self {
            booking_id: *booking.id.as_uuid(),
            code: booking.code,
            status: booking.status,
            amount: booking.amount,
            seats: booking.seats.iter().map(|s| s.as_str().to_string()).collect(),
            created_at: booking.created_at,
            gateway_order,
        }
    }
}

/// Request to cancel a booking.
#[derive(Debug, Default, Deserialize)]
pub struct CancelBookingRequest {
    /// Optional cancellation reason, forwarded to the refund
    pub reason: Option<String>,
}

/// Convert a still-valid hold into a booking.
///
/// 201 on success; 410 when the hold is gone or expired; 403 when the
/// caller does not own the hold; 409 when the ledger moved underneath us.
pub async fn create_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError> {
    let customer_id = customer_from_headers(&headers)?;
    let receipt = state
        .booking_service
        .create_booking(
            HoldId::from_uuid(request.hold_id),
            customer_id,
            request.payment_method,
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(BookingResponse::from_booking(
            receipt.booking,
            receipt.gateway_order,
        )),
    ))
}

/// Read a booking back.
pub async fn get_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking = state
        .booking_service
        .get_booking(BookingId::from_uuid(booking_id))
        .await?;
    Ok(Json(BookingResponse::from_booking(booking, None)))
}

/// Cancel a confirmed booking.
///
/// 200 with the updated booking; 400 when it is not confirmed; 502 when
/// the gateway rejects the refund (the booking stays confirmed).
pub async fn cancel_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    body: Option<Json<CancelBookingRequest>>,
) -> Result<Json<BookingResponse>, ApiError> {
    let reason = body.and_then(|Json(b)| b.reason);
    let booking = state
        .booking_service
        .cancel_booking(BookingId::from_uuid(booking_id), reason)
        .await?;
    Ok(Json(BookingResponse::from_booking(booking, None)))
}
