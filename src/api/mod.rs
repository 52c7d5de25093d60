//! HTTP API handlers.
//!
//! Thin translation layer over the core services: extract, call, map the
//! typed result to a response. No booking logic lives here.

pub mod availability;
pub mod bookings;
pub mod error;
pub mod holds;
pub mod ipn;

pub use error::ApiError;

use crate::types::CustomerId;
use axum::http::HeaderMap;
use uuid::Uuid;

/// Header the (out-of-scope) auth layer uses to convey the caller.
pub const CUSTOMER_HEADER: &str = "x-customer-id";

/// Extract the caller identity from request headers.
///
/// Authentication itself is an external collaborator; by the time requests
/// reach this service the gateway has resolved the session to a customer
/// UUID in [`CUSTOMER_HEADER`].
///
/// # Errors
///
/// 401 when the header is absent or not a UUID.
pub fn customer_from_headers(headers: &HeaderMap) -> Result<CustomerId, ApiError> {
    headers
        .get(CUSTOMER_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .filter(|id| !id.is_nil())
        .map(CustomerId::from_uuid)
        .ok_or_else(|| ApiError::unauthorized("missing or invalid caller identity"))
}
