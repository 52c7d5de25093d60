//! HTTP error mapping.
//!
//! Bridges the domain taxonomy to HTTP responses via Axum's
//! `IntoResponse`. Seat conflicts include the losing seats in the body so
//! clients can re-pick instead of retrying blindly.

use crate::error::BookingError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type for web handlers.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    code: &'static str,
    seats: Vec<String>,
}

impl ApiError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: &'static str) -> Self {
        Self {
            status,
            message,
            code,
            seats: Vec::new(),
        }
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message.into(), "BAD_REQUEST")
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message.into(), "UNAUTHORIZED")
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message.into(), "NOT_FOUND")
    }
}

/// JSON error body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    seats: Vec<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
                seats: self.seats,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::Validation(message) => {
                Self::new(StatusCode::BAD_REQUEST, message, "BAD_REQUEST")
            }
            BookingError::Unauthorized => Self::new(
                StatusCode::UNAUTHORIZED,
                "caller identity required".to_string(),
                "UNAUTHORIZED",
            ),
            BookingError::Forbidden => Self::new(
                StatusCode::FORBIDDEN,
                "caller does not own this resource".to_string(),
                "FORBIDDEN",
            ),
            BookingError::NotFound { what, id } => Self::new(
                StatusCode::NOT_FOUND,
                format!("{what} {id} not found"),
                "NOT_FOUND",
            ),
            BookingError::Conflict { reason, seats } => Self {
                status: StatusCode::CONFLICT,
                message: reason,
                code: "CONFLICT",
                seats: seats.iter().map(|s| s.as_str().to_string()).collect(),
            },
            BookingError::HoldGone(id) => Self::new(
                StatusCode::GONE,
                format!("hold {id} expired or no longer exists"),
                "GONE",
            ),
            BookingError::Gateway(e) => {
                tracing::error!(error = %e, "gateway failure surfaced to client");
                Self::new(
                    StatusCode::BAD_GATEWAY,
                    "payment gateway failure".to_string(),
                    "BAD_GATEWAY",
                )
            }
            BookingError::Storage(e) => {
                tracing::error!(error = %e, "storage failure surfaced to client");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                    "INTERNAL",
                )
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{HoldId, SeatCode};

    #[test]
    fn taxonomy_maps_to_expected_status_codes() {
        let cases: Vec<(BookingError, StatusCode)> = vec![
            (
                BookingError::Validation("x".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (BookingError::Unauthorized, StatusCode::UNAUTHORIZED),
            (BookingError::Forbidden, StatusCode::FORBIDDEN),
            (
                BookingError::NotFound { what: "booking", id: "x".to_string() },
                StatusCode::NOT_FOUND,
            ),
            (BookingError::conflict("x"), StatusCode::CONFLICT),
            (BookingError::HoldGone(HoldId::new()), StatusCode::GONE),
            (
                BookingError::Gateway(crate::gateway::GatewayError::Transport("x".to_string())),
                StatusCode::BAD_GATEWAY,
            ),
            (
                BookingError::Storage("x".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status, expected);
        }
    }

    #[test]
    fn conflict_carries_seat_detail() {
        let err = BookingError::seat_conflict(
            "seats unavailable",
            vec![SeatCode::parse("A1").unwrap()],
        );
        let api: ApiError = err.into();
        assert_eq!(api.seats, vec!["A1".to_string()]);
    }
}
