//! Payment gateway callback (IPN) endpoint.
//!
//! The gateway expects a `{return_code, return_message}` acknowledgement
//! and will storm retries at anything else, so this handler ALWAYS answers
//! 200 with that shape. The true outcome of reconciliation is logged and
//! never leaks internal state to the caller.

use crate::error::BookingError;
use crate::gateway::CallbackEnvelope;
use crate::server::state::AppState;
use crate::services::ReconcileOutcome;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Serialize;
use tracing::{error, info, warn};

/// Gateway-shaped acknowledgement.
#[derive(Debug, Serialize)]
pub struct IpnAck {
    /// 1 = applied, 0 = received but not applied
    pub return_code: i32,
    /// Human-readable outcome for the gateway's logs
    pub return_message: &'static str,
}

/// Receive a payment callback from the named gateway.
pub async fn receive_ipn(
    State(state): State<AppState>,
    Path(gateway): Path<String>,
    payload: Result<Json<CallbackEnvelope>, JsonRejection>,
) -> Json<IpnAck> {
    let envelope = match payload {
        Ok(Json(envelope)) => envelope,
        Err(rejection) => {
            warn!(rejection = %rejection, "callback body is not a valid envelope");
            return Json(IpnAck {
                return_code: 0,
                return_message: "received",
            });
        }
    };

    if gateway != state.gateway_name {
        warn!(gateway = %gateway, "callback for unknown gateway");
        return Json(IpnAck {
            return_code: 0,
            return_message: "received",
        });
    }

    match state.reconciliation.reconcile(&envelope).await {
        Ok(ReconcileOutcome::Confirmed) => Json(IpnAck {
            return_code: 1,
            return_message: "success",
        }),
        Ok(ReconcileOutcome::AlreadyConfirmed) => Json(IpnAck {
            return_code: 1,
            return_message: "success",
        }),
        Ok(ReconcileOutcome::Canceled) => {
            info!("failure callback applied: booking canceled");
            Json(IpnAck {
                return_code: 1,
                return_message: "success",
            })
        }
        Err(err) => {
            // Domain failure: acknowledge receipt so the gateway stops
            // retrying, surface the real problem to operators.
            match &err {
                BookingError::Validation(reason) => {
                    warn!(reason = %reason, "callback rejected: verification failed")
                }
                other => error!(error = %other, "callback reconciliation failed"),
            }
            Json(IpnAck {
                return_code: 0,
                return_message: "received",
            })
        }
    }
}
