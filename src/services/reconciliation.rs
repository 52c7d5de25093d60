//! Payment callback reconciliation.
//!
//! Turns a verified gateway callback into a durable booking state change
//! exactly once. Gateways retry callbacks; every step here is safe to
//! replay. The idempotency gate plus the booking-status CAS guarantee
//! the ledger CONFIRM transition is performed by exactly one invocation.

use crate::error::{BookingError, Result};
use crate::gateway::{booking_code_from_correlation, CallbackEnvelope, PaymentGateway};
use crate::store::{BookingStore, HoldStore, SeatLedgerStore};
use crate::types::{Booking, BookingStatus, PaymentRecord};
use std::sync::Arc;
use tracing::{error, info, warn};

/// What reconciliation did with a callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Payment applied; booking confirmed and seats sold
    Confirmed,
    /// Replay of an already-applied callback; nothing written
    AlreadyConfirmed,
    /// Gateway reported failure; booking canceled
    Canceled,
}

/// Consumes verified callbacks and applies the resulting transition.
pub struct ReconciliationService {
    ledger: Arc<dyn SeatLedgerStore>,
    holds: Arc<dyn HoldStore>,
    bookings: Arc<dyn BookingStore>,
    gateway: Arc<dyn PaymentGateway>,
}

impl ReconciliationService {
    /// Wire up a reconciliation service
    #[must_use]
    pub fn new(
        ledger: Arc<dyn SeatLedgerStore>,
        holds: Arc<dyn HoldStore>,
        bookings: Arc<dyn BookingStore>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            ledger,
            holds,
            bookings,
            gateway,
        }
    }

    /// Reconcile one callback. Idempotent: invoking it any number of times
    /// with the same payload leaves the same state behind.
    ///
    /// # Errors
    ///
    /// [`BookingError::Validation`] for signature or payload problems (no
    /// state touched), [`BookingError::NotFound`] for unknown booking
    /// codes, [`BookingError::Conflict`] for amount mismatches or ledger
    /// discrepancies. The boundary layer translates these into the
    /// gateway's acknowledgement shape; the true outcome is reported here.
    pub async fn reconcile(&self, envelope: &CallbackEnvelope) -> Result<ReconcileOutcome> {
        let event = self
            .gateway
            .verify_callback(envelope)
            .map_err(|e| BookingError::Validation(e.to_string()))?;

        let code = booking_code_from_correlation(&event.app_trans_id).ok_or_else(|| {
            BookingError::Validation(format!(
                "malformed correlation id: {:?}",
                event.app_trans_id
            ))
        })?;
        let booking = self
            .bookings
            .get_by_code(code)
            .await?
            .ok_or(BookingError::NotFound {
                what: "booking",
                id: code.to_string(),
            })?;

        // Idempotency gate: a confirmed booking means this callback (or an
        // equivalent one) was already applied in full.
        if booking.status == BookingStatus::Confirmed {
            info!(
                booking_id = %booking.id,
                app_trans_id = %event.app_trans_id,
                "callback replay ignored: booking already confirmed"
            );
            return Ok(ReconcileOutcome::AlreadyConfirmed);
        }
        if booking.status == BookingStatus::Canceled {
            return Err(BookingError::conflict(
                "callback for a booking that is already canceled",
            ));
        }

        if event.amount != booking.amount {
            warn!(
                booking_id = %booking.id,
                expected = %booking.amount,
                received = %event.amount,
                "callback amount mismatch; booking left untouched"
            );
            return Err(BookingError::conflict("callback amount mismatch"));
        }

        if event.success {
            self.apply_success(&booking, &event).await
        } else {
            self.apply_failure(&booking).await
        }
    }

    async fn apply_success(
        &self,
        booking: &Booking,
        event: &crate::gateway::CallbackEvent,
    ) -> Result<ReconcileOutcome> {
        let payment = PaymentRecord {
            gateway: self.gateway.name().to_string(),
            transaction_id: Some(event.transaction_id.clone()),
            paid_at: event.paid_at,
            raw_payload: Some(event.raw.clone()),
        };
        let won = self
            .bookings
            .transition_status(
                booking.id,
                BookingStatus::PendingPayment,
                BookingStatus::Confirmed,
                Some(payment),
            )
            .await?;
        if !won {
            // Lost the race against a concurrent identical callback; that
            // invocation owns the ledger transition.
            let current = self.bookings.get(booking.id).await?;
            return match current.map(|b| b.status) {
                Some(BookingStatus::Confirmed) => Ok(ReconcileOutcome::AlreadyConfirmed),
                _ => Err(BookingError::conflict(
                    "booking status changed while reconciling",
                )),
            };
        }

        let requested = booking.seats.len() as u64;
        let confirmed = self
            .ledger
            .confirm_seats(booking.showtime_id, &booking.seats, booking.hold_id, booking.id)
            .await?;
        if confirmed < requested {
            // The booking stays Confirmed (the payment is real); the
            // discrepancy must reach operators, not vanish.
            error!(
                booking_id = %booking.id,
                hold_id = %booking.hold_id,
                confirmed,
                requested,
                "ledger discrepancy on payment confirmation: seats not transitioned"
            );
            return Err(BookingError::conflict(
                "payment applied but ledger seats were not all transitioned",
            ));
        }

        self.holds.delete(booking.hold_id).await?;
        info!(
            booking_id = %booking.id,
            transaction_id = %event.transaction_id,
            amount = %event.amount,
            "payment reconciled; booking confirmed"
        );
        Ok(ReconcileOutcome::Confirmed)
    }

    async fn apply_failure(&self, booking: &Booking) -> Result<ReconcileOutcome> {
        let won = self
            .bookings
            .transition_status(
                booking.id,
                BookingStatus::PendingPayment,
                BookingStatus::Canceled,
                None,
            )
            .await?;
        if !won {
            // Lost the race. A success callback may have confirmed the
            // booking between our read and the write; report what actually
            // happened instead of claiming a cancellation.
            let current = self.bookings.get(booking.id).await?;
            return match current.map(|b| b.status) {
                Some(BookingStatus::Confirmed) => Ok(ReconcileOutcome::AlreadyConfirmed),
                Some(BookingStatus::Canceled) => Ok(ReconcileOutcome::Canceled),
                _ => Err(BookingError::conflict(
                    "booking status changed while reconciling",
                )),
            };
        }

        // Optimistic release; the hold TTL would reclaim these anyway.
        let released = self
            .ledger
            .release_held(booking.showtime_id, &booking.seats, booking.hold_id)
            .await?;
        self.holds.delete(booking.hold_id).await?;
        info!(
            booking_id = %booking.id,
            released,
            "payment failed; booking canceled and seats released"
        );
        Ok(ReconcileOutcome::Canceled)
    }
}
