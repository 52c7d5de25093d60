//! Booking lifecycle: hold consumption and cancellation.

use crate::clock::Clock;
use crate::error::{BookingError, Result};
use crate::gateway::{OrderIntent, OrderRequest, PaymentGateway, RefundIntent};
use crate::store::{BookingStore, HoldStore, SeatLedgerStore};
use crate::types::{
    Booking, BookingId, BookingStatus, CustomerId, HoldId, PaymentMethod, PaymentRecord,
};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Outcome of creating a booking.
#[derive(Clone, Debug)]
pub struct BookingReceipt {
    /// The created booking
    pub booking: Booking,
    /// Signed gateway order, present for deferred-payment bookings
    pub gateway_order: Option<OrderRequest>,
}

/// Converts holds into bookings and cancels confirmed bookings.
pub struct BookingService {
    ledger: Arc<dyn SeatLedgerStore>,
    holds: Arc<dyn HoldStore>,
    bookings: Arc<dyn BookingStore>,
    gateway: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
}

impl BookingService {
    /// Wire up a booking service
    #[must_use]
    pub fn new(
        ledger: Arc<dyn SeatLedgerStore>,
        holds: Arc<dyn HoldStore>,
        bookings: Arc<dyn BookingStore>,
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ledger,
            holds,
            bookings,
            gateway,
            clock,
        }
    }

    /// Convert a still-valid hold into a booking.
    ///
    /// Deferred payment (wallet): the booking starts `PendingPayment`, the
    /// hold and its ledger locks stay in place until reconciliation, and
    /// the signed gateway order is returned for the client to pay.
    ///
    /// Immediate payment (cash): the booking is `Confirmed` and the ledger
    /// transitions `Held -> Confirmed` in one conditional write. Booking
    /// row and ledger are treated as one unit: if the ledger transition
    /// comes up short, the booking is compensated back to `Canceled`, any
    /// confirmed seats are released, and the call fails with a conflict.
    ///
    /// # Errors
    ///
    /// [`BookingError::HoldGone`] when the hold is missing or expired,
    /// [`BookingError::Forbidden`] when the caller does not own the hold,
    /// [`BookingError::Conflict`] when the ledger moved underneath us.
    pub async fn create_booking(
        &self,
        hold_id: HoldId,
        customer_id: CustomerId,
        method: PaymentMethod,
    ) -> Result<BookingReceipt> {
        if customer_id.is_nil() {
            return Err(BookingError::Unauthorized);
        }
        let now = self.clock.now();
        let hold = self
            .holds
            .get(hold_id)
            .await?
            .ok_or(BookingError::HoldGone(hold_id))?;
        if hold.customer_id != customer_id {
            return Err(BookingError::Forbidden);
        }
        if !hold.is_valid_at(now) {
            return Err(BookingError::HoldGone(hold_id));
        }

        match method {
            PaymentMethod::Wallet => {
                let payment = PaymentRecord::pending(self.gateway.name().to_string());
                let booking =
                    Booking::from_hold(&hold, BookingStatus::PendingPayment, Some(payment), now);
                self.bookings.insert(booking.clone()).await?;

                let order = self.gateway.create_order(&OrderIntent {
                    booking_code: booking.code.clone(),
                    amount: booking.amount,
                    app_user: customer_id.to_string(),
                    now,
                })?;
                info!(
                    booking_id = %booking.id,
                    code = %booking.code,
                    hold_id = %hold_id,
                    app_trans_id = %order.app_trans_id,
                    "deferred booking created, awaiting payment callback"
                );
                Ok(BookingReceipt {
                    booking,
                    gateway_order: Some(order),
                })
            }
            PaymentMethod::Cash => {
                let booking = Booking::from_hold(&hold, BookingStatus::Confirmed, None, now);
                self.bookings.insert(booking.clone()).await?;

                let requested = hold.seats.len() as u64;
                let confirmed = self
                    .ledger
                    .confirm_seats(hold.showtime_id, &hold.seats, hold_id, booking.id)
                    .await?;
                if confirmed < requested {
                    // The ledger moved underneath us (expiry reclaim race).
                    // Compensate so the booking row never stays Confirmed
                    // while the ledger disagrees.
                    self.ledger
                        .release_confirmed(hold.showtime_id, &hold.seats, booking.id)
                        .await?;
                    self.bookings
                        .transition_status(
                            booking.id,
                            BookingStatus::Confirmed,
                            BookingStatus::Canceled,
                            None,
                        )
                        .await?;
                    warn!(
                        booking_id = %booking.id,
                        hold_id = %hold_id,
                        confirmed,
                        requested,
                        "cash booking compensated: ledger confirm fell short"
                    );
                    return Err(BookingError::conflict(
                        "seats no longer held; the hold may have expired",
                    ));
                }

                self.holds.delete(hold_id).await?;
                info!(
                    booking_id = %booking.id,
                    code = %booking.code,
                    hold_id = %hold_id,
                    seats = requested,
                    "cash booking confirmed"
                );
                Ok(BookingReceipt {
                    booking,
                    gateway_order: None,
                })
            }
        }
    }

    /// Fetch a booking by id.
    ///
    /// # Errors
    ///
    /// [`BookingError::NotFound`] for unknown ids.
    pub async fn get_booking(&self, id: BookingId) -> Result<Booking> {
        self.bookings
            .get(id)
            .await?
            .ok_or(BookingError::NotFound {
                what: "booking",
                id: id.to_string(),
            })
    }

    /// Cancel a confirmed booking, refunding through the gateway first
    /// when the payment requires it.
    ///
    /// A failed refund aborts the cancellation and leaves the booking
    /// `Confirmed`. After a successful refund (or when none is needed),
    /// the seats are released; a partial release is logged but does not
    /// block the status change. The booking's own status is the
    /// authoritative record, and leftover ledger entries are reconciled
    /// out of band.
    ///
    /// # Errors
    ///
    /// [`BookingError::NotFound`] for unknown ids,
    /// [`BookingError::Validation`] when the booking is not `Confirmed`,
    /// [`BookingError::Gateway`] when the refund call fails.
    pub async fn cancel_booking(
        &self,
        booking_id: BookingId,
        reason: Option<String>,
    ) -> Result<Booking> {
        let booking = self.get_booking(booking_id).await?;
        if booking.status != BookingStatus::Confirmed {
            return Err(BookingError::Validation(format!(
                "only confirmed bookings can be canceled (status: {})",
                booking.status
            )));
        }

        let reason = reason.unwrap_or_else(|| "customer cancellation".to_string());
        let transaction_id = booking
            .payment
            .as_ref()
            .and_then(|p| p.transaction_id.clone());

        if self.gateway.requires_refund() {
            if let Some(transaction_id) = transaction_id {
                let receipt = self
                    .gateway
                    .refund(&RefundIntent {
                        transaction_id: transaction_id.clone(),
                        amount: booking.amount,
                        description: reason.clone(),
                        now: self.clock.now(),
                    })
                    .await?;
                info!(
                    booking_id = %booking_id,
                    transaction_id = %transaction_id,
                    refund_id = %receipt.refund_id,
                    amount = %booking.amount,
                    "refund accepted by gateway"
                );
            }
        }

        let requested = booking.seats.len() as u64;
        let released = self
            .ledger
            .release_confirmed(booking.showtime_id, &booking.seats, booking_id)
            .await?;
        if released < requested {
            error!(
                booking_id = %booking_id,
                released,
                requested,
                "partial seat release on cancellation; ledger needs out-of-band reconciliation"
            );
        }

        self.bookings
            .transition_status(
                booking_id,
                BookingStatus::Confirmed,
                BookingStatus::Canceled,
                None,
            )
            .await?;
        info!(booking_id = %booking_id, reason = %reason, "booking canceled");
        self.get_booking(booking_id).await
    }
}
