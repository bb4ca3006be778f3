use std::sync::Arc;

use crate::clock::Clock;
use crate::infrastructure::{LockStore, ReservationStore, StoreError};
use crate::types::{ConfirmOutcome, GuestDetails, Interval, LockToken, PropertyId};

/// Turns a held interval into a confirmed reservation.
///
/// The soft lock is advisory. Correctness rests on the store's atomic
/// overlap-check-and-insert, so a missing or expired lock does not stop a
/// confirmation.
#[derive(Clone)]
pub struct ReservationConfirmer {
    locks: Arc<dyn LockStore>,
    reservations: Arc<dyn ReservationStore>,
    clock: Arc<dyn Clock>,
}

impl ReservationConfirmer {
    pub fn new(
        locks: Arc<dyn LockStore>,
        reservations: Arc<dyn ReservationStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            locks,
            reservations,
            clock,
        }
    }

    pub fn confirm(
        &self,
        property_id: PropertyId,
        interval: Interval,
        token: &LockToken,
        guest: GuestDetails,
    ) -> Result<ConfirmOutcome, StoreError> {
        let now = self.clock.now();

        let outcome = self
            .reservations
            .insert_if_no_overlap(property_id, interval, guest, now)?;

        match &outcome {
            ConfirmOutcome::Confirmed { reservation } => {
                tracing::info!(
                    %property_id,
                    lock_token = %token,
                    reservation_id = reservation.id,
                    interval = %reservation.interval,
                    "Reservation confirmed"
                );
                // Best effort: the lock would expire on its own anyway
                if let Err(e) = self.locks.remove(property_id, token) {
                    tracing::warn!(%property_id, lock_token = %token, error = %e, "Failed to release soft lock after confirmation");
                }
            }
            ConfirmOutcome::Conflict { kind } => {
                tracing::info!(%property_id, lock_token = %token, %interval, reason = %kind, "Confirmation lost race");
            }
        }

        Ok(outcome)
    }
}
