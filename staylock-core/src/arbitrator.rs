use std::sync::Arc;

use crate::clock::Clock;
use crate::config::ArbiterConfig;
use crate::conflict::{ConflictEngine, ConflictResult};
use crate::infrastructure::{LockStore, ReservationStore, StoreError};
use crate::types::{AcquireOutcome, Interval, LockToken, PropertyId};

/// Decides whether an interval of a property may be soft-locked by a token.
///
/// Stateless over the stores: every call reads a fresh snapshot. Two racing
/// acquires on the same property may both be granted; the confirmer's
/// serialized check is the final gate.
#[derive(Clone)]
pub struct LockArbitrator {
    locks: Arc<dyn LockStore>,
    reservations: Arc<dyn ReservationStore>,
    clock: Arc<dyn Clock>,
    config: ArbiterConfig,
}

impl LockArbitrator {
    pub fn new(
        locks: Arc<dyn LockStore>,
        reservations: Arc<dyn ReservationStore>,
        clock: Arc<dyn Clock>,
        config: ArbiterConfig,
    ) -> Self {
        Self {
            locks,
            reservations,
            clock,
            config,
        }
    }

    pub fn config(&self) -> ArbiterConfig {
        self.config
    }

    /// Hold `interval` on `property_id` for `token`.
    ///
    /// Order matters: reservations first, then other tokens' live locks, then
    /// the upsert. The granted outcome echoes what the store wrote.
    pub fn acquire(
        &self,
        property_id: PropertyId,
        interval: Interval,
        token: &LockToken,
    ) -> Result<AcquireOutcome, StoreError> {
        let now = self.clock.now();
        let lease = self.config.lease();

        // 1. Confirmed bookings, regardless of token
        let reservations = self.reservations.list_overlapping(property_id, &interval)?;
        if let ConflictResult::Conflict { kind, reason } =
            ConflictEngine::check_reservations(&interval, &reservations)
        {
            tracing::debug!(%property_id, %interval, %reason, "Acquire refused");
            return Ok(AcquireOutcome::Conflict { kind });
        }

        // 2. Other callers' live holds
        let live = self.locks.list_live(property_id, now, lease)?;
        if let ConflictResult::Conflict { kind, reason } =
            ConflictEngine::check_locks(token, &interval, &live, now, lease)
        {
            tracing::debug!(%property_id, %interval, %reason, "Acquire refused");
            return Ok(AcquireOutcome::Conflict { kind });
        }

        // 3. Write (or rewrite) this token's hold
        let lock = self.locks.upsert(property_id, token, interval, now)?;
        tracing::info!(
            %property_id,
            lock_token = %token,
            interval = %lock.interval,
            expires_at = %lock.expires_at(lease),
            "Soft lock granted"
        );

        Ok(AcquireOutcome::Granted {
            interval: lock.interval,
            created_at: lock.created_at,
        })
    }
}
