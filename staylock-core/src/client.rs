//! High-level client that wraps the arbitrator and confirmer over pluggable
//! storage. The CLI and HTTP server delegate to this.

use chrono::NaiveDate;
use std::sync::Arc;

use crate::arbitrator::LockArbitrator;
use crate::clock::{Clock, SystemClock};
use crate::config::ArbiterConfig;
use crate::confirmer::ReservationConfirmer;
use crate::error::{Error, Result};
use crate::infrastructure::{LockStore, ReservationStore};
use crate::infrastructure_in_memory::{InMemoryLockStore, InMemoryReservationStore};
use crate::types::*;

/// Date format accepted from callers
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// The main entry point for booking flows: probe availability with a soft
/// lock, then confirm a reservation.
///
/// Cheap to clone and safe to share between threads.
#[derive(Clone)]
pub struct BookingClient {
    locks: Arc<dyn LockStore>,
    reservations: Arc<dyn ReservationStore>,
    clock: Arc<dyn Clock>,
    arbitrator: LockArbitrator,
    confirmer: ReservationConfirmer,
}

impl BookingClient {
    /// Create a client over empty in-memory stores.
    pub fn new(config: ArbiterConfig) -> Self {
        Self::with_parts(
            Arc::new(InMemoryLockStore::new()),
            Arc::new(InMemoryReservationStore::new()),
            Arc::new(SystemClock),
            config,
        )
    }

    /// Create a client backed by SQLite at the given path.
    /// Locks and reservations persist across restarts.
    #[cfg(feature = "sqlite")]
    pub fn with_sqlite(path: &str, config: ArbiterConfig) -> Result<Self> {
        let store = Arc::new(crate::infrastructure_sqlite::SqliteStore::open(path)?);
        Ok(Self::with_parts(
            store.clone(),
            store,
            Arc::new(SystemClock),
            config,
        ))
    }

    pub fn with_parts(
        locks: Arc<dyn LockStore>,
        reservations: Arc<dyn ReservationStore>,
        clock: Arc<dyn Clock>,
        config: ArbiterConfig,
    ) -> Self {
        let arbitrator = LockArbitrator::new(
            Arc::clone(&locks),
            Arc::clone(&reservations),
            Arc::clone(&clock),
            config,
        );
        let confirmer = ReservationConfirmer::new(
            Arc::clone(&locks),
            Arc::clone(&reservations),
            Arc::clone(&clock),
        );
        Self {
            locks,
            reservations,
            clock,
            arbitrator,
            confirmer,
        }
    }

    pub fn lease_minutes(&self) -> u32 {
        self.arbitrator.config().lease_minutes
    }

    /// Probe availability and soft-lock the dates for `token`.
    pub fn check_availability(
        &self,
        property_id: PropertyId,
        check_in: &str,
        check_out: &str,
        token: &LockToken,
    ) -> Result<AcquireOutcome> {
        let interval = parse_interval(check_in, check_out)?;
        self.acquire(property_id, interval, token)
    }

    pub fn acquire(
        &self,
        property_id: PropertyId,
        interval: Interval,
        token: &LockToken,
    ) -> Result<AcquireOutcome> {
        Ok(self.arbitrator.acquire(property_id, interval, token)?)
    }

    /// Book the dates, re-validating against confirmed reservations.
    pub fn confirm_reservation(
        &self,
        property_id: PropertyId,
        check_in: &str,
        check_out: &str,
        token: &LockToken,
        guest: GuestDetails,
    ) -> Result<ConfirmOutcome> {
        let interval = parse_interval(check_in, check_out)?;
        self.confirm(property_id, interval, token, guest)
    }

    pub fn confirm(
        &self,
        property_id: PropertyId,
        interval: Interval,
        token: &LockToken,
        guest: GuestDetails,
    ) -> Result<ConfirmOutcome> {
        Ok(self.confirmer.confirm(property_id, interval, token, guest)?)
    }

    /// Confirmed reservations of a property, ordered by dates.
    pub fn reservations(&self, property_id: PropertyId) -> Result<Vec<Reservation>> {
        Ok(self.reservations.list(property_id)?)
    }

    /// Soft locks on a property that are live right now.
    pub fn live_locks(&self, property_id: PropertyId) -> Result<Vec<SoftLock>> {
        let lease = self.arbitrator.config().lease();
        Ok(self.locks.list_live(property_id, self.clock.now(), lease)?)
    }

    /// Drop a caller's hold, e.g. when the booking flow is abandoned.
    /// Returns whether a lock existed.
    pub fn release(&self, property_id: PropertyId, token: &LockToken) -> Result<bool> {
        let released = self.locks.remove(property_id, token)?;
        if released {
            tracing::info!(%property_id, lock_token = %token, "Soft lock released");
        }
        Ok(released)
    }

    /// Physically delete expired soft locks. Returns the number removed.
    pub fn evict_expired(&self) -> Result<usize> {
        let lease = self.arbitrator.config().lease();
        let evicted = self.locks.evict_expired(self.clock.now(), lease)?;
        tracing::debug!(evicted, "Expired soft locks evicted");
        Ok(evicted)
    }
}

// ─── Parsing Helpers ────────────────────────────────────────────────────────

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).map_err(|source| Error::InvalidDate {
        input: s.to_string(),
        source,
    })
}

pub fn parse_interval(check_in: &str, check_out: &str) -> Result<Interval> {
    let start = parse_date(check_in)?;
    let end = parse_date(check_out)?;
    Ok(Interval::new(start, end)?)
}
