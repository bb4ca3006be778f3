use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use std::sync::Arc;

use crate::arbitrator::LockArbitrator;
use crate::clock::ManualClock;
use crate::config::ArbiterConfig;
use crate::confirmer::ReservationConfirmer;
use crate::infrastructure::{LockStore, ReservationStore};
use crate::infrastructure_in_memory::{InMemoryLockStore, InMemoryReservationStore};
use crate::types::*;

pub const PROPERTY: PropertyId = PropertyId(1);

pub fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn iv(start: &str, end: &str) -> Interval {
    Interval::new(day(start), day(end)).unwrap()
}

pub fn frozen_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2018, 5, 20, 12, 0, 0).unwrap()
}

pub fn guest() -> GuestDetails {
    GuestDetails::new("Bob", "Smith", "bob@example.com")
}

/// In-memory stores, a frozen clock and both engine components wired together.
pub struct Fixture {
    pub locks: Arc<InMemoryLockStore>,
    pub reservations: Arc<InMemoryReservationStore>,
    pub clock: Arc<ManualClock>,
    pub arbitrator: LockArbitrator,
    pub confirmer: ReservationConfirmer,
}

impl Fixture {
    pub fn new(lease_minutes: u32) -> Self {
        let locks = Arc::new(InMemoryLockStore::new());
        let reservations = Arc::new(InMemoryReservationStore::new());
        let clock = Arc::new(ManualClock::new(frozen_now()));
        let config = ArbiterConfig::new(lease_minutes).unwrap();

        let arbitrator = LockArbitrator::new(
            locks.clone(),
            reservations.clone(),
            clock.clone(),
            config,
        );
        let confirmer = ReservationConfirmer::new(locks.clone(), reservations.clone(), clock.clone());

        Self {
            locks,
            reservations,
            clock,
            arbitrator,
            confirmer,
        }
    }

    /// Seed a soft lock for `token` taken `minutes_ago` before the frozen now.
    pub fn lock_held_by(&self, token: &str, interval: Interval, minutes_ago: i64) -> SoftLock {
        self.locks
            .upsert(
                PROPERTY,
                &LockToken::from(token),
                interval,
                frozen_now() - Duration::minutes(minutes_ago),
            )
            .unwrap()
    }

    pub fn reserved(&self, interval: Interval) -> Reservation {
        let outcome = self
            .reservations
            .insert_if_no_overlap(PROPERTY, interval, guest(), frozen_now())
            .unwrap();
        outcome.reservation().cloned().expect("seed reservation must not conflict")
    }
}
