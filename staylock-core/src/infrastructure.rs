use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::types::{ConfirmOutcome, GuestDetails, Interval, LockToken, PropertyId, Reservation, SoftLock};

/// Transport or transaction failure inside a store backend.
///
/// Never a conflict: conflicts are returned as outcomes.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing database failed or refused the operation.
    #[error("store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("store mutex poisoned by a panicking writer")]
    Poisoned,
}

/// Durable record of soft locks, keyed by `(property_id, token)`.
///
/// Every call may block. Implementations must be shareable across threads.
pub trait LockStore: Send + Sync {
    /// Locks on `property_id` that are live at `now` under `lease`.
    fn list_live(
        &self,
        property_id: PropertyId,
        now: DateTime<Utc>,
        lease: Duration,
    ) -> Result<Vec<SoftLock>, StoreError>;

    /// Write the token's lock, replacing any previous one for this property.
    fn upsert(
        &self,
        property_id: PropertyId,
        token: &LockToken,
        interval: Interval,
        now: DateTime<Utc>,
    ) -> Result<SoftLock, StoreError>;

    /// The token's lock for this property, live or not.
    fn get(&self, property_id: PropertyId, token: &LockToken) -> Result<Option<SoftLock>, StoreError>;

    /// Drop the token's lock. Returns whether one existed.
    fn remove(&self, property_id: PropertyId, token: &LockToken) -> Result<bool, StoreError>;

    /// Physically delete every lock expired at `now`. Returns the count.
    fn evict_expired(&self, now: DateTime<Utc>, lease: Duration) -> Result<usize, StoreError>;
}

/// Durable record of confirmed reservations.
pub trait ReservationStore: Send + Sync {
    /// Reservations on `property_id` overlapping `interval`.
    fn list_overlapping(
        &self,
        property_id: PropertyId,
        interval: &Interval,
    ) -> Result<Vec<Reservation>, StoreError>;

    /// All reservations on `property_id`, ordered by interval.
    fn list(&self, property_id: PropertyId) -> Result<Vec<Reservation>, StoreError>;

    /// Atomically check for overlap and insert.
    ///
    /// Serialized against every other insert on the same property. Returns
    /// `ConfirmOutcome::Conflict { AlreadyReserved }` without writing when an
    /// overlapping reservation exists.
    fn insert_if_no_overlap(
        &self,
        property_id: PropertyId,
        interval: Interval,
        guest: GuestDetails,
        now: DateTime<Utc>,
    ) -> Result<ConfirmOutcome, StoreError>;
}
