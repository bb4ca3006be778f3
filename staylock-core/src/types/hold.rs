use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{GuestDetails, Interval, LockToken, PropertyId};

/// A caller's time-limited, advisory claim on an interval of a property.
///
/// At most one exists per `(property_id, token)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftLock {
    pub property_id: PropertyId,
    pub token: LockToken,
    pub interval: Interval,
    /// When the lock was last (re)acquired
    pub created_at: DateTime<Utc>,
}

impl SoftLock {
    pub fn new(
        property_id: PropertyId,
        token: LockToken,
        interval: Interval,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            property_id,
            token,
            interval,
            created_at,
        }
    }

    /// Instant from which the lock no longer counts
    pub fn expires_at(&self, lease: Duration) -> DateTime<Utc> {
        self.created_at + lease
    }

    /// A lock is live iff `now - created_at < lease`.
    pub fn is_live(&self, now: DateTime<Utc>, lease: Duration) -> bool {
        now - self.created_at < lease
    }
}

/// A confirmed, permanent booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Store-assigned identifier
    pub id: u64,
    pub property_id: PropertyId,
    pub interval: Interval,
    pub guest: GuestDetails,
    pub created_at: DateTime<Utc>,
}

/// Why an interval could not be held or booked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictKind {
    /// A confirmed reservation overlaps; permanent for this interval
    AlreadyReserved,
    /// Another caller holds an overlapping live soft lock; clears within the lease
    BeingLocked,
}

impl ConflictKind {
    /// Whether retrying the same interval later can succeed
    pub fn is_transient(self) -> bool {
        matches!(self, ConflictKind::BeingLocked)
    }
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictKind::AlreadyReserved => write!(f, "ALREADY_RESERVED"),
            ConflictKind::BeingLocked => write!(f, "BEING_LOCKED"),
        }
    }
}

/// Result of asking the arbitrator to hold an interval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AcquireOutcome {
    /// The soft lock was written; echoes the stored values.
    Granted {
        interval: Interval,
        created_at: DateTime<Utc>,
    },
    Conflict {
        kind: ConflictKind,
    },
}

impl AcquireOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, AcquireOutcome::Granted { .. })
    }

    pub fn conflict_kind(&self) -> Option<ConflictKind> {
        match self {
            AcquireOutcome::Conflict { kind } => Some(*kind),
            AcquireOutcome::Granted { .. } => None,
        }
    }
}

/// Result of converting a held interval into a reservation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConfirmOutcome {
    Confirmed {
        reservation: Reservation,
    },
    /// Lost the race; only ever `AlreadyReserved`.
    Conflict {
        kind: ConflictKind,
    },
}

impl ConfirmOutcome {
    pub fn reservation(&self) -> Option<&Reservation> {
        match self {
            ConfirmOutcome::Confirmed { reservation } => Some(reservation),
            ConfirmOutcome::Conflict { .. } => None,
        }
    }
}
