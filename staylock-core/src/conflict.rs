use chrono::{DateTime, Duration, Utc};

use crate::types::{ConflictKind, Interval, LockToken, Reservation, SoftLock};

/// Represents the outcome of a conflict check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictResult {
    /// No conflict found
    Ok,
    /// A conflict was detected
    Conflict { kind: ConflictKind, reason: String },
}

impl ConflictResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, ConflictResult::Ok)
    }
}

/// A pure engine for interval conflict detection over store snapshots.
///
/// Reservations always take precedence over soft locks: a confirmed booking
/// is a stronger fact than a transient hold.
pub struct ConflictEngine;

impl ConflictEngine {
    /// Checks a requested interval against confirmed reservations.
    /// Token-independent.
    pub fn check_reservations(requested: &Interval, reservations: &[Reservation]) -> ConflictResult {
        for reservation in reservations {
            if reservation.interval.overlaps(requested) {
                return ConflictResult::Conflict {
                    kind: ConflictKind::AlreadyReserved,
                    reason: format!(
                        "{} overlaps reservation #{} on {}",
                        requested, reservation.id, reservation.interval
                    ),
                };
            }
        }

        ConflictResult::Ok
    }

    /// Checks a requested interval against other callers' live soft locks.
    pub fn check_locks(
        requesting_token: &LockToken,
        requested: &Interval,
        locks: &[SoftLock],
        now: DateTime<Utc>,
        lease: Duration,
    ) -> ConflictResult {
        for lock in locks {
            // Re-acquisition never conflicts with the caller's own lock
            if &lock.token == requesting_token {
                continue;
            }

            if !lock.is_live(now, lease) {
                continue;
            }

            if lock.interval.overlaps(requested) {
                return ConflictResult::Conflict {
                    kind: ConflictKind::BeingLocked,
                    reason: format!(
                        "{} overlaps a live hold on {} until {}",
                        requested,
                        lock.interval,
                        lock.expires_at(lease)
                    ),
                };
            }
        }

        ConflictResult::Ok
    }
}
