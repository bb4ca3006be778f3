use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crate::conflict::{ConflictEngine, ConflictResult};
use crate::infrastructure::{LockStore, ReservationStore, StoreError};
use crate::types::{
    ConfirmOutcome, GuestDetails, Interval, LockToken, PropertyId, Reservation, SoftLock,
};

#[derive(Default)]
pub struct InMemoryLockStore {
    // Property -> Token -> Lock
    locks: RwLock<HashMap<PropertyId, HashMap<LockToken, SoftLock>>>,
}

impl InMemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored locks, expired ones included
    pub fn len(&self) -> usize {
        self.locks
            .read()
            .map(|locks| locks.values().map(HashMap::len).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LockStore for InMemoryLockStore {
    fn list_live(
        &self,
        property_id: PropertyId,
        now: DateTime<Utc>,
        lease: Duration,
    ) -> Result<Vec<SoftLock>, StoreError> {
        let locks = self.locks.read().map_err(|_| StoreError::Poisoned)?;
        Ok(locks
            .get(&property_id)
            .map(|held| {
                held.values()
                    .filter(|l| l.is_live(now, lease))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn upsert(
        &self,
        property_id: PropertyId,
        token: &LockToken,
        interval: Interval,
        now: DateTime<Utc>,
    ) -> Result<SoftLock, StoreError> {
        let lock = SoftLock::new(property_id, token.clone(), interval, now);
        let mut locks = self.locks.write().map_err(|_| StoreError::Poisoned)?;
        locks
            .entry(property_id)
            .or_default()
            .insert(token.clone(), lock.clone());
        Ok(lock)
    }

    fn get(&self, property_id: PropertyId, token: &LockToken) -> Result<Option<SoftLock>, StoreError> {
        let locks = self.locks.read().map_err(|_| StoreError::Poisoned)?;
        Ok(locks
            .get(&property_id)
            .and_then(|held| held.get(token))
            .cloned())
    }

    fn remove(&self, property_id: PropertyId, token: &LockToken) -> Result<bool, StoreError> {
        let mut locks = self.locks.write().map_err(|_| StoreError::Poisoned)?;
        let Some(held) = locks.get_mut(&property_id) else {
            return Ok(false);
        };
        let removed = held.remove(token).is_some();
        if held.is_empty() {
            locks.remove(&property_id);
        }
        Ok(removed)
    }

    fn evict_expired(&self, now: DateTime<Utc>, lease: Duration) -> Result<usize, StoreError> {
        let mut locks = self.locks.write().map_err(|_| StoreError::Poisoned)?;
        let mut evicted = 0;
        for held in locks.values_mut() {
            let before = held.len();
            held.retain(|_, l| l.is_live(now, lease));
            evicted += before - held.len();
        }
        locks.retain(|_, held| !held.is_empty());
        Ok(evicted)
    }
}

/// Reservations sharded per property.
///
/// The outer map lock is only held to find a shard; the check-then-insert
/// runs under the shard's own mutex, so properties never block each other.
#[derive(Default)]
pub struct InMemoryReservationStore {
    shards: RwLock<HashMap<PropertyId, Arc<Mutex<Vec<Reservation>>>>>,
    next_id: AtomicU64,
}

impl InMemoryReservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn shard(&self, property_id: PropertyId) -> Result<Arc<Mutex<Vec<Reservation>>>, StoreError> {
        if let Some(shard) = self
            .shards
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .get(&property_id)
        {
            return Ok(Arc::clone(shard));
        }

        let mut shards = self.shards.write().map_err(|_| StoreError::Poisoned)?;
        Ok(Arc::clone(shards.entry(property_id).or_default()))
    }

    fn existing_shard(
        &self,
        property_id: PropertyId,
    ) -> Result<Option<Arc<Mutex<Vec<Reservation>>>>, StoreError> {
        Ok(self
            .shards
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .get(&property_id)
            .cloned())
    }
}

impl ReservationStore for InMemoryReservationStore {
    fn list_overlapping(
        &self,
        property_id: PropertyId,
        interval: &Interval,
    ) -> Result<Vec<Reservation>, StoreError> {
        let Some(shard) = self.existing_shard(property_id)? else {
            return Ok(Vec::new());
        };
        let reservations = shard.lock().map_err(|_| StoreError::Poisoned)?;
        let mut overlapping: Vec<Reservation> = reservations
            .iter()
            .filter(|r| r.interval.overlaps(interval))
            .cloned()
            .collect();
        overlapping.sort_by_key(|r| r.interval);
        Ok(overlapping)
    }

    fn list(&self, property_id: PropertyId) -> Result<Vec<Reservation>, StoreError> {
        let Some(shard) = self.existing_shard(property_id)? else {
            return Ok(Vec::new());
        };
        let mut reservations = shard.lock().map_err(|_| StoreError::Poisoned)?.clone();
        reservations.sort_by_key(|r| r.interval);
        Ok(reservations)
    }

    fn insert_if_no_overlap(
        &self,
        property_id: PropertyId,
        interval: Interval,
        guest: GuestDetails,
        now: DateTime<Utc>,
    ) -> Result<ConfirmOutcome, StoreError> {
        let shard = self.shard(property_id)?;
        let mut reservations = shard.lock().map_err(|_| StoreError::Poisoned)?;

        if let ConflictResult::Conflict { kind, .. } =
            ConflictEngine::check_reservations(&interval, &reservations)
        {
            return Ok(ConfirmOutcome::Conflict { kind });
        }

        let reservation = Reservation {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            property_id,
            interval,
            guest,
            created_at: now,
        };
        reservations.push(reservation.clone());

        Ok(ConfirmOutcome::Confirmed { reservation })
    }
}
