//! SQLite-backed lock and reservation stores.
//! Soft locks and reservations persist across server restarts.
//!
//! Enable with the `sqlite` feature flag:
//! ```toml
//! staylock-core = { path = "../staylock-core", features = ["sqlite"] }
//! ```

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::sync::{Mutex, MutexGuard};

use crate::infrastructure::{LockStore, ReservationStore, StoreError};
use crate::types::*;

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Backend(Box::new(e))
    }
}

/// A persistent store backed by SQLite, implementing both [`LockStore`] and
/// [`ReservationStore`] over one database.
///
/// Uses WAL mode. Reservation inserts run in an `IMMEDIATE` transaction, which
/// takes SQLite's write lock before the overlap check.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a SQLite database at the given path.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;

        // journal_mode answers with the mode in effect; ":memory:" stays "memory"
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS soft_locks (
                property_id   INTEGER NOT NULL,
                token         TEXT NOT NULL,
                start_day     INTEGER NOT NULL,
                end_day       INTEGER NOT NULL,
                created_at_ms INTEGER NOT NULL,
                PRIMARY KEY (property_id, token)
            );
            CREATE INDEX IF NOT EXISTS idx_soft_locks_created ON soft_locks(created_at_ms);

            CREATE TABLE IF NOT EXISTS reservations (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                property_id   INTEGER NOT NULL,
                start_day     INTEGER NOT NULL,
                end_day       INTEGER NOT NULL,
                first_name    TEXT NOT NULL,
                last_name     TEXT NOT NULL,
                email         TEXT NOT NULL,
                created_at_ms INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_reservations_property
                ON reservations(property_id, start_day);",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn row_day(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDate> {
        let days: i32 = row.get(idx)?;
        NaiveDate::from_num_days_from_ce_opt(days).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                Type::Integer,
                format!("day number out of range: {days}").into(),
            )
        })
    }

    fn row_interval(row: &rusqlite::Row, start_idx: usize) -> rusqlite::Result<Interval> {
        let start = Self::row_day(row, start_idx)?;
        let end = Self::row_day(row, start_idx + 1)?;
        Interval::new(start, end)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(start_idx, Type::Integer, Box::new(e)))
    }

    fn row_timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
        let ms: i64 = row.get(idx)?;
        DateTime::from_timestamp_millis(ms).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                Type::Integer,
                format!("timestamp out of range: {ms}").into(),
            )
        })
    }

    fn row_to_lock(row: &rusqlite::Row) -> rusqlite::Result<SoftLock> {
        Ok(SoftLock {
            property_id: property_from_sql(row.get(0)?),
            token: LockToken::new(row.get::<_, String>(1)?),
            interval: Self::row_interval(row, 2)?,
            created_at: Self::row_timestamp(row, 4)?,
        })
    }

    fn row_to_reservation(row: &rusqlite::Row) -> rusqlite::Result<Reservation> {
        Ok(Reservation {
            id: row.get(0)?,
            property_id: property_from_sql(row.get(1)?),
            interval: Self::row_interval(row, 2)?,
            guest: GuestDetails {
                first_name: row.get(4)?,
                last_name: row.get(5)?,
                email: row.get(6)?,
            },
            created_at: Self::row_timestamp(row, 7)?,
        })
    }

    fn query_reservations(
        conn: &Connection,
        property_id: PropertyId,
        interval: Option<&Interval>,
    ) -> rusqlite::Result<Vec<Reservation>> {
        const COLUMNS: &str = "SELECT id, property_id, start_day, end_day, first_name, last_name, email, created_at_ms
                               FROM reservations";

        match interval {
            Some(interval) => {
                let mut stmt = conn.prepare_cached(&format!(
                    "{COLUMNS} WHERE property_id = ?1 AND start_day < ?2 AND ?3 < end_day
                     ORDER BY start_day, end_day"
                ))?;
                let rows = stmt.query_map(
                    params![sql_id(property_id), sql_day(interval.end()), sql_day(interval.start())],
                    Self::row_to_reservation,
                )?;
                let reservations = rows.collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(reservations)
            }
            None => {
                let mut stmt = conn.prepare_cached(&format!(
                    "{COLUMNS} WHERE property_id = ?1 ORDER BY start_day, end_day"
                ))?;
                let rows = stmt.query_map(params![sql_id(property_id)], Self::row_to_reservation)?;
                let reservations = rows.collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(reservations)
            }
        }
    }
}

// Dates are stored as day numbers so range comparisons hold for any year.
fn sql_day(date: NaiveDate) -> i32 {
    date.num_days_from_ce()
}

// SQLite integers are signed 64-bit; ids round-trip through their bit pattern.
fn sql_id(property_id: PropertyId) -> i64 {
    property_id.0 as i64
}

fn property_from_sql(raw: i64) -> PropertyId {
    PropertyId(raw as u64)
}

// Stored timestamps have millisecond precision; callers get back what was written.
fn truncate_to_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(at.timestamp_millis()).unwrap_or(at)
}

impl LockStore for SqliteStore {
    fn list_live(
        &self,
        property_id: PropertyId,
        now: DateTime<Utc>,
        lease: Duration,
    ) -> Result<Vec<SoftLock>, StoreError> {
        let cutoff = (now - lease).timestamp_millis();
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT property_id, token, start_day, end_day, created_at_ms
             FROM soft_locks WHERE property_id = ?1 AND created_at_ms > ?2",
        )?;
        let locks = stmt
            .query_map(params![sql_id(property_id), cutoff], Self::row_to_lock)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(locks)
    }

    fn upsert(
        &self,
        property_id: PropertyId,
        token: &LockToken,
        interval: Interval,
        now: DateTime<Utc>,
    ) -> Result<SoftLock, StoreError> {
        let lock = SoftLock::new(property_id, token.clone(), interval, truncate_to_millis(now));
        self.conn()?.execute(
            "INSERT INTO soft_locks (property_id, token, start_day, end_day, created_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (property_id, token) DO UPDATE SET
                start_day = excluded.start_day,
                end_day = excluded.end_day,
                created_at_ms = excluded.created_at_ms",
            params![
                sql_id(property_id),
                token.as_str(),
                sql_day(interval.start()),
                sql_day(interval.end()),
                lock.created_at.timestamp_millis(),
            ],
        )?;
        Ok(lock)
    }

    fn get(&self, property_id: PropertyId, token: &LockToken) -> Result<Option<SoftLock>, StoreError> {
        let lock = self
            .conn()?
            .query_row(
                "SELECT property_id, token, start_day, end_day, created_at_ms
                 FROM soft_locks WHERE property_id = ?1 AND token = ?2",
                params![sql_id(property_id), token.as_str()],
                Self::row_to_lock,
            )
            .optional()?;
        Ok(lock)
    }

    fn remove(&self, property_id: PropertyId, token: &LockToken) -> Result<bool, StoreError> {
        let rows = self.conn()?.execute(
            "DELETE FROM soft_locks WHERE property_id = ?1 AND token = ?2",
            params![sql_id(property_id), token.as_str()],
        )?;
        Ok(rows > 0)
    }

    fn evict_expired(&self, now: DateTime<Utc>, lease: Duration) -> Result<usize, StoreError> {
        let cutoff = (now - lease).timestamp_millis();
        let rows = self.conn()?.execute(
            "DELETE FROM soft_locks WHERE created_at_ms <= ?1",
            params![cutoff],
        )?;
        Ok(rows)
    }
}

impl ReservationStore for SqliteStore {
    fn list_overlapping(
        &self,
        property_id: PropertyId,
        interval: &Interval,
    ) -> Result<Vec<Reservation>, StoreError> {
        let conn = self.conn()?;
        Ok(Self::query_reservations(&conn, property_id, Some(interval))?)
    }

    fn list(&self, property_id: PropertyId) -> Result<Vec<Reservation>, StoreError> {
        let conn = self.conn()?;
        Ok(Self::query_reservations(&conn, property_id, None)?)
    }

    fn insert_if_no_overlap(
        &self,
        property_id: PropertyId,
        interval: Interval,
        guest: GuestDetails,
        now: DateTime<Utc>,
    ) -> Result<ConfirmOutcome, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let overlapping = Self::query_reservations(&tx, property_id, Some(&interval))?;
        if !overlapping.is_empty() {
            // Dropping the transaction rolls it back
            return Ok(ConfirmOutcome::Conflict {
                kind: ConflictKind::AlreadyReserved,
            });
        }

        let created_at = truncate_to_millis(now);
        tx.execute(
            "INSERT INTO reservations (property_id, start_day, end_day, first_name, last_name, email, created_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                sql_id(property_id),
                sql_day(interval.start()),
                sql_day(interval.end()),
                guest.first_name,
                guest.last_name,
                guest.email,
                created_at.timestamp_millis(),
            ],
        )?;
        let id = tx.last_insert_rowid() as u64;
        tx.commit()?;

        Ok(ConfirmOutcome::Confirmed {
            reservation: Reservation {
                id,
                property_id,
                interval,
                guest,
                created_at,
            },
        })
    }
}
