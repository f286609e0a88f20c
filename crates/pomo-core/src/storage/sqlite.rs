//! SQLite-based interval storage.
//!
//! Keeps the full interval history on disk so progress survives process
//! restarts, and lets a second process (`pomo pause`) reach a timer that is
//! running elsewhere. Durations are stored as integer milliseconds, start
//! times as RFC 3339 text.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::error::{PomoError, Result, StorageError};
use crate::timer::{Category, Interval, State};

use super::{data_dir, Storage};

const COLUMNS: &str = "id, start_time, planned_duration, actual_duration, category, state";

/// SQLite database for interval storage.
///
/// The connection sits behind a mutex, so reads and writes are serialized.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

/// A row as stored, before validation.
struct RawInterval {
    id: i64,
    start_time: Option<String>,
    planned_ms: i64,
    actual_ms: i64,
    category: String,
    state: i64,
}

impl RawInterval {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            start_time: row.get(1)?,
            planned_ms: row.get(2)?,
            actual_ms: row.get(3)?,
            category: row.get(4)?,
            state: row.get(5)?,
        })
    }
}

impl TryFrom<RawInterval> for Interval {
    type Error = PomoError;

    fn try_from(raw: RawInterval) -> Result<Self> {
        let start_time = raw
            .start_time
            .map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|t| t.with_timezone(&Utc))
                    .map_err(|e| StorageError::Corrupt(format!("interval {}: start_time {s:?}: {e}", raw.id)))
            })
            .transpose()?;
        let category = raw
            .category
            .parse::<Category>()
            .map_err(|e| StorageError::Corrupt(format!("interval {}: {e}", raw.id)))?;
        Ok(Interval {
            id: raw.id,
            start_time,
            planned_duration: millis(raw.id, "planned_duration", raw.planned_ms)?,
            actual_duration: millis(raw.id, "actual_duration", raw.actual_ms)?,
            category,
            state: State::try_from(raw.state)?,
        })
    }
}

fn millis(id: i64, column: &str, ms: i64) -> Result<Duration> {
    u64::try_from(ms)
        .map(Duration::from_millis)
        .map_err(|_| StorageError::Corrupt(format!("interval {id}: {column} {ms}")).into())
}

fn to_millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

impl SqliteStorage {
    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open the database at `~/.config/pomo/pomo.db`.
    pub fn open_default() -> Result<Self> {
        Self::open(data_dir()?.join("pomo.db"))
    }

    /// Open an in-memory database (for tests and one-off runs).
    pub fn open_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS interval (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            start_time       TEXT,
            planned_duration INTEGER NOT NULL,
            actual_duration  INTEGER NOT NULL DEFAULT 0,
            category         TEXT NOT NULL,
            state            INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_interval_category ON interval(category);",
    )
}

fn select_by_id(conn: &Connection, id: i64) -> Result<Interval> {
    if id <= 0 {
        return Err(PomoError::InvalidId(id));
    }
    let raw = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM interval WHERE id = ?1"),
            params![id],
            RawInterval::from_row,
        )
        .optional()?
        .ok_or(PomoError::InvalidId(id))?;
    raw.try_into()
}

fn write(conn: &Connection, interval: &Interval) -> Result<()> {
    if interval.id <= 0 {
        return Err(PomoError::InvalidId(interval.id));
    }
    let changed = conn.execute(
        "UPDATE interval
         SET start_time = ?1, planned_duration = ?2, actual_duration = ?3,
             category = ?4, state = ?5
         WHERE id = ?6",
        params![
            interval.start_time.map(|t| t.to_rfc3339()),
            to_millis(interval.planned_duration),
            to_millis(interval.actual_duration),
            interval.category.as_str(),
            interval.state.code(),
            interval.id,
        ],
    )?;
    if changed == 0 {
        return Err(PomoError::InvalidId(interval.id));
    }
    Ok(())
}

impl Storage for SqliteStorage {
    fn create(&self, interval: &Interval) -> Result<i64> {
        let conn = self.conn.lock()?;
        conn.execute(
            "INSERT INTO interval (start_time, planned_duration, actual_duration, category, state)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                interval.start_time.map(|t| t.to_rfc3339()),
                to_millis(interval.planned_duration),
                to_millis(interval.actual_duration),
                interval.category.as_str(),
                interval.state.code(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update(&self, interval: &Interval) -> Result<()> {
        let conn = self.conn.lock()?;
        write(&conn, interval)
    }

    fn by_id(&self, id: i64) -> Result<Interval> {
        let conn = self.conn.lock()?;
        select_by_id(&conn, id)
    }

    fn last(&self) -> Result<Interval> {
        let conn = self.conn.lock()?;
        let raw = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM interval ORDER BY id DESC LIMIT 1"),
                [],
                RawInterval::from_row,
            )
            .optional()?
            .ok_or(PomoError::NoIntervals)?;
        raw.try_into()
    }

    fn breaks(&self, n: usize) -> Result<Vec<Interval>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM interval
             WHERE category != ?1
             ORDER BY id DESC
             LIMIT ?2"
        ))?;
        let limit = i64::try_from(n).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![Category::Pomodoro.as_str(), limit], RawInterval::from_row)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?.try_into()?);
        }
        Ok(out)
    }

    fn update_with(
        &self,
        id: i64,
        apply: &mut dyn FnMut(&mut Interval) -> bool,
    ) -> Result<Interval> {
        let mut conn = self.conn.lock()?;
        // IMMEDIATE takes the database write lock up front, so another
        // process cannot slip a write between the read and the update.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut interval = select_by_id(&tx, id)?;
        if apply(&mut interval) {
            write(&tx, &interval)?;
        }
        tx.commit()?;
        Ok(interval)
    }
}
