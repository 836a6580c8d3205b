use std::path::Path;
use std::sync::Mutex;

use chrono::{NaiveDate, NaiveTime};
use rusqlite::{params, Connection, OptionalExtension};

use super::store::ScheduleStore;
use super::DatabaseError;
use crate::models::{BookingOutcome, Slot, SlotKey, SlotState};

const DAY_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

/// Open a SQLite connection to the given path and run migrations
pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| DatabaseError::MigrationFailed {
            version: 0,
            reason: format!("cannot create {}: {e}", parent.display()),
        })?;
    }
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing)
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "PRAGMA journal_mode=DELETE;
         PRAGMA busy_timeout=5000;",
    )?;
    Ok(())
}

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let current_version = get_current_version(conn);

    let migrations: Vec<(i64, &str)> = vec![(
        1,
        include_str!("../../resources/migrations/001_schedule.sql"),
    )];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql).map_err(|e| DatabaseError::MigrationFailed {
                version,
                reason: e.to_string(),
            })?;
        }
    }

    Ok(())
}

/// Get the current schema version (0 if no schema exists yet)
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, Option<i64>>(0)
    })
    .ok()
    .flatten()
    .unwrap_or(0)
}

// ═══════════════════════════════════════════════════════════
// SqliteScheduleStore
// ═══════════════════════════════════════════════════════════

/// Schedule grid persisted in SQLite.
///
/// Booking is a single conditional `UPDATE`, so it stays atomic even when
/// several processes share the database file.
pub struct SqliteScheduleStore {
    conn: Mutex<Connection>,
}

impl SqliteScheduleStore {
    /// Open (or create) the schedule database at `path`.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(open_database(path)?))
    }

    /// Fresh in-memory schedule database.
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(open_memory_database()?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }
}

fn day_str(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

fn time_str(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

fn parse_slot(category: String, day: String, time: String, state: String) -> Result<Slot, DatabaseError> {
    let date = NaiveDate::parse_from_str(&day, DAY_FORMAT).map_err(|_| DatabaseError::InvalidValue {
        field: "day".into(),
        value: day.clone(),
    })?;
    let time = NaiveTime::parse_from_str(&time, TIME_FORMAT).map_err(|_| DatabaseError::InvalidValue {
        field: "start_time".into(),
        value: time.clone(),
    })?;
    Ok(Slot {
        key: SlotKey::new(category, date, time),
        state: state.parse()?,
    })
}

impl ScheduleStore for SqliteScheduleStore {
    fn slot_state(&self, key: &SlotKey) -> Result<Option<SlotState>, DatabaseError> {
        let conn = self.lock()?;
        let state: Option<String> = conn
            .query_row(
                "SELECT state FROM slots WHERE category = ?1 AND day = ?2 AND start_time = ?3",
                params![key.category, day_str(key.date), time_str(key.time)],
                |row| row.get(0),
            )
            .optional()?;
        state.map(|s| s.parse()).transpose()
    }

    fn slots_between(
        &self,
        category: &str,
        from: NaiveDate,
        to: Option<NaiveDate>,
    ) -> Result<Vec<Slot>, DatabaseError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT category, day, start_time, state FROM slots
             WHERE category = ?1 AND day >= ?2 AND (?3 IS NULL OR day <= ?3)
             ORDER BY day ASC, start_time ASC",
        )?;

        let rows = stmt.query_map(params![category, day_str(from), to.map(day_str)], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut slots = Vec::new();
        for row in rows {
            let (category, day, time, state) = row?;
            slots.push(parse_slot(category, day, time, state)?);
        }
        Ok(slots)
    }

    fn insert_slot(&self, key: SlotKey, state: SlotState) -> Result<(), DatabaseError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO slots (category, day, start_time, state) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (category, day, start_time) DO UPDATE SET state = excluded.state",
            params![key.category, day_str(key.date), time_str(key.time), state.as_str()],
        )?;
        Ok(())
    }

    fn book(&self, key: &SlotKey) -> Result<BookingOutcome, DatabaseError> {
        let conn = self.lock()?;
        let day = day_str(key.date);
        let time = time_str(key.time);

        let changed = conn.execute(
            "UPDATE slots SET state = 'booked', booked_at = datetime('now')
             WHERE category = ?1 AND day = ?2 AND start_time = ?3 AND state = 'available'",
            params![key.category, day, time],
        )?;

        let outcome = if changed == 1 {
            BookingOutcome::Booked
        } else {
            let exists: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM slots WHERE category = ?1 AND day = ?2 AND start_time = ?3",
                    params![key.category, day, time],
                    |row| row.get(0),
                )
                .optional()?;
            if exists.is_some() {
                BookingOutcome::AlreadyBooked
            } else {
                BookingOutcome::NotOffered
            }
        };

        tracing::debug!(category = %key.category, at = %key.starts_at(), ?outcome, "Booking attempt");
        Ok(outcome)
    }

    fn categories(&self) -> Result<Vec<String>, DatabaseError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT DISTINCT category FROM slots ORDER BY category ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        rows.map(|r| r.map_err(DatabaseError::from)).collect()
    }
}
