//! Storage layer for airport-ops.
//!
//! This module provides `SQLite`-based persistent storage for aircraft records
//! and the state change log. All queries live on [`Repository`], which works
//! over either the plain connection or an open transaction; the control tower
//! uses [`Storage::transaction`] to run each read-decide-write sequence
//! atomically.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::{Aircraft, AircraftState, AircraftType, Position, StateChangeLog};
use crate::transition::OccupancySnapshot;

/// Default time to wait on a locked database.
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const AIRCRAFT_COLUMNS: &str =
    "id, call_sign, aircraft_type, state, longitude, latitude, altitude, heading, updated_at";

const LOG_COLUMNS: &str = "id, call_sign, from_state, to_state, outcome, description, timestamp";

/// Storage engine for aircraft and their state change history.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Like [`Storage::open`], waiting up to `busy_timeout` for other writers.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open_with_timeout(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Queries against the connection outside of any explicit transaction.
    #[must_use]
    pub fn repository(&self) -> Repository<'_> {
        Repository::new(&self.conn)
    }

    /// Run `f` inside an IMMEDIATE transaction.
    ///
    /// The write lock is taken before `f` runs, so reads made inside `f`
    /// cannot be invalidated by another writer before the commit. The
    /// transaction commits when `f` returns `Ok` and rolls back otherwise.
    ///
    /// # Errors
    ///
    /// Returns the error from `f`, or a database error from begin/commit.
    pub fn transaction<T>(&mut self, f: impl FnOnce(&Repository<'_>) -> Result<T>) -> Result<T> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&Repository::new(&tx))?;
        tx.commit()?;
        Ok(value)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let repo = self.repository();
        let total_aircraft = repo.count_aircraft(None, None)?;
        let total_logs = repo.count_logs()?;
        let newest_log = repo.list_logs(1, 0)?.first().map(|entry| entry.timestamp);

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            total_aircraft,
            total_logs,
            newest_log,
            db_size_bytes,
        })
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    /// Aircraft currently registered.
    pub total_aircraft: u32,
    /// State change log entries.
    pub total_logs: i64,
    /// Timestamp of the newest log entry.
    pub newest_log: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

/// Aircraft and state change log queries over one connection or transaction.
#[derive(Debug, Clone, Copy)]
pub struct Repository<'c> {
    conn: &'c Connection,
}

impl<'c> Repository<'c> {
    /// Wrap a connection (a `Transaction` derefs to one).
    #[must_use]
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    // === Aircraft ===

    /// Look up an aircraft by call sign.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn find_aircraft(&self, call_sign: &str) -> Result<Option<Aircraft>> {
        let sql = format!("SELECT {AIRCRAFT_COLUMNS} FROM aircraft WHERE call_sign = ?1");
        let aircraft = self
            .conn
            .query_row(&sql, [call_sign], row_to_aircraft)
            .optional()?;
        Ok(aircraft)
    }

    /// Fetch an aircraft that must exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AircraftNotFound`] if no aircraft has this call sign.
    pub fn get_aircraft(&self, call_sign: &str) -> Result<Aircraft> {
        self.find_aircraft(call_sign)?
            .ok_or_else(|| Error::aircraft_not_found(call_sign))
    }

    /// Insert a new aircraft and return its row id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateCallSign`] if the call sign is taken.
    pub fn create_aircraft(&self, aircraft: &Aircraft) -> Result<i64> {
        let result = self.conn.execute(
            r"
            INSERT INTO aircraft
                (call_sign, aircraft_type, state, longitude, latitude, altitude, heading, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
            params![
                aircraft.call_sign,
                aircraft.aircraft_type.as_str(),
                aircraft.state.as_str(),
                aircraft.position.longitude,
                aircraft.position.latitude,
                aircraft.position.altitude,
                aircraft.position.heading,
                format_timestamp(aircraft.updated_at),
            ],
        );

        match result {
            Ok(_) => {
                let id = self.conn.last_insert_rowid();
                debug!("Created aircraft {} with id {}", aircraft.call_sign, id);
                Ok(id)
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(Error::DuplicateCallSign {
                    call_sign: aircraft.call_sign.clone(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write state and position of an existing aircraft. The type is never
    /// rewritten.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AircraftNotFound`] if the aircraft does not exist.
    pub fn update_aircraft(&self, aircraft: &Aircraft) -> Result<()> {
        let affected = self.conn.execute(
            r"
            UPDATE aircraft
            SET state = ?2, longitude = ?3, latitude = ?4, altitude = ?5, heading = ?6,
                updated_at = ?7
            WHERE call_sign = ?1
            ",
            params![
                aircraft.call_sign,
                aircraft.state.as_str(),
                aircraft.position.longitude,
                aircraft.position.latitude,
                aircraft.position.altitude,
                aircraft.position.heading,
                format_timestamp(aircraft.updated_at),
            ],
        )?;

        if affected == 0 {
            return Err(Error::aircraft_not_found(&aircraft.call_sign));
        }
        Ok(())
    }

    /// Store a new position for an existing aircraft.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AircraftNotFound`] if the aircraft does not exist.
    pub fn update_position(&self, call_sign: &str, position: Position) -> Result<()> {
        let affected = self.conn.execute(
            r"
            UPDATE aircraft
            SET longitude = ?2, latitude = ?3, altitude = ?4, heading = ?5, updated_at = ?6
            WHERE call_sign = ?1
            ",
            params![
                call_sign,
                position.longitude,
                position.latitude,
                position.altitude,
                position.heading,
                format_timestamp(Utc::now()),
            ],
        )?;

        if affected == 0 {
            return Err(Error::aircraft_not_found(call_sign));
        }
        Ok(())
    }

    /// Count aircraft, optionally restricted to a state and/or a type.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count_aircraft(
        &self,
        state: Option<AircraftState>,
        aircraft_type: Option<AircraftType>,
    ) -> Result<u32> {
        let count: i64 = self.conn.query_row(
            r"
            SELECT COUNT(*) FROM aircraft
            WHERE (?1 IS NULL OR state = ?1) AND (?2 IS NULL OR aircraft_type = ?2)
            ",
            params![
                state.map(AircraftState::as_str),
                aircraft_type.map(AircraftType::as_str)
            ],
            |row| row.get(0),
        )?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    /// Read the counts of aircraft per state and type.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn occupancy(&self) -> Result<OccupancySnapshot> {
        let mut stmt = self.conn.prepare(
            "SELECT state, aircraft_type, COUNT(*) FROM aircraft GROUP BY state, aircraft_type",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut snapshot = OccupancySnapshot::default();
        for (state, aircraft_type, count) in rows {
            match (state.parse(), aircraft_type.parse()) {
                (Ok(state), Ok(aircraft_type)) => {
                    snapshot.add(state, aircraft_type, u32::try_from(count).unwrap_or(u32::MAX));
                }
                _ => warn!(
                    "Ignoring {} aircraft with unknown state/type: {}/{}",
                    count, state, aircraft_type
                ),
            }
        }
        Ok(snapshot)
    }

    /// The earliest-registered aircraft in `state`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn first_in_state(&self, state: AircraftState) -> Result<Option<Aircraft>> {
        let sql = format!(
            "SELECT {AIRCRAFT_COLUMNS} FROM aircraft WHERE state = ?1 ORDER BY id ASC LIMIT 1"
        );
        let aircraft = self
            .conn
            .query_row(&sql, [state.as_str()], row_to_aircraft)
            .optional()?;
        Ok(aircraft)
    }

    /// All aircraft ordered by call sign.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_aircraft(&self) -> Result<Vec<Aircraft>> {
        let sql = format!("SELECT {AIRCRAFT_COLUMNS} FROM aircraft ORDER BY call_sign ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let aircraft = stmt
            .query_map([], row_to_aircraft)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(aircraft)
    }

    /// Delete every aircraft. Returns the number deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_all_aircraft(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM aircraft", [])?)
    }

    // === State change log ===

    /// Append a log entry and return its row id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn append_log(&self, entry: &StateChangeLog) -> Result<i64> {
        self.conn.execute(
            r"
            INSERT INTO state_change_logs
                (call_sign, from_state, to_state, outcome, description, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
            params![
                entry.call_sign,
                entry.from_state.map(AircraftState::as_str),
                entry.to_state.as_str(),
                entry.outcome.as_str(),
                entry.description,
                format_timestamp(entry.timestamp),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!(
            "Logged {} {} -> {} for {} (id {})",
            entry.outcome,
            entry.from_state.map_or("-", AircraftState::as_str),
            entry.to_state,
            entry.call_sign,
            id
        );
        Ok(id)
    }

    /// Log entries newest first, skipping `offset` and returning at most `limit`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_logs(&self, limit: usize, offset: usize) -> Result<Vec<StateChangeLog>> {
        let sql = format!(
            "SELECT {LOG_COLUMNS} FROM state_change_logs \
             ORDER BY id DESC LIMIT ?1 OFFSET ?2"
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let offset_i64 = i64::try_from(offset).unwrap_or(i64::MAX);
        let entries = stmt
            .query_map(params![limit_i64, offset_i64], row_to_log)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Log entries of one aircraft, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_logs_for(&self, call_sign: &str, limit: usize) -> Result<Vec<StateChangeLog>> {
        let sql = format!(
            "SELECT {LOG_COLUMNS} FROM state_change_logs WHERE call_sign = ?1 \
             ORDER BY id DESC LIMIT ?2"
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let entries = stmt
            .query_map(params![call_sign, limit_i64], row_to_log)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Count log entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count_logs(&self) -> Result<i64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM state_change_logs", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Delete every log entry. Returns the number deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_all_logs(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM state_change_logs", [])?)
    }
}

/// Fixed-width UTC timestamps so that text order equals time order.
fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(text: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(text).map_or_else(
        |_| {
            warn!("Unparseable timestamp in database: {}", text);
            Utc::now()
        },
        |dt| dt.with_timezone(&Utc),
    )
}

fn parse_column<T>(idx: usize, text: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = Error>,
{
    text.parse().map_err(|e: Error| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.to_string().into())
    })
}

/// Convert a database row to an Aircraft struct.
fn row_to_aircraft(row: &rusqlite::Row) -> rusqlite::Result<Aircraft> {
    let aircraft_type: String = row.get(2)?;
    let state: String = row.get(3)?;
    let updated_at: String = row.get(8)?;

    Ok(Aircraft {
        id: Some(row.get(0)?),
        call_sign: row.get(1)?,
        aircraft_type: parse_column(2, &aircraft_type)?,
        state: parse_column(3, &state)?,
        position: Position {
            longitude: row.get(4)?,
            latitude: row.get(5)?,
            altitude: row.get(6)?,
            heading: row.get(7)?,
        },
        updated_at: parse_timestamp(&updated_at),
    })
}

/// Convert a database row to a `StateChangeLog` struct.
fn row_to_log(row: &rusqlite::Row) -> rusqlite::Result<StateChangeLog> {
    let from_state: Option<String> = row.get(2)?;
    let to_state: String = row.get(3)?;
    let outcome: String = row.get(4)?;
    let timestamp: String = row.get(6)?;

    Ok(StateChangeLog {
        id: Some(row.get(0)?),
        call_sign: row.get(1)?,
        from_state: from_state
            .as_deref()
            .map(|text| parse_column(2, text))
            .transpose()?,
        to_state: parse_column(3, &to_state)?,
        outcome: parse_column(4, &outcome)?,
        description: row.get(5)?,
        timestamp: parse_timestamp(&timestamp),
    })
}
