//! `SQLite` schema definitions for airport-ops.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the aircraft table.
///
/// `state` and `aircraft_type` hold the upper-case textual forms of
/// [`crate::model::AircraftState`] and [`crate::model::AircraftType`].
pub const CREATE_AIRCRAFT_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS aircraft (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    call_sign TEXT NOT NULL UNIQUE,
    aircraft_type TEXT NOT NULL,
    state TEXT NOT NULL,
    longitude REAL NOT NULL DEFAULT 0,
    latitude REAL NOT NULL DEFAULT 0,
    altitude INTEGER NOT NULL DEFAULT 0,
    heading INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create an index on state for occupancy counts.
pub const CREATE_AIRCRAFT_STATE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_aircraft_state ON aircraft(state, aircraft_type)
";

/// SQL statement to create the state change log table.
///
/// `call_sign` is a plain text reference; log rows outlive the aircraft row.
pub const CREATE_STATE_LOGS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS state_change_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    call_sign TEXT NOT NULL,
    from_state TEXT,
    to_state TEXT NOT NULL,
    outcome TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    timestamp TEXT NOT NULL
)
";

/// SQL statement to create an index on timestamp for newest-first listing.
pub const CREATE_LOGS_TIMESTAMP_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_state_logs_timestamp ON state_change_logs(timestamp DESC)
";

/// SQL statement to create an index on `call_sign` for per-aircraft history.
pub const CREATE_LOGS_CALL_SIGN_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_state_logs_call_sign ON state_change_logs(call_sign)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_AIRCRAFT_TABLE,
    CREATE_AIRCRAFT_STATE_INDEX,
    CREATE_STATE_LOGS_TABLE,
    CREATE_LOGS_TIMESTAMP_INDEX,
    CREATE_LOGS_CALL_SIGN_INDEX,
    CREATE_METADATA_TABLE,
];
