//! Error types for airport-ops.
//!
//! Policy outcomes (a rejected transition) are not errors; they are returned as
//! [`crate::transition::Decision`] values. This module covers infrastructure
//! failures and lookups that cannot be answered.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for airport-ops operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Aircraft Errors ===
    /// No aircraft is registered under the call sign.
    #[error("aircraft not found: {call_sign}")]
    AircraftNotFound {
        /// The call sign that was looked up.
        call_sign: String,
    },

    /// An aircraft with this call sign already exists.
    #[error("aircraft already exists: {call_sign}")]
    DuplicateCallSign {
        /// The conflicting call sign.
        call_sign: String,
    },

    /// A textual value could not be parsed into a domain type.
    #[error("invalid {kind}: '{value}'")]
    InvalidValue {
        /// What was being parsed (e.g. "state").
        kind: &'static str,
        /// The rejected input.
        value: String,
    },

    // === I/O Errors ===
    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for airport-ops operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create an aircraft-not-found error.
    #[must_use]
    pub fn aircraft_not_found(call_sign: impl Into<String>) -> Self {
        Self::AircraftNotFound {
            call_sign: call_sign.into(),
        }
    }

    /// Create an invalid-value error.
    #[must_use]
    pub fn invalid_value(kind: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            kind,
            value: value.into(),
        }
    }

    /// Check if this error means the aircraft does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::AircraftNotFound { .. })
    }

    /// Check if this error is a call sign uniqueness violation.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateCallSign { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::aircraft_not_found("AB1234");
        assert_eq!(err.to_string(), "aircraft not found: AB1234");

        let err = Error::internal("test error");
        assert_eq!(err.to_string(), "internal error: test error");
    }

    #[test]
    fn test_error_is_not_found() {
        assert!(Error::aircraft_not_found("X1").is_not_found());
        assert!(!Error::internal("test").is_not_found());
    }

    #[test]
    fn test_error_is_duplicate() {
        let err = Error::DuplicateCallSign {
            call_sign: "NC9574".to_string(),
        };
        assert!(err.is_duplicate());
        assert!(err.to_string().contains("NC9574"));
        assert!(!Error::aircraft_not_found("NC9574").is_duplicate());
    }

    #[test]
    fn test_invalid_value_display() {
        let err = Error::invalid_value("state", "HOVERING");
        assert_eq!(err.to_string(), "invalid state: 'HOVERING'");
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
        }
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_database_migration_error_display() {
        let err = Error::DatabaseMigration {
            message: "version mismatch".to_string(),
        };
        assert!(err.to_string().contains("version mismatch"));
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "runway_capacity must be greater than 0".to_string(),
        };
        assert!(err.to_string().contains("runway_capacity"));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}
