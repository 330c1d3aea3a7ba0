//! Configuration management for airport-ops.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::transition::{CallSignPattern, CapacityLimits, DEFAULT_CALL_SIGN_PATTERN};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "airport-ops";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "airport.db";

/// Prefix for environment variable overrides.
const ENV_PREFIX: &str = "AIRPORT_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `AIRPORT_`, `__` between sections,
///    e.g. `AIRPORT_CAPACITY__RUNWAY_CAPACITY=2`)
/// 2. TOML config file at `~/.config/airport-ops/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Airport capacity configuration.
    pub capacity: CapacityConfig,
    /// Ground crew configuration.
    pub ground_crew: GroundCrewConfig,
    /// Request validation configuration.
    pub validation: ValidationConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/airport-ops/airport.db`
    pub database_path: Option<PathBuf>,
    /// How long to wait for another writer to release the database.
    pub busy_timeout_ms: u64,
}

/// Airport capacity configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityConfig {
    /// Aircraft allowed on the runway (`TAKE_OFF` or `LANDED`) at once.
    pub runway_capacity: u32,
    /// Parking spots for airliners.
    pub airliner_parking_capacity: u32,
    /// Parking spots for private aircraft.
    pub private_parking_capacity: u32,
}

/// Ground crew configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundCrewConfig {
    /// Seconds between two sweeps of landed aircraft.
    pub sweep_interval_secs: u64,
}

/// Request validation configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Regex a call sign must match.
    pub call_sign_pattern: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None, // Will be resolved to default at runtime
            busy_timeout_ms: 5_000,
        }
    }
}

impl Default for CapacityConfig {
    fn default() -> Self {
        let limits = CapacityLimits::default();
        Self {
            runway_capacity: limits.runway_capacity,
            airliner_parking_capacity: limits.airliner_parking_capacity,
            private_parking_capacity: limits.private_parking_capacity,
        }
    }
}

impl Default for GroundCrewConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 60,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            call_sign_pattern: DEFAULT_CALL_SIGN_PATTERN.to_string(),
        }
    }
}

impl From<&CapacityConfig> for CapacityLimits {
    fn from(config: &CapacityConfig) -> Self {
        Self {
            runway_capacity: config.runway_capacity,
            airliner_parking_capacity: config.airliner_parking_capacity,
            private_parking_capacity: config.private_parking_capacity,
        }
    }
}

impl Config {
    /// Load configuration from all sources, reading the TOML file at
    /// `config_path` or the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.capacity.runway_capacity == 0 {
            return Err(Error::ConfigValidation {
                message: "runway_capacity must be greater than 0".to_string(),
            });
        }

        if self.ground_crew.sweep_interval_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "sweep_interval_secs must be greater than 0".to_string(),
            });
        }

        self.call_sign_pattern()?;
        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the busy timeout as a Duration.
    #[must_use]
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.storage.busy_timeout_ms)
    }

    /// Get the capacity limits handed to the transition validator.
    #[must_use]
    pub fn capacity_limits(&self) -> CapacityLimits {
        CapacityLimits::from(&self.capacity)
    }

    /// Get the sweep interval as a Duration.
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.ground_crew.sweep_interval_secs)
    }

    /// Compile the configured call sign pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is not a valid regex.
    pub fn call_sign_pattern(&self) -> Result<CallSignPattern> {
        CallSignPattern::new(&self.validation.call_sign_pattern)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, MutexGuard};

    use super::*;

    /// Serializes tests that load from the process environment.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_lock() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write_temp_config(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "airport_ops_{name}_{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.capacity.runway_capacity, 1);
        assert_eq!(config.capacity.airliner_parking_capacity, 10);
        assert_eq!(config.capacity.private_parking_capacity, 5);
        assert_eq!(config.ground_crew.sweep_interval_secs, 60);
    }

    #[test]
    fn test_default_storage_config() {
        let storage = StorageConfig::default();

        assert!(storage.database_path.is_none());
        assert_eq!(storage.busy_timeout_ms, 5_000);
    }

    #[test]
    fn test_capacity_limits_from_config() {
        let mut config = Config::default();
        config.capacity.runway_capacity = 3;
        config.capacity.private_parking_capacity = 7;

        let limits = config.capacity_limits();
        assert_eq!(limits.runway_capacity, 3);
        assert_eq!(limits.airliner_parking_capacity, 10);
        assert_eq!(limits.private_parking_capacity, 7);
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_runway_capacity() {
        let mut config = Config::default();
        config.capacity.runway_capacity = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("runway_capacity"));
    }

    #[test]
    fn test_validate_zero_sweep_interval() {
        let mut config = Config::default();
        config.ground_crew.sweep_interval_secs = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("sweep_interval_secs"));
    }

    #[test]
    fn test_validate_invalid_call_sign_pattern() {
        let mut config = Config::default();
        config.validation.call_sign_pattern = "[invalid".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("invalid call sign pattern"));
    }

    #[test]
    fn test_zero_parking_capacity_is_allowed() {
        let mut config = Config::default();
        config.capacity.private_parking_capacity = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_database_path_default() {
        let path = Config::default().database_path();
        assert!(path.to_string_lossy().contains("airport.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_sweep_interval() {
        assert_eq!(Config::default().sweep_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("airport-ops"));
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn test_load_from_toml_file() {
        let _guard = env_lock();
        let path = write_temp_config(
            "config_test",
            "[capacity]\nrunway_capacity = 2\n\n[ground_crew]\nsweep_interval_secs = 5\n",
        );

        let config = Config::load_from(Some(path.clone())).unwrap();
        assert_eq!(config.capacity.runway_capacity, 2);
        assert_eq!(config.capacity.airliner_parking_capacity, 10);
        assert_eq!(config.ground_crew.sweep_interval_secs, 5);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let _guard = env_lock();
        let path = std::env::temp_dir().join("airport_ops_missing_config.toml");
        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.capacity, CapacityConfig::default());
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let _guard = env_lock();
        let path = write_temp_config("bad_config_test", "[capacity]\nrunway_capacity = 0\n");

        let result = Config::load_from(Some(path.clone()));
        assert!(matches!(result, Err(Error::ConfigValidation { .. })));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_env_overrides_file() {
        let _guard = env_lock();
        let path = write_temp_config(
            "env_config_test",
            "[capacity]\nrunway_capacity = 2\nprivate_parking_capacity = 4\n",
        );

        std::env::set_var("AIRPORT_CAPACITY__RUNWAY_CAPACITY", "3");
        let result = Config::load_from(Some(path.clone()));
        std::env::remove_var("AIRPORT_CAPACITY__RUNWAY_CAPACITY");
        let _ = std::fs::remove_file(&path);

        let config = result.unwrap();
        assert_eq!(config.capacity.runway_capacity, 3);
        assert_eq!(config.capacity.private_parking_capacity, 4);
        assert_eq!(config.capacity.airliner_parking_capacity, 10);
    }

    #[test]
    fn test_config_serializes_to_json() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains("runway_capacity"));
        assert!(json.contains("sweep_interval_secs"));
    }
}
