//! CLI command definitions.
//!
//! This module defines the arguments of all `airportctl` subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::model::Position;
use crate::transition::TransitionRequest;

/// Position flags shared by `intent` and `location`.
#[derive(Debug, Clone, Copy, Default, Args)]
pub struct PositionArgs {
    /// Longitude in degrees
    #[arg(long, allow_negative_numbers = true)]
    pub longitude: Option<f64>,

    /// Latitude in degrees
    #[arg(long, allow_negative_numbers = true)]
    pub latitude: Option<f64>,

    /// Altitude in feet
    #[arg(long, allow_negative_numbers = true)]
    pub altitude: Option<i32>,

    /// Heading in degrees
    #[arg(long, allow_negative_numbers = true)]
    pub heading: Option<i32>,
}

impl PositionArgs {
    /// The position, if any coordinate was given. Missing ones default to zero.
    #[must_use]
    pub fn to_position(&self) -> Option<Position> {
        if self.longitude.is_none()
            && self.latitude.is_none()
            && self.altitude.is_none()
            && self.heading.is_none()
        {
            return None;
        }
        Some(Position {
            longitude: self.longitude.unwrap_or_default(),
            latitude: self.latitude.unwrap_or_default(),
            altitude: self.altitude.unwrap_or_default(),
            heading: self.heading.unwrap_or_default(),
        })
    }
}

/// `intent` command arguments.
#[derive(Debug, Args)]
pub struct IntentCommand {
    /// Call sign of the aircraft
    pub call_sign: String,

    /// Requested state (PARKED, TAKE_OFF, AIRBORNE, APPROACH, LANDED)
    pub state: String,

    /// Aircraft type (AIRLINER or PRIVATE); required for a new aircraft
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub aircraft_type: Option<String>,

    /// Position reported along with the request
    #[command(flatten)]
    pub position: PositionArgs,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

impl IntentCommand {
    /// Build the request handed to the control tower.
    #[must_use]
    pub fn to_request(&self) -> TransitionRequest {
        let mut request = TransitionRequest::new(self.call_sign.as_str(), self.state.as_str());
        if let Some(aircraft_type) = &self.aircraft_type {
            request = request.with_type(aircraft_type.as_str());
        }
        if let Some(position) = self.position.to_position() {
            request = request.with_position(position);
        }
        request
    }
}

/// `location` command arguments.
#[derive(Debug, Args)]
pub struct LocationCommand {
    /// Call sign of the aircraft
    pub call_sign: String,

    /// Longitude in degrees
    #[arg(long, allow_negative_numbers = true)]
    pub longitude: f64,

    /// Latitude in degrees
    #[arg(long, allow_negative_numbers = true)]
    pub latitude: f64,

    /// Altitude in feet
    #[arg(long, allow_negative_numbers = true)]
    pub altitude: i32,

    /// Heading in degrees
    #[arg(long, allow_negative_numbers = true)]
    pub heading: i32,
}

impl LocationCommand {
    /// The reported position.
    #[must_use]
    pub fn position(&self) -> Position {
        Position {
            longitude: self.longitude,
            latitude: self.latitude,
            altitude: self.altitude,
            heading: self.heading,
        }
    }
}

/// `aircraft` command arguments.
#[derive(Debug, Args)]
pub struct AircraftCommand {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// `logs` command arguments.
#[derive(Debug, Args)]
pub struct LogsCommand {
    /// Maximum number of entries
    #[arg(short, long, default_value = "20")]
    pub limit: usize,

    /// Entries to skip (newest first)
    #[arg(short, long, default_value = "0")]
    pub offset: usize,

    /// Only entries for this call sign
    #[arg(short = 's', long)]
    pub call_sign: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// `status` command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// `ground-crew` command arguments.
#[derive(Debug, Args)]
pub struct GroundCrewCommand {
    /// Seconds between sweeps (overrides the configuration)
    #[arg(short, long, value_name = "SECS")]
    pub interval: Option<u64>,
}

/// `reset` command arguments.
#[derive(Debug, Args)]
pub struct ResetCommand {
    /// Skip confirmation
    #[arg(short, long)]
    pub yes: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One line per record
    Plain,
    /// Aligned columns with a header
    #[default]
    Table,
    /// JSON output
    Json,
}
