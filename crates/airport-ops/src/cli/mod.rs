//! Command-line interface for airport-ops.
//!
//! This module provides the CLI structure and output rendering for the
//! `airportctl` binary.

mod commands;
mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AircraftCommand, ConfigCommand, GroundCrewCommand, IntentCommand, LocationCommand,
    LogsCommand, OutputFormat, PositionArgs, ResetCommand, StatusCommand,
};
pub use render::{outcome_exit_code, render_aircraft, render_logs, render_outcome, StatusReport};

use crate::logging::Verbosity;

/// airportctl - Drive the airport control tower
///
/// Submits aircraft state change requests, reports positions, shows the
/// state change history and runs the ground crew.
#[derive(Debug, Parser)]
#[command(name = "airportctl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Request a state change for an aircraft
    Intent(IntentCommand),

    /// Report the position of a known aircraft
    Location(LocationCommand),

    /// List registered aircraft
    Aircraft(AircraftCommand),

    /// Show the state change history
    Logs(LogsCommand),

    /// Show runway, approach and parking occupancy
    Status(StatusCommand),

    /// Park one landed aircraft now
    Sweep,

    /// Run the ground crew until interrupted
    GroundCrew(GroundCrewCommand),

    /// Delete all aircraft and history
    Reset(ResetCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}
