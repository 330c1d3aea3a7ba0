//! Text and JSON rendering for `airportctl` output.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use super::OutputFormat;
use crate::error::Result;
use crate::model::{Aircraft, AircraftState, AircraftType, StateChangeLog};
use crate::storage::StorageStats;
use crate::tower::TransitionOutcome;
use crate::transition::{CapacityLimits, OccupancySnapshot, RejectCategory, APPROACH_CAPACITY};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Process exit code for a transition outcome: 0 accepted, 2 bad request, 3 conflict.
#[must_use]
pub fn outcome_exit_code(outcome: &TransitionOutcome) -> u8 {
    match outcome.category() {
        None => 0,
        Some(RejectCategory::BadRequest) => 2,
        Some(RejectCategory::Conflict) => 3,
    }
}

/// One-line summary of a transition outcome.
#[must_use]
pub fn render_outcome(outcome: &TransitionOutcome) -> String {
    let from = outcome.from_state.map_or("(new)", AircraftState::as_str);
    let to = outcome.to_state.map_or("?", AircraftState::as_str);

    match (outcome.category(), outcome.message()) {
        (Some(category), Some(message)) => format!(
            "{}: {from} -> {to} rejected ({category}): {message}",
            outcome.call_sign
        ),
        _ => format!("{}: {from} -> {to} accepted", outcome.call_sign),
    }
}

/// Join rendered lines, each terminated by a newline.
fn join_lines(lines: impl IntoIterator<Item = String>) -> String {
    lines.into_iter().fold(String::new(), |mut out, line| {
        out.push_str(&line);
        out.push('\n');
        out
    })
}

/// Render the aircraft listing.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render_aircraft(aircraft: &[Aircraft], format: OutputFormat) -> Result<String> {
    let out = match format {
        OutputFormat::Json => serde_json::to_string_pretty(aircraft)?,
        OutputFormat::Plain => join_lines(
            aircraft
                .iter()
                .map(|a| format!("{} {} {}", a.call_sign, a.aircraft_type, a.state)),
        ),
        OutputFormat::Table => {
            let header = format!(
                "{:<12} {:<9} {:<9} {:>10} {:>10} {:>8} {:>7}",
                "CALL SIGN", "TYPE", "STATE", "LONGITUDE", "LATITUDE", "ALTITUDE", "HEADING"
            );
            let rows = aircraft.iter().map(|a| {
                format!(
                    "{:<12} {:<9} {:<9} {:>10.4} {:>10.4} {:>8} {:>7}",
                    a.call_sign,
                    a.aircraft_type.as_str(),
                    a.state.as_str(),
                    a.position.longitude,
                    a.position.latitude,
                    a.position.altitude,
                    a.position.heading
                )
            });
            join_lines(std::iter::once(header).chain(rows))
        }
    };
    Ok(out)
}

/// Render state change log entries.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render_logs(entries: &[StateChangeLog], format: OutputFormat) -> Result<String> {
    let out = match format {
        OutputFormat::Json => serde_json::to_string_pretty(entries)?,
        OutputFormat::Plain => join_lines(entries.iter().map(|e| {
            format!(
                "{} {} {} -> {} {} {}",
                e.timestamp.format(TIME_FORMAT),
                e.call_sign,
                e.from_state.map_or("-", AircraftState::as_str),
                e.to_state,
                e.outcome,
                e.description
            )
        })),
        OutputFormat::Table => {
            let header = format!(
                "{:<19} {:<12} {:<9} {:<9} {:<8} DESCRIPTION",
                "TIME", "CALL SIGN", "FROM", "TO", "OUTCOME"
            );
            let rows = entries.iter().map(|e| {
                format!(
                    "{:<19} {:<12} {:<9} {:<9} {:<8} {}",
                    e.timestamp.format(TIME_FORMAT).to_string(),
                    e.call_sign,
                    e.from_state.map_or("-", AircraftState::as_str),
                    e.to_state.as_str(),
                    e.outcome.as_str(),
                    e.description
                )
            });
            join_lines(std::iter::once(header).chain(rows))
        }
    };
    Ok(out)
}

/// Snapshot of the airport shown by `airportctl status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    /// Database file in use.
    pub database_path: PathBuf,
    /// Storage counters.
    pub stats: StorageStats,
    /// Configured limits.
    pub limits: CapacityLimits,
    /// Aircraft per state.
    pub states: BTreeMap<&'static str, u32>,
    /// Aircraft holding a runway slot.
    pub runway: u32,
    /// Parked airliners.
    pub parked_airliners: u32,
    /// Parked private aircraft.
    pub parked_private: u32,
}

impl StatusReport {
    /// Assemble a report from tower queries.
    #[must_use]
    pub fn new(
        database_path: PathBuf,
        stats: StorageStats,
        limits: CapacityLimits,
        occupancy: &OccupancySnapshot,
    ) -> Self {
        Self {
            database_path,
            stats,
            limits,
            states: AircraftState::ALL
                .into_iter()
                .map(|s| (s.as_str(), occupancy.in_state(s)))
                .collect(),
            runway: occupancy.on_runway(),
            parked_airliners: occupancy.parked(AircraftType::Airliner),
            parked_private: occupancy.parked(AircraftType::Private),
        }
    }

    fn in_state(&self, state: AircraftState) -> u32 {
        self.states.get(state.as_str()).copied().unwrap_or_default()
    }

    /// Human-readable form.
    #[must_use]
    pub fn render(&self) -> String {
        let mut lines = vec![
            "airportctl status".to_string(),
            "-----------------".to_string(),
            format!("Database:          {}", self.database_path.display()),
            format!("Aircraft:          {}", self.stats.total_aircraft),
            format!("Log entries:       {}", self.stats.total_logs),
        ];
        if let Some(newest) = self.stats.newest_log {
            lines.push(format!("Last change:       {}", newest.to_rfc3339()));
        }
        lines.extend([
            String::new(),
            format!(
                "Runway:            {}/{}",
                self.runway, self.limits.runway_capacity
            ),
            format!(
                "Approach:          {}/{APPROACH_CAPACITY}",
                self.in_state(AircraftState::Approach)
            ),
            format!(
                "Parked airliners:  {}/{}",
                self.parked_airliners, self.limits.airliner_parking_capacity
            ),
            format!(
                "Parked private:    {}/{}",
                self.parked_private, self.limits.private_parking_capacity
            ),
            String::new(),
        ]);
        lines.extend(
            AircraftState::ALL
                .into_iter()
                .map(|state| format!("  {:<10} {}", state.as_str(), self.in_state(state))),
        );
        join_lines(lines)
    }
}
