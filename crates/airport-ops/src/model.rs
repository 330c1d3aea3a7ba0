//! Core domain types for airport-ops.
//!
//! Aircraft records, their lifecycle states and the append-only
//! state change log.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Operational state of an aircraft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AircraftState {
    /// On a parking spot.
    Parked,
    /// On the runway, departing.
    TakeOff,
    /// In the air, away from the airport.
    Airborne,
    /// On final approach.
    Approach,
    /// On the runway after landing.
    Landed,
}

impl AircraftState {
    /// Every state, in flow order.
    pub const ALL: [Self; 5] = [
        Self::Parked,
        Self::TakeOff,
        Self::Airborne,
        Self::Approach,
        Self::Landed,
    ];

    /// The stored and displayed form of the state.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Parked => "PARKED",
            Self::TakeOff => "TAKE_OFF",
            Self::Airborne => "AIRBORNE",
            Self::Approach => "APPROACH",
            Self::Landed => "LANDED",
        }
    }

    /// States an external request may move an aircraft to from this state.
    ///
    /// `Landed` has none: only the ground crew parks a landed aircraft.
    #[must_use]
    pub fn next_states(self) -> &'static [Self] {
        match self {
            Self::Parked => &[Self::TakeOff],
            Self::TakeOff => &[Self::Airborne],
            Self::Airborne => &[Self::Approach],
            Self::Approach => &[Self::Airborne, Self::Landed],
            Self::Landed => &[],
        }
    }

    /// Whether `next` is an edge of the flow from this state.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.next_states().contains(&next)
    }

    /// Whether an aircraft in this state holds a runway slot.
    #[must_use]
    pub fn occupies_runway(self) -> bool {
        matches!(self, Self::TakeOff | Self::Landed)
    }
}

impl fmt::Display for AircraftState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AircraftState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == normalized)
            .ok_or_else(|| Error::invalid_value("state", s))
    }
}

/// Kind of aircraft, which decides the parking area it uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AircraftType {
    /// Large commercial aircraft.
    Airliner,
    /// Small private aircraft.
    Private,
}

impl AircraftType {
    /// Every aircraft type.
    pub const ALL: [Self; 2] = [Self::Airliner, Self::Private];

    /// The stored and displayed form of the type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Airliner => "AIRLINER",
            Self::Private => "PRIVATE",
        }
    }
}

impl fmt::Display for AircraftType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AircraftType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| Error::invalid_value("aircraft type", s))
    }
}

/// Last reported position of an aircraft. No range checks are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Longitude in degrees.
    pub longitude: f64,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Altitude in feet.
    pub altitude: i32,
    /// Heading in degrees.
    pub heading: i32,
}

/// An aircraft known to the airport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aircraft {
    /// Row identifier (assigned by storage layer).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Unique call sign.
    pub call_sign: String,

    /// Aircraft type, fixed at creation.
    pub aircraft_type: AircraftType,

    /// Current operational state.
    pub state: AircraftState,

    /// Last reported position.
    pub position: Position,

    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
}

impl Aircraft {
    /// Create a new, not yet stored aircraft at the default position.
    #[must_use]
    pub fn new(
        call_sign: impl Into<String>,
        aircraft_type: AircraftType,
        state: AircraftState,
    ) -> Self {
        Self {
            id: None,
            call_sign: call_sign.into(),
            aircraft_type,
            state,
            position: Position::default(),
            updated_at: Utc::now(),
        }
    }

    /// Builder-style position override.
    #[must_use]
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }
}

/// Result of a transition attempt as recorded in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    /// The aircraft moved to the requested state.
    Accepted,
    /// The request was refused and nothing changed.
    Rejected,
}

impl Outcome {
    /// The stored and displayed form of the outcome.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "ACCEPTED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACCEPTED" => Ok(Self::Accepted),
            "REJECTED" => Ok(Self::Rejected),
            _ => Err(Error::invalid_value("outcome", s)),
        }
    }
}

/// One entry of the append-only state change history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChangeLog {
    /// Row identifier (assigned by storage layer).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Call sign of the aircraft the attempt was about.
    pub call_sign: String,

    /// State before the attempt; `None` when the aircraft was unknown.
    pub from_state: Option<AircraftState>,

    /// Requested (or, for the ground crew, forced) state.
    pub to_state: AircraftState,

    /// Whether the change was applied.
    pub outcome: Outcome,

    /// Human-readable reason or marker.
    pub description: String,

    /// When the attempt was decided.
    pub timestamp: DateTime<Utc>,
}

impl StateChangeLog {
    /// Create a log entry stamped with the current time.
    #[must_use]
    pub fn new(
        call_sign: impl Into<String>,
        from_state: Option<AircraftState>,
        to_state: AircraftState,
        outcome: Outcome,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            call_sign: call_sign.into(),
            from_state,
            to_state,
            outcome,
            description: description.into(),
            timestamp: Utc::now(),
        }
    }

    /// Whether this entry records an applied change.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.outcome == Outcome::Accepted
    }
}
