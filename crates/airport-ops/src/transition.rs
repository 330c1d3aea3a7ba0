//! Aircraft state transition validation.
//!
//! [`evaluate`] is a pure function: it reads the request, the current
//! aircraft (if any), an occupancy snapshot and the capacity limits, and
//! returns a [`Decision`]. Applying an accepted decision and writing the
//! audit entry are the caller's job (see [`crate::tower::ControlTower`]).
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. call sign present, state text recognized, type present for a new
//!    aircraft (bad request)
//! 2. flow edge for a known aircraft
//! 3. runway capacity for `TAKE_OFF` / `LANDED`
//! 4. single aircraft on approach
//! 5. parking capacity for the aircraft's type

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{Aircraft, AircraftState, AircraftType, Position};

/// Maximum number of aircraft on approach at once. Not configurable.
pub const APPROACH_CAPACITY: u32 = 1;

/// Default pattern a call sign must match.
pub const DEFAULT_CALL_SIGN_PATTERN: &str = r"^[A-Za-z0-9_-]{1,50}$";

/// Capacity limits injected into [`evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityLimits {
    /// Aircraft allowed in `TAKE_OFF` or `LANDED` together.
    pub runway_capacity: u32,
    /// Parking spots for airliners.
    pub airliner_parking_capacity: u32,
    /// Parking spots for private aircraft.
    pub private_parking_capacity: u32,
}

impl Default for CapacityLimits {
    fn default() -> Self {
        Self {
            runway_capacity: 1,
            airliner_parking_capacity: 10,
            private_parking_capacity: 5,
        }
    }
}

impl CapacityLimits {
    /// Parking spots available to the given aircraft type.
    #[must_use]
    pub fn parking_capacity(&self, aircraft_type: AircraftType) -> u32 {
        match aircraft_type {
            AircraftType::Airliner => self.airliner_parking_capacity,
            AircraftType::Private => self.private_parking_capacity,
        }
    }
}

/// Aircraft counts per (state, type) at decision time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancySnapshot {
    counts: [[u32; 2]; 5],
}

fn state_index(state: AircraftState) -> usize {
    match state {
        AircraftState::Parked => 0,
        AircraftState::TakeOff => 1,
        AircraftState::Airborne => 2,
        AircraftState::Approach => 3,
        AircraftState::Landed => 4,
    }
}

fn type_index(aircraft_type: AircraftType) -> usize {
    match aircraft_type {
        AircraftType::Airliner => 0,
        AircraftType::Private => 1,
    }
}

impl OccupancySnapshot {
    /// Build a snapshot from `(state, type, count)` rows.
    #[must_use]
    pub fn from_counts(rows: impl IntoIterator<Item = (AircraftState, AircraftType, u32)>) -> Self {
        let mut snapshot = Self::default();
        for (state, aircraft_type, count) in rows {
            snapshot.add(state, aircraft_type, count);
        }
        snapshot
    }

    /// Add `count` aircraft of `aircraft_type` in `state`.
    pub fn add(&mut self, state: AircraftState, aircraft_type: AircraftType, count: u32) {
        let slot = &mut self.counts[state_index(state)][type_index(aircraft_type)];
        *slot = slot.saturating_add(count);
    }

    /// Aircraft of one type in one state.
    #[must_use]
    pub fn count(&self, state: AircraftState, aircraft_type: AircraftType) -> u32 {
        self.counts[state_index(state)][type_index(aircraft_type)]
    }

    /// Aircraft of any type in `state`.
    #[must_use]
    pub fn in_state(&self, state: AircraftState) -> u32 {
        self.counts[state_index(state)].iter().sum()
    }

    /// Aircraft holding a runway slot.
    #[must_use]
    pub fn on_runway(&self) -> u32 {
        AircraftState::ALL
            .into_iter()
            .filter(|s| s.occupies_runway())
            .map(|s| self.in_state(s))
            .sum()
    }

    /// Parked aircraft of `aircraft_type`.
    #[must_use]
    pub fn parked(&self, aircraft_type: AircraftType) -> u32 {
        self.count(AircraftState::Parked, aircraft_type)
    }

    /// All aircraft in the snapshot.
    #[must_use]
    pub fn total(&self) -> u32 {
        AircraftState::ALL.into_iter().map(|s| self.in_state(s)).sum()
    }
}

/// Pattern a call sign must match before any lookup happens.
#[derive(Debug, Clone)]
pub struct CallSignPattern {
    regex: Regex,
}

impl CallSignPattern {
    /// Compile a call sign pattern.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] if the pattern is not a valid regex.
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| Error::ConfigValidation {
            message: format!("invalid call sign pattern '{pattern}': {e}"),
        })?;
        Ok(Self { regex })
    }

    /// Whether `call_sign` is acceptable.
    #[must_use]
    pub fn matches(&self, call_sign: &str) -> bool {
        self.regex.is_match(call_sign)
    }

    /// The source pattern.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

/// A caller's request to move an aircraft to a new state.
///
/// State and type are kept as the caller sent them so that unrecognized
/// values can be rejected as bad requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRequest {
    /// Target aircraft.
    pub call_sign: String,
    /// Aircraft type; required only when the aircraft is unknown.
    pub requested_type: Option<String>,
    /// Target state.
    pub requested_state: String,
    /// Position to store along with an accepted change.
    pub position: Option<Position>,
}

impl TransitionRequest {
    /// Request `call_sign` to move to `requested_state`.
    #[must_use]
    pub fn new(call_sign: impl Into<String>, requested_state: impl Into<String>) -> Self {
        Self {
            call_sign: call_sign.into(),
            requested_type: None,
            requested_state: requested_state.into(),
            position: None,
        }
    }

    /// Attach the aircraft type.
    #[must_use]
    pub fn with_type(mut self, aircraft_type: impl Into<String>) -> Self {
        self.requested_type = Some(aircraft_type.into());
        self
    }

    /// Attach a position report.
    #[must_use]
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }
}

/// Result of the create-or-fetch step that precedes validation.
#[derive(Debug, Clone, PartialEq)]
pub enum Subject {
    /// No aircraft is registered under the call sign yet.
    New,
    /// The registered aircraft.
    Known(Aircraft),
}

impl Subject {
    /// Whether the aircraft would be created by an accepted request.
    #[must_use]
    pub fn is_new(&self) -> bool {
        matches!(self, Self::New)
    }

    /// The known aircraft, if any.
    #[must_use]
    pub fn aircraft(&self) -> Option<&Aircraft> {
        match self {
            Self::New => None,
            Self::Known(aircraft) => Some(aircraft),
        }
    }

    /// Current state of the known aircraft.
    #[must_use]
    pub fn current_state(&self) -> Option<AircraftState> {
        self.aircraft().map(|a| a.state)
    }
}

impl From<Option<Aircraft>> for Subject {
    fn from(aircraft: Option<Aircraft>) -> Self {
        aircraft.map_or(Self::New, Self::Known)
    }
}

/// How a rejection surfaces to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectCategory {
    /// Malformed input; never logged.
    BadRequest,
    /// Business rule refusal; always logged.
    Conflict,
}

impl fmt::Display for RejectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadRequest => f.write_str("bad request"),
            Self::Conflict => f.write_str("conflict"),
        }
    }
}

/// Why a transition was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Empty call sign.
    MissingCallSign,
    /// Call sign does not match the configured pattern.
    InvalidCallSign,
    /// Requested state is not one of the five states.
    InvalidState,
    /// New aircraft without a type.
    TypeRequired,
    /// Type text not recognized.
    InvalidType,
    /// Not an edge of the flow.
    InvalidStateChange,
    /// Runway slots are all taken.
    RunwayOccupied,
    /// Another aircraft holds the approach.
    ApproachOccupied,
    /// Parking for the aircraft's type is full.
    NoFreeParkingSpot,
}

impl RejectReason {
    /// The text used both in the response and in the audit log.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::MissingCallSign => "call sign required",
            Self::InvalidCallSign => "invalid call sign",
            Self::InvalidState => "invalid state",
            Self::TypeRequired => "type required",
            Self::InvalidType => "invalid type",
            Self::InvalidStateChange => "not a valid state change",
            Self::RunwayOccupied => "the runway is occupied",
            Self::ApproachOccupied => "other aircraft is on approach",
            Self::NoFreeParkingSpot => "no free parking spot",
        }
    }

    /// Which externally visible outcome this reason maps to.
    #[must_use]
    pub fn category(self) -> RejectCategory {
        match self {
            Self::MissingCallSign
            | Self::InvalidCallSign
            | Self::InvalidState
            | Self::TypeRequired
            | Self::InvalidType => RejectCategory::BadRequest,
            Self::InvalidStateChange
            | Self::RunwayOccupied
            | Self::ApproachOccupied
            | Self::NoFreeParkingSpot => RejectCategory::Conflict,
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// A refused transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Why.
    pub reason: RejectReason,
    /// State of the aircraft at decision time, if it is known.
    pub from_state: Option<AircraftState>,
    /// The refused target; `None` when the state text was not recognized.
    pub to_state: Option<AircraftState>,
}

impl Rejection {
    /// Which externally visible outcome this rejection maps to.
    #[must_use]
    pub fn category(&self) -> RejectCategory {
        self.reason.category()
    }
}

/// A transition the caller should apply.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedTransition {
    /// Target aircraft.
    pub call_sign: String,
    /// Type of the aircraft (existing, or the requested one for a new aircraft).
    pub aircraft_type: AircraftType,
    /// State before the change; `None` for a new aircraft.
    pub from_state: Option<AircraftState>,
    /// New state.
    pub to_state: AircraftState,
    /// Position to store, if the request carried one.
    pub position: Option<Position>,
}

impl AcceptedTransition {
    /// Whether applying this creates the aircraft.
    #[must_use]
    pub fn creates_aircraft(&self) -> bool {
        self.from_state.is_none()
    }
}

/// Outcome of [`evaluate`].
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Apply the transition.
    Accept(AcceptedTransition),
    /// Leave the aircraft unchanged.
    Reject(Rejection),
}

impl Decision {
    /// Whether the transition was accepted.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accept(_))
    }

    /// The rejection reason, if rejected.
    #[must_use]
    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            Self::Accept(_) => None,
            Self::Reject(rejection) => Some(rejection.reason),
        }
    }
}

/// Decide whether `request` may be applied.
///
/// New aircraft skip the flow check and may enter in any state. The parking
/// check runs for every request, whatever the target state: it gates on the
/// current parking pressure for the aircraft's type.
#[must_use]
pub fn evaluate(
    request: &TransitionRequest,
    subject: &Subject,
    occupancy: &OccupancySnapshot,
    limits: &CapacityLimits,
) -> Decision {
    let from_state = subject.current_state();
    let reject = |reason, to_state| {
        Decision::Reject(Rejection {
            reason,
            from_state,
            to_state,
        })
    };

    if request.call_sign.trim().is_empty() {
        return reject(RejectReason::MissingCallSign, None);
    }

    let Ok(to_state) = request.requested_state.parse::<AircraftState>() else {
        return reject(RejectReason::InvalidState, None);
    };

    let aircraft_type = match subject {
        Subject::Known(aircraft) => aircraft.aircraft_type,
        Subject::New => {
            let Some(raw) = request.requested_type.as_deref() else {
                return reject(RejectReason::TypeRequired, Some(to_state));
            };
            match raw.parse::<AircraftType>() {
                Ok(aircraft_type) => aircraft_type,
                Err(_) => return reject(RejectReason::InvalidType, Some(to_state)),
            }
        }
    };

    if let Some(current) = from_state {
        if !current.can_transition_to(to_state) {
            return reject(RejectReason::InvalidStateChange, Some(to_state));
        }
    }

    if to_state.occupies_runway() && occupancy.on_runway() >= limits.runway_capacity {
        return reject(RejectReason::RunwayOccupied, Some(to_state));
    }

    if to_state == AircraftState::Approach
        && occupancy.in_state(AircraftState::Approach) >= APPROACH_CAPACITY
    {
        return reject(RejectReason::ApproachOccupied, Some(to_state));
    }

    if occupancy.parked(aircraft_type) >= limits.parking_capacity(aircraft_type) {
        return reject(RejectReason::NoFreeParkingSpot, Some(to_state));
    }

    Decision::Accept(AcceptedTransition {
        call_sign: request.call_sign.clone(),
        aircraft_type,
        from_state,
        to_state,
        position: request.position,
    })
}
