//! `airport-ops` - Aircraft state tracking for a single airport
//!
//! This library validates aircraft state change requests against the
//! airport's flow and capacity rules, records every decided attempt in an
//! append-only log, and runs the ground crew that clears landed aircraft
//! off the runway.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod ground_crew;
pub mod logging;
pub mod model;
pub mod storage;
pub mod tower;
pub mod transition;

pub use config::Config;
pub use error::{Error, Result};
pub use ground_crew::{GroundCrew, GroundCrewHandle};
pub use logging::init_logging;
pub use model::{Aircraft, AircraftState, AircraftType, Outcome, Position, StateChangeLog};
pub use storage::{Storage, StorageStats};
pub use tower::{ControlTower, ResetSummary, TransitionOutcome};
pub use transition::{
    evaluate, CallSignPattern, CapacityLimits, Decision, OccupancySnapshot, RejectCategory,
    RejectReason, Subject, TransitionRequest,
};
