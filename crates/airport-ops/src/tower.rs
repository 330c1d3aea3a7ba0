//! The control tower: the service callers talk to.
//!
//! Every operation takes the storage lock and runs in a single IMMEDIATE
//! transaction, so the read-decide-write sequence of one request never
//! interleaves with another request or with the ground crew sweep.

use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{Aircraft, AircraftState, Outcome, Position, StateChangeLog};
use crate::storage::{Repository, Storage, StorageStats};
use crate::transition::{
    evaluate, AcceptedTransition, CallSignPattern, CapacityLimits, Decision, OccupancySnapshot,
    RejectCategory, RejectReason, Subject, TransitionRequest,
};

/// Log description of an accepted request.
pub const ACCEPTED_DESCRIPTION: &str = "accepted";

/// Log description of a ground crew sweep.
pub const GROUND_CREW_DESCRIPTION: &str = "parked by ground crew";

/// What the caller learns about a transition request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionOutcome {
    /// Target aircraft.
    pub call_sign: String,
    /// Whether the aircraft is now in `to_state`.
    pub accepted: bool,
    /// State before the request, if the aircraft was known.
    pub from_state: Option<AircraftState>,
    /// Requested state, if it was recognized.
    pub to_state: Option<AircraftState>,
    /// Why the request was refused.
    pub reason: Option<RejectReason>,
}

impl TransitionOutcome {
    /// Category of the refusal, if refused.
    #[must_use]
    pub fn category(&self) -> Option<RejectCategory> {
        self.reason.map(RejectReason::category)
    }

    /// Human-readable refusal reason, if refused.
    #[must_use]
    pub fn message(&self) -> Option<&'static str> {
        self.reason.map(RejectReason::message)
    }

    fn from_decision(call_sign: &str, decision: &Decision) -> Self {
        match decision {
            Decision::Accept(accepted) => Self {
                call_sign: call_sign.to_string(),
                accepted: true,
                from_state: accepted.from_state,
                to_state: Some(accepted.to_state),
                reason: None,
            },
            Decision::Reject(rejection) => Self {
                call_sign: call_sign.to_string(),
                accepted: false,
                from_state: rejection.from_state,
                to_state: rejection.to_state,
                reason: Some(rejection.reason),
            },
        }
    }
}

/// Counts removed by [`ControlTower::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResetSummary {
    /// Aircraft deleted.
    pub aircraft_removed: usize,
    /// Log entries deleted.
    pub logs_removed: usize,
}

/// Serializes access to storage and applies the airport rules.
#[derive(Debug)]
pub struct ControlTower {
    storage: Mutex<Storage>,
    limits: CapacityLimits,
    call_signs: CallSignPattern,
}

impl ControlTower {
    /// Create a tower over `storage`.
    #[must_use]
    pub fn new(storage: Storage, limits: CapacityLimits, call_signs: CallSignPattern) -> Self {
        Self {
            storage: Mutex::new(storage),
            limits,
            call_signs,
        }
    }

    /// Create a tower over `storage` with limits and call sign rules from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured call sign pattern is invalid.
    pub fn with_config(storage: Storage, config: &Config) -> Result<Self> {
        Ok(Self::new(
            storage,
            config.capacity_limits(),
            config.call_sign_pattern()?,
        ))
    }

    /// Open the configured database and create a tower over it.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the config is invalid.
    pub fn open(config: &Config) -> Result<Self> {
        let storage = Storage::open_with_timeout(config.database_path(), config.busy_timeout())?;
        Self::with_config(storage, config)
    }

    /// Capacity limits applied to every request.
    #[must_use]
    pub fn limits(&self) -> CapacityLimits {
        self.limits
    }

    fn storage(&self) -> Result<MutexGuard<'_, Storage>> {
        self.storage
            .lock()
            .map_err(|_| Error::internal("storage lock poisoned"))
    }

    /// Decide a transition request and apply it if accepted.
    ///
    /// Conflicts and acceptances are written to the state change log in the
    /// same transaction as the aircraft update. Bad requests are returned
    /// without touching storage.
    ///
    /// # Errors
    ///
    /// Returns an error only for storage failures; refusals are reported in
    /// the returned [`TransitionOutcome`].
    pub fn request_transition(&self, request: &TransitionRequest) -> Result<TransitionOutcome> {
        let call_sign = request.call_sign.as_str();

        if !call_sign.is_empty() && !self.call_signs.matches(call_sign) {
            warn!(call_sign, "Rejected request with invalid call sign");
            return Ok(TransitionOutcome {
                call_sign: call_sign.to_string(),
                accepted: false,
                from_state: None,
                to_state: request.requested_state.parse().ok(),
                reason: Some(RejectReason::InvalidCallSign),
            });
        }

        let limits = self.limits;
        let decision = self.storage()?.transaction(|repo| {
            let subject = Subject::from(repo.find_aircraft(call_sign)?);
            let occupancy = repo.occupancy()?;
            let decision = evaluate(request, &subject, &occupancy, &limits);

            match &decision {
                Decision::Accept(accepted) => apply(repo, subject, accepted)?,
                Decision::Reject(rejection) => {
                    if let (RejectCategory::Conflict, Some(to_state)) =
                        (rejection.category(), rejection.to_state)
                    {
                        repo.append_log(&StateChangeLog::new(
                            call_sign,
                            rejection.from_state,
                            to_state,
                            Outcome::Rejected,
                            rejection.reason.message(),
                        ))?;
                    }
                }
            }
            Ok(decision)
        })?;

        let outcome = TransitionOutcome::from_decision(call_sign, &decision);
        match &decision {
            Decision::Accept(accepted) => info!(
                call_sign,
                from = accepted.from_state.map_or("-", AircraftState::as_str),
                to = %accepted.to_state,
                "Transition accepted"
            ),
            Decision::Reject(rejection) => warn!(
                call_sign,
                requested = %request.requested_state,
                category = %rejection.category(),
                reason = %rejection.reason,
                "Transition rejected"
            ),
        }
        Ok(outcome)
    }

    /// Park the earliest-registered landed aircraft.
    ///
    /// Bypasses the transition rules. Returns the call sign of the parked
    /// aircraft, or `None` (and writes nothing) if no aircraft has landed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn sweep_landed_to_parked(&self) -> Result<Option<String>> {
        let parked = self.storage()?.transaction(|repo| {
            let Some(mut aircraft) = repo.first_in_state(AircraftState::Landed)? else {
                return Ok(None);
            };

            aircraft.state = AircraftState::Parked;
            aircraft.updated_at = Utc::now();
            repo.update_aircraft(&aircraft)?;
            repo.append_log(&StateChangeLog::new(
                aircraft.call_sign.as_str(),
                Some(AircraftState::Landed),
                AircraftState::Parked,
                Outcome::Accepted,
                GROUND_CREW_DESCRIPTION,
            ))?;
            Ok(Some(aircraft.call_sign))
        })?;

        match &parked {
            Some(call_sign) => info!(call_sign = %call_sign, "Ground crew parked aircraft"),
            None => debug!("Ground crew found no landed aircraft"),
        }
        Ok(parked)
    }

    /// Store a position report for a known aircraft.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AircraftNotFound`] if the aircraft is unknown.
    pub fn report_position(&self, call_sign: &str, position: Position) -> Result<()> {
        self.storage()?
            .transaction(|repo| repo.update_position(call_sign, position))?;
        debug!(call_sign, ?position, "Position updated");
        Ok(())
    }

    /// Look up one aircraft.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn aircraft(&self, call_sign: &str) -> Result<Option<Aircraft>> {
        self.storage()?.repository().find_aircraft(call_sign)
    }

    /// All aircraft ordered by call sign.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_aircraft(&self) -> Result<Vec<Aircraft>> {
        self.storage()?.repository().list_aircraft()
    }

    /// State change history, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn state_logs(&self, limit: usize, offset: usize) -> Result<Vec<StateChangeLog>> {
        self.storage()?.repository().list_logs(limit, offset)
    }

    /// State change history of one aircraft, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn state_logs_for(&self, call_sign: &str, limit: usize) -> Result<Vec<StateChangeLog>> {
        self.storage()?.repository().list_logs_for(call_sign, limit)
    }

    /// Current occupancy counts.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn occupancy(&self) -> Result<OccupancySnapshot> {
        self.storage()?.repository().occupancy()
    }

    /// Database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        self.storage()?.stats()
    }

    /// Delete all aircraft and all state change logs.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn reset(&self) -> Result<ResetSummary> {
        let summary = self.storage()?.transaction(|repo| {
            Ok(ResetSummary {
                logs_removed: repo.delete_all_logs()?,
                aircraft_removed: repo.delete_all_aircraft()?,
            })
        })?;
        info!(
            aircraft = summary.aircraft_removed,
            logs = summary.logs_removed,
            "Airport reset"
        );
        Ok(summary)
    }
}

/// Write an accepted transition and its log entry.
fn apply(repo: &Repository<'_>, subject: Subject, accepted: &AcceptedTransition) -> Result<()> {
    match subject {
        Subject::New => {
            let aircraft = Aircraft::new(
                accepted.call_sign.as_str(),
                accepted.aircraft_type,
                accepted.to_state,
            )
            .with_position(accepted.position.unwrap_or_default());
            repo.create_aircraft(&aircraft)?;
        }
        Subject::Known(mut aircraft) => {
            aircraft.state = accepted.to_state;
            if let Some(position) = accepted.position {
                aircraft.position = position;
            }
            aircraft.updated_at = Utc::now();
            repo.update_aircraft(&aircraft)?;
        }
    }

    repo.append_log(&StateChangeLog::new(
        accepted.call_sign.as_str(),
        accepted.from_state,
        accepted.to_state,
        Outcome::Accepted,
        ACCEPTED_DESCRIPTION,
    ))?;
    Ok(())
}
