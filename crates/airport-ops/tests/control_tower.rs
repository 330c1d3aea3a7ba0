//! End-to-end behaviour of the control tower over a real SQLite file.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use airport_ops::{
    AircraftState, AircraftType, CallSignPattern, CapacityLimits, Config, ControlTower, Outcome,
    RejectCategory, RejectReason, Storage, TransitionRequest,
};

struct TempDb {
    path: PathBuf,
}

impl TempDb {
    fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "airport_ops_it_{name}_{}.db",
            std::process::id()
        ));
        let db = Self { path };
        db.cleanup();
        db
    }

    fn tower(&self, limits: CapacityLimits) -> ControlTower {
        let storage = Storage::open(&self.path).unwrap();
        let pattern = CallSignPattern::new(&Config::default().validation.call_sign_pattern).unwrap();
        ControlTower::new(storage, limits, pattern)
    }

    fn cleanup(&self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn memory_tower(limits: CapacityLimits) -> ControlTower {
    ControlTower::new(
        Storage::open_in_memory().unwrap(),
        limits,
        CallSignPattern::new(&Config::default().validation.call_sign_pattern).unwrap(),
    )
}

fn request(tower: &ControlTower, call_sign: &str, state: &str) -> airport_ops::TransitionOutcome {
    tower
        .request_transition(&TransitionRequest::new(call_sign, state))
        .unwrap()
}

fn register(tower: &ControlTower, call_sign: &str, aircraft_type: &str, state: &str) {
    let outcome = tower
        .request_transition(&TransitionRequest::new(call_sign, state).with_type(aircraft_type))
        .unwrap();
    assert!(outcome.accepted, "registering {call_sign}: {outcome:?}");
}

#[test]
fn ab1234_scenario() {
    let db = TempDb::new("ab1234");
    let tower = db.tower(CapacityLimits::default());

    register(&tower, "AB1234", "AIRLINER", "PARKED");

    let outcome = request(&tower, "AB1234", "TAKE_OFF");
    assert!(outcome.accepted);
    assert_eq!(
        tower.aircraft("AB1234").unwrap().unwrap().state,
        AircraftState::TakeOff
    );

    let outcome = request(&tower, "AB1234", "APPROACH");
    assert!(!outcome.accepted);
    assert_eq!(outcome.message(), Some("not a valid state change"));
    assert_eq!(outcome.category(), Some(RejectCategory::Conflict));
    assert_eq!(
        tower.aircraft("AB1234").unwrap().unwrap().state,
        AircraftState::TakeOff
    );

    let logs = tower.state_logs_for("AB1234", 10).unwrap();
    assert_eq!(logs.len(), 3);

    // newest first
    assert_eq!(logs[0].from_state, Some(AircraftState::TakeOff));
    assert_eq!(logs[0].to_state, AircraftState::Approach);
    assert_eq!(logs[0].outcome, Outcome::Rejected);

    assert_eq!(logs[1].from_state, Some(AircraftState::Parked));
    assert_eq!(logs[1].to_state, AircraftState::TakeOff);
    assert_eq!(logs[1].outcome, Outcome::Accepted);

    assert_eq!(logs[2].from_state, None);
    assert_eq!(logs[2].to_state, AircraftState::Parked);
}

#[test]
fn full_flight_cycle() {
    let tower = memory_tower(CapacityLimits::default());
    register(&tower, "CYCLE1", "PRIVATE", "PARKED");

    for state in ["TAKE_OFF", "AIRBORNE", "APPROACH", "AIRBORNE", "APPROACH", "LANDED"] {
        let outcome = request(&tower, "CYCLE1", state);
        assert!(outcome.accepted, "{state}: {outcome:?}");
    }

    // only the ground crew leaves LANDED
    assert_eq!(
        request(&tower, "CYCLE1", "PARKED").reason,
        Some(RejectReason::InvalidStateChange)
    );
    assert_eq!(
        tower.sweep_landed_to_parked().unwrap().as_deref(),
        Some("CYCLE1")
    );
    assert!(request(&tower, "CYCLE1", "TAKE_OFF").accepted);
}

#[test]
fn every_flow_edge_is_accepted() {
    let edges = [
        ("PARKED", "TAKE_OFF"),
        ("TAKE_OFF", "AIRBORNE"),
        ("AIRBORNE", "APPROACH"),
        ("APPROACH", "LANDED"),
        ("APPROACH", "AIRBORNE"),
    ];
    for (from, to) in edges {
        let tower = memory_tower(CapacityLimits::default());
        register(&tower, "EDGE", "AIRLINER", from);
        assert!(request(&tower, "EDGE", to).accepted, "{from} -> {to}");
    }
}

#[test]
fn non_edges_are_rejected() {
    let non_edges = [
        ("PARKED", "APPROACH"),
        ("TAKE_OFF", "LANDED"),
        ("AIRBORNE", "TAKE_OFF"),
        ("LANDED", "TAKE_OFF"),
        ("PARKED", "PARKED"),
    ];
    for (from, to) in non_edges {
        let tower = memory_tower(CapacityLimits::default());
        register(&tower, "EDGE", "AIRLINER", from);
        let outcome = request(&tower, "EDGE", to);
        assert_eq!(
            outcome.reason,
            Some(RejectReason::InvalidStateChange),
            "{from} -> {to}"
        );
    }
}

#[test]
fn runway_frees_up_after_take_off() {
    let tower = memory_tower(CapacityLimits::default());
    register(&tower, "FIRST", "AIRLINER", "PARKED");
    register(&tower, "SECOND", "AIRLINER", "PARKED");
    register(&tower, "THIRD", "AIRLINER", "APPROACH");

    assert!(request(&tower, "FIRST", "TAKE_OFF").accepted);
    assert_eq!(
        request(&tower, "SECOND", "TAKE_OFF").reason,
        Some(RejectReason::RunwayOccupied)
    );
    assert_eq!(
        request(&tower, "THIRD", "LANDED").reason,
        Some(RejectReason::RunwayOccupied)
    );

    assert!(request(&tower, "FIRST", "AIRBORNE").accepted);
    assert!(request(&tower, "SECOND", "TAKE_OFF").accepted);
}

#[test]
fn single_aircraft_on_approach() {
    let tower = memory_tower(CapacityLimits::default());
    register(&tower, "A1", "AIRLINER", "AIRBORNE");
    register(&tower, "A2", "PRIVATE", "AIRBORNE");

    assert!(request(&tower, "A1", "APPROACH").accepted);
    assert_eq!(
        request(&tower, "A2", "APPROACH").message(),
        Some("other aircraft is on approach")
    );

    assert!(request(&tower, "A1", "AIRBORNE").accepted);
    assert!(request(&tower, "A2", "APPROACH").accepted);
    assert_eq!(
        tower.occupancy().unwrap().in_state(AircraftState::Approach),
        1
    );
}

#[test]
fn parking_capacity_per_type() {
    let limits = CapacityLimits {
        private_parking_capacity: 2,
        ..CapacityLimits::default()
    };
    let tower = memory_tower(limits);

    register(&tower, "P1", "PRIVATE", "PARKED");
    register(&tower, "P2", "PRIVATE", "PARKED");

    let outcome = tower
        .request_transition(&TransitionRequest::new("P3", "PARKED").with_type("PRIVATE"))
        .unwrap();
    assert_eq!(outcome.reason, Some(RejectReason::NoFreeParkingSpot));

    // other type unaffected
    register(&tower, "L1", "AIRLINER", "PARKED");

    // the gate applies to any request involving the full type
    assert_eq!(
        request(&tower, "P1", "TAKE_OFF").reason,
        Some(RejectReason::NoFreeParkingSpot)
    );
    assert_eq!(tower.occupancy().unwrap().parked(AircraftType::Private), 2);
}

#[test]
fn audit_matches_decisions() {
    let tower = memory_tower(CapacityLimits::default());
    register(&tower, "AUD1", "AIRLINER", "PARKED");

    let attempts = ["TAKE_OFF", "LANDED", "AIRBORNE", "TAKE_OFF", "APPROACH"];
    let outcomes: Vec<_> = attempts
        .iter()
        .map(|state| request(&tower, "AUD1", state))
        .collect();

    let mut logs = tower.state_logs_for("AUD1", 100).unwrap();
    logs.reverse();
    // first entry is the registration
    assert_eq!(logs.len(), attempts.len() + 1);

    for (outcome, entry) in outcomes.iter().zip(&logs[1..]) {
        assert_eq!(Some(entry.to_state), outcome.to_state);
        assert_eq!(entry.from_state, outcome.from_state);
        if outcome.accepted {
            assert_eq!(entry.outcome, Outcome::Accepted);
            assert_eq!(entry.description, "accepted");
        } else {
            assert_eq!(entry.outcome, Outcome::Rejected);
            assert_eq!(Some(entry.description.as_str()), outcome.message());
        }
    }
}

#[test]
fn repeated_rejections_are_all_logged() {
    let tower = memory_tower(CapacityLimits::default());
    register(&tower, "REP1", "AIRLINER", "PARKED");

    for _ in 0..5 {
        assert!(!request(&tower, "REP1", "LANDED").accepted);
    }

    let logs = tower.state_logs_for("REP1", 100).unwrap();
    let rejected = logs.iter().filter(|e| !e.is_accepted()).count();
    assert_eq!(rejected, 5);
    assert_eq!(
        tower.aircraft("REP1").unwrap().unwrap().state,
        AircraftState::Parked
    );
}

#[test]
fn bad_requests_leave_no_trace() {
    let tower = memory_tower(CapacityLimits::default());

    for outcome in [
        request(&tower, "", "PARKED"),
        request(&tower, "has space", "PARKED"),
        request(&tower, "NEW1", "PARKED"),
        request(&tower, "NEW1", "BOARDING"),
        tower
            .request_transition(&TransitionRequest::new("NEW1", "PARKED").with_type("ZEPPELIN"))
            .unwrap(),
    ] {
        assert_eq!(outcome.category(), Some(RejectCategory::BadRequest));
    }

    assert!(tower.list_aircraft().unwrap().is_empty());
    assert!(tower.state_logs(100, 0).unwrap().is_empty());
}

#[test]
fn sweep_scenarios() {
    let tower = memory_tower(CapacityLimits::default());
    assert_eq!(tower.sweep_landed_to_parked().unwrap(), None);
    assert!(tower.state_logs(10, 0).unwrap().is_empty());

    register(&tower, "LAND1", "PRIVATE", "APPROACH");
    assert!(request(&tower, "LAND1", "LANDED").accepted);

    assert_eq!(
        tower.sweep_landed_to_parked().unwrap().as_deref(),
        Some("LAND1")
    );
    let newest = &tower.state_logs(1, 0).unwrap()[0];
    assert_eq!(newest.description, "parked by ground crew");
    assert_eq!(newest.outcome, Outcome::Accepted);
    assert_eq!(newest.from_state, Some(AircraftState::Landed));
    assert_eq!(newest.to_state, AircraftState::Parked);
}

#[test]
fn pagination_of_history() {
    let tower = memory_tower(CapacityLimits::default());
    for i in 0..5 {
        register(&tower, &format!("PG{i}"), "AIRLINER", "AIRBORNE");
    }

    let first = tower.state_logs(2, 0).unwrap();
    let second = tower.state_logs(2, 2).unwrap();
    let third = tower.state_logs(2, 4).unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 2);
    assert_eq!(third.len(), 1);
    assert_eq!(first[0].call_sign, "PG4");
    assert_eq!(third[0].call_sign, "PG0");
}

#[test]
fn state_survives_reopen() {
    let db = TempDb::new("reopen");
    {
        let tower = db.tower(CapacityLimits::default());
        register(&tower, "KEEP1", "AIRLINER", "PARKED");
        assert!(request(&tower, "KEEP1", "TAKE_OFF").accepted);
    }

    let tower = db.tower(CapacityLimits::default());
    assert_eq!(
        tower.aircraft("KEEP1").unwrap().unwrap().state,
        AircraftState::TakeOff
    );
    assert_eq!(tower.stats().unwrap().total_logs, 2);
}

#[test]
fn two_towers_share_one_runway() {
    let db = TempDb::new("shared");
    let towers = [
        Arc::new(db.tower(CapacityLimits::default())),
        Arc::new(db.tower(CapacityLimits::default())),
    ];

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let tower = Arc::clone(&towers[i % 2]);
            thread::spawn(move || {
                tower
                    .request_transition(
                        &TransitionRequest::new(format!("RW{i}"), "LANDED").with_type("AIRLINER"),
                    )
                    .unwrap()
            })
        })
        .collect();

    let accepted = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|o| o.accepted)
        .count();
    assert_eq!(accepted, 1);
    assert_eq!(towers[0].occupancy().unwrap().on_runway(), 1);
    assert_eq!(towers[1].state_logs(100, 0).unwrap().len(), 6);
}
