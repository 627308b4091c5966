use baywake::bays::{BayMapping, MappingEntry, directory};
use baywake::core::activation::BookingMargins;
use baywake::core::reconcile::{CycleOutcome, ReconcileSettings, run_cycle};
use baywake::core::refresh::RefreshWorker;
use baywake::core::snapshot::SharedState;
use baywake::device::Action;
use baywake::testing::{
    RecordingActuator, StaticBookingSource, StaticNeighborTable, bay_booking, remote_bay,
};
use chrono::{DateTime, TimeZone, Utc};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, h, m, 0).unwrap()
}

fn entry(reference: &str, mac: &str) -> MappingEntry {
    MappingEntry {
        reference: reference.to_string(),
        mac: mac.to_string(),
        ip: None,
    }
}

fn mapping() -> BayMapping {
    BayMapping::from_entries(&[
        entry("BAY-1", "00:11:22:33:44:01"),
        entry("BAY-2", "00:11:22:33:44:02"),
        entry("BAY-3", "00:11:22:33:44:03"),
    ])
    .unwrap()
}

fn settings(redundant_wake: bool) -> ReconcileSettings {
    ReconcileSettings {
        margins: BookingMargins::from_minutes(15, 35),
        lookback_hours: 2,
        lookahead_hours: 6,
        timezone: Some(chrono_tz::UTC),
        workers: 2,
        watchdog: Duration::from_secs(10),
        redundant_wake,
        debug_enabled: false,
    }
}

/// BAY-1 booked 10:00-11:00, BAY-2 booked 13:00-14:00, BAY-3 free.
fn source() -> StaticBookingSource {
    StaticBookingSource::new(
        vec![
            remote_bay("101", "BAY-1"),
            remote_bay("102", "BAY-2"),
            remote_bay("103", "BAY-3"),
        ],
        vec![
            bay_booking("9001", "101", at(10, 0), at(11, 0)),
            bay_booking("9002", "102", at(13, 0), at(14, 0)),
        ],
    )
}

fn shared(source: &StaticBookingSource, mapping_path: &Path) -> Arc<SharedState> {
    let mapping = mapping();
    let (bay_directory, report) = directory::refresh(
        source,
        &mapping,
        &StaticNeighborTable(String::new()),
        false,
        at(9, 0),
    )
    .unwrap();
    assert!(report.unmapped.is_empty());
    Arc::new(SharedState::new(
        bay_directory,
        mapping,
        mapping_path.to_path_buf(),
        at(9, 0),
    ))
}

fn committed(outcome: CycleOutcome) -> baywake::core::snapshot::CycleSummary {
    match outcome {
        CycleOutcome::Committed(summary) => summary,
        CycleOutcome::Skipped(e) => panic!("cycle skipped: {e}"),
    }
}

#[test]
fn test_first_cycle_wakes_active_bays_only() {
    let source = source();
    let actuator = RecordingActuator::new();
    let state = shared(&source, Path::new("/nonexistent/bays.json"));

    let summary = committed(run_cycle(&source, &actuator, &state, &settings(false), at(9, 50)));

    assert_eq!(summary.bookings, 2);
    assert_eq!(summary.transitions, 1);
    assert_eq!(actuator.calls(), vec![("BAY-1".to_string(), Action::Wake)]);

    let states = state.get_bay_states();
    assert_eq!(states.get("BAY-1"), Some(&true));
    assert_eq!(states.get("BAY-2"), Some(&false));
    assert_eq!(states.get("BAY-3"), Some(&false));
}

#[test]
fn test_bay_sleeps_after_post_margin() {
    let source = source();
    let actuator = RecordingActuator::new();
    let state = shared(&source, Path::new("/nonexistent/bays.json"));

    committed(run_cycle(&source, &actuator, &state, &settings(false), at(10, 30)));
    actuator.clear();

    // Still inside the 35 minute post margin
    let summary = committed(run_cycle(&source, &actuator, &state, &settings(false), at(11, 35)));
    assert_eq!(summary.transitions, 0);
    assert!(actuator.calls().is_empty());

    committed(run_cycle(&source, &actuator, &state, &settings(false), at(11, 36)));
    assert_eq!(actuator.calls(), vec![("BAY-1".to_string(), Action::Sleep)]);
    assert_eq!(state.get_bay_states().get("BAY-1"), Some(&false));
}

#[test]
fn test_steady_state_sends_nothing() {
    let source = source();
    let actuator = RecordingActuator::new();
    let state = shared(&source, Path::new("/nonexistent/bays.json"));

    committed(run_cycle(&source, &actuator, &state, &settings(false), at(10, 0)));
    actuator.clear();
    committed(run_cycle(&source, &actuator, &state, &settings(false), at(10, 1)));

    assert!(actuator.calls().is_empty());
}

#[test]
fn test_redundant_wake_rewakes_active_bays() {
    let source = source();
    let actuator = RecordingActuator::new();
    let state = shared(&source, Path::new("/nonexistent/bays.json"));

    committed(run_cycle(&source, &actuator, &state, &settings(true), at(10, 0)));
    actuator.clear();
    committed(run_cycle(&source, &actuator, &state, &settings(true), at(10, 1)));

    assert_eq!(actuator.calls(), vec![("BAY-1".to_string(), Action::Rewake)]);
}

#[test]
fn test_failed_fetch_skips_cycle_and_keeps_states() {
    let source = source();
    let actuator = RecordingActuator::new();
    let state = shared(&source, Path::new("/nonexistent/bays.json"));

    committed(run_cycle(&source, &actuator, &state, &settings(false), at(10, 0)));
    let before = state.get_bay_states();
    actuator.clear();

    source.set_failing(true);
    let outcome = run_cycle(&source, &actuator, &state, &settings(false), at(12, 0));

    assert!(matches!(outcome, CycleOutcome::Skipped(_)));
    assert!(actuator.calls().is_empty());
    assert_eq!(*state.get_bay_states(), *before);
    assert_eq!(state.health().status, "degraded");
}

#[test]
fn test_actuation_failure_is_bay_local() {
    let source = source();
    source.set_bookings(vec![
        bay_booking("9001", "101", at(10, 0), at(11, 0)),
        bay_booking("9003", "103", at(10, 0), at(11, 0)),
    ]);
    let actuator = RecordingActuator::new();
    actuator.fail_for("BAY-1");
    let state = shared(&source, Path::new("/nonexistent/bays.json"));

    let summary = committed(run_cycle(&source, &actuator, &state, &settings(false), at(10, 0)));

    assert_eq!(
        actuator.calls(),
        vec![
            ("BAY-1".to_string(), Action::Wake),
            ("BAY-3".to_string(), Action::Wake),
        ]
    );
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].reference, "BAY-1");
    assert_eq!(summary.failures[0].kind, "timeout");

    // Committed regardless; the next cycle sees BAY-1 as already active
    assert_eq!(state.get_bay_states().get("BAY-1"), Some(&true));
}

#[test]
fn test_fetch_window_is_hour_aligned_around_now() {
    let source = source();
    let actuator = RecordingActuator::new();
    let state = shared(&source, Path::new("/nonexistent/bays.json"));

    committed(run_cycle(
        &source,
        &actuator,
        &state,
        &settings(false),
        at(9, 50),
    ));

    assert_eq!(source.booking_windows(), vec![(at(7, 0), at(15, 0))]);
}

fn worker(source: Arc<StaticBookingSource>, state: Arc<SharedState>) -> RefreshWorker {
    RefreshWorker {
        source,
        neighbors: Arc::new(StaticNeighborTable(String::new())),
        shared: state,
        resolve_addresses: false,
        interval: Duration::from_secs(900),
        debug_enabled: false,
    }
}

#[test]
fn test_failed_refresh_keeps_directory() {
    let source = Arc::new(source());
    let state = shared(&source, Path::new("/nonexistent/bays.json"));
    let before = state.directory();

    source.set_failing(true);
    let refresh = worker(Arc::clone(&source), Arc::clone(&state));

    assert!(!refresh.refresh_directory());
    assert!(Arc::ptr_eq(&before, &state.directory()));
    assert!(state.health().last_refresh_error.is_some());
}

#[test]
fn test_cycle_after_failed_refresh_matches_last_good_cycle() {
    let source = Arc::new(source());
    let actuator = RecordingActuator::new();
    let state = shared(&source, Path::new("/nonexistent/bays.json"));

    committed(run_cycle(
        &*source,
        &actuator,
        &state,
        &settings(false),
        at(10, 0),
    ));
    let first = state.get_bay_states();

    // The bay list is unreachable for this refresh only
    source.set_failing(true);
    let refresh = worker(Arc::clone(&source), Arc::clone(&state));
    assert!(!refresh.refresh_directory());
    source.set_failing(false);

    actuator.clear();
    committed(run_cycle(
        &*source,
        &actuator,
        &state,
        &settings(false),
        at(10, 0),
    ));

    assert_eq!(*state.get_bay_states(), *first);
    assert_eq!(state.directory().len(), 3);
    assert!(actuator.calls().is_empty());
}

#[test]
fn test_refresh_picks_up_new_bays() {
    let source = Arc::new(source());
    let state = shared(&source, Path::new("/nonexistent/bays.json"));
    assert_eq!(state.directory().len(), 3);

    source.set_bays(vec![remote_bay("101", "BAY-1"), remote_bay("104", "BAY-4")]);
    let refresh = worker(Arc::clone(&source), Arc::clone(&state));

    assert!(refresh.refresh_directory());
    let bays = state.get_bays();
    // BAY-4 has no mapping entry
    assert_eq!(bays.len(), 1);
    assert_eq!(bays[0].reference, "BAY-1");
}

#[test]
fn test_reload_mapping_applies_changes_and_ignores_broken_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bays.json");
    mapping().save(&path).unwrap();

    let source = Arc::new(source());
    let state = shared(&source, &path);
    let refresh = worker(Arc::clone(&source), Arc::clone(&state));

    // Unchanged file
    assert!(!refresh.reload_mapping());

    BayMapping::from_entries(&[entry("BAY-1", "00:11:22:33:44:01")])
        .unwrap()
        .save(&path)
        .unwrap();
    assert!(refresh.reload_mapping());
    assert_eq!(state.mapping().len(), 1);

    std::fs::write(&path, "not json").unwrap();
    assert!(!refresh.reload_mapping());
    assert_eq!(state.mapping().len(), 1);
}
