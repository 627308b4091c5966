//! One reconciliation cycle: fetch → compute → diff → actuate → commit.
//!
//! A failed booking fetch skips the cycle and leaves the committed states alone.
//! Actuation failures are per bay; the computed states are committed after the
//! pass no matter how many bays failed, and the next cycle re-derives them.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::bays::{BayDirectory, BayState};
use crate::booking::{BookingSource, qualify_bookings};
use crate::core::activation::{BookingMargins, compute_states, fetch_window};
use crate::core::diff::{Transition, diff_states, log_state_change};
use crate::core::snapshot::{ActuationFailure, CycleSummary, SharedState};
use crate::device::BayActuator;
use crate::error::Error;

/// Tunables for a reconciliation cycle.
#[derive(Debug, Clone)]
pub struct ReconcileSettings {
    pub margins: BookingMargins,
    pub lookback_hours: i64,
    pub lookahead_hours: i64,
    /// Venue timezone for hour alignment; `None` means system local time
    pub timezone: Option<Tz>,
    pub workers: usize,
    pub watchdog: Duration,
    pub redundant_wake: bool,
    pub debug_enabled: bool,
}

/// Result of one cycle.
#[derive(Debug)]
pub enum CycleOutcome {
    /// Booking fetch failed; nothing was actuated or committed
    Skipped(Error),
    Committed(CycleSummary),
}

/// Fetch bookings for the window around `now` and derive bay states.
///
/// Shared by the daemon and the `check` dry run.
pub fn evaluate(
    source: &dyn BookingSource,
    directory: &BayDirectory,
    settings: &ReconcileSettings,
    now: DateTime<Utc>,
) -> Result<(BayState, usize), Error> {
    let (from, to) = match settings.timezone {
        Some(tz) => fetch_window(now, settings.lookback_hours, settings.lookahead_hours, &tz),
        None => fetch_window(
            now,
            settings.lookback_hours,
            settings.lookahead_hours,
            &chrono::Local,
        ),
    };

    if settings.debug_enabled {
        log_debug!(
            "Fetching bookings starting between {} and {}",
            from.format("%Y-%m-%dT%H:%MZ"),
            to.format("%Y-%m-%dT%H:%MZ")
        );
    }

    let raw = source.list_bookings(from, to)?;
    let fetched = raw.len();
    let bookings = qualify_bookings(raw, directory);

    if settings.debug_enabled {
        log_debug!(
            "{} of {} bookings qualify",
            bookings.len(),
            fetched
        );
        for booking in &bookings {
            let (window_from, window_to) =
                crate::core::activation::activation_window(booking, &settings.margins);
            log_indented!(
                "{} booking {}: active {} to {}",
                booking.bay_reference,
                booking.id,
                window_from.format("%H:%M"),
                window_to.format("%H:%M")
            );
        }
    }

    let computed = compute_states(now, directory.bays(), &bookings, &settings.margins);
    Ok((computed, bookings.len()))
}

/// Run one full cycle against the shared state.
pub fn run_cycle(
    source: &dyn BookingSource,
    actuator: &dyn BayActuator,
    shared: &SharedState,
    settings: &ReconcileSettings,
    now: DateTime<Utc>,
) -> CycleOutcome {
    let directory = shared.directory();

    let (computed, booking_count) = match evaluate(source, &directory, settings, now) {
        Ok(result) => result,
        Err(e) => {
            log_pipe!();
            log_warning!("Failed to fetch bookings: {e}");
            log_indented!("Skipping this cycle, bay states unchanged");
            shared.record_cycle_error(e.to_string());
            return CycleOutcome::Skipped(e);
        }
    };

    let previous = shared.get_bay_states();
    let transitions = diff_states(&previous, &computed, settings.redundant_wake);
    log_state_change(&previous, &computed, &transitions);

    let failures = actuate_all(&transitions, &directory, actuator, settings);

    let summary = CycleSummary {
        completed_at: now,
        bookings: booking_count,
        transitions: transitions.len(),
        failures,
    };
    shared.commit(computed, summary.clone());
    CycleOutcome::Committed(summary)
}

/// Actuate every transition with a bounded worker pool.
///
/// Once the watchdog deadline passes, idle workers stop taking jobs and every
/// transition not yet started is reported as a timeout.
pub fn actuate_all(
    transitions: &[Transition],
    directory: &BayDirectory,
    actuator: &dyn BayActuator,
    settings: &ReconcileSettings,
) -> Vec<ActuationFailure> {
    if transitions.is_empty() {
        return Vec::new();
    }

    let deadline = Instant::now() + settings.watchdog;
    let next_job = AtomicUsize::new(0);
    let started: Vec<AtomicBool> = transitions.iter().map(|_| AtomicBool::new(false)).collect();
    let failures = Mutex::new(Vec::new());
    let workers = settings.workers.clamp(1, transitions.len());

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| {
                loop {
                    if Instant::now() >= deadline {
                        break;
                    }
                    let index = next_job.fetch_add(1, Ordering::SeqCst);
                    let Some(transition) = transitions.get(index) else {
                        break;
                    };
                    started[index].store(true, Ordering::SeqCst);

                    if let Some(failure) = actuate_one(transition, directory, actuator) {
                        failures
                            .lock()
                            .unwrap_or_else(|e| e.into_inner())
                            .push(failure);
                    }
                }
            });
        }
    });

    let mut failures = failures.into_inner().unwrap_or_else(|e| e.into_inner());

    let skipped: Vec<&Transition> = transitions
        .iter()
        .zip(&started)
        .filter(|(_, flag)| !flag.load(Ordering::SeqCst))
        .map(|(transition, _)| transition)
        .collect();

    if !skipped.is_empty() {
        log_pipe!();
        log_error!(
            "Cycle watchdog expired after {:?}, {} bay(s) not actuated",
            settings.watchdog,
            skipped.len()
        );
        for transition in skipped {
            let error = Error::Timeout(format!(
                "{} skipped, cycle watchdog expired",
                transition.action
            ));
            log_indented!("{}: {}", transition.reference, error);
            failures.push(failure_record(transition, &error));
        }
    }

    failures.sort_by(|a, b| a.reference.cmp(&b.reference));
    failures
}

fn actuate_one(
    transition: &Transition,
    directory: &BayDirectory,
    actuator: &dyn BayActuator,
) -> Option<ActuationFailure> {
    let Some(bay) = directory.by_reference(&transition.reference) else {
        let error = Error::Directory(format!("{} is not in the directory", transition.reference));
        log_error!("{}: {}", transition.reference, error);
        return Some(failure_record(transition, &error));
    };

    match actuator.actuate(bay, transition.action) {
        Ok(outcome) => {
            log_decorated!("{} {}: {}", bay.reference, transition.action, outcome);
            None
        }
        Err(error) => {
            log_error!("{} {} failed: {}", bay.reference, transition.action, error);
            if error.is_transient() {
                log_indented!("Will be retried when the next cycle re-derives this bay");
            }
            Some(failure_record(transition, &error))
        }
    }
}

fn failure_record(transition: &Transition, error: &Error) -> ActuationFailure {
    ActuationFailure {
        reference: transition.reference.clone(),
        action: transition.action.to_string(),
        kind: error.kind().to_string(),
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bays::Bay;
    use crate::booking::{MockBookingSource, RawBooking};
    use crate::device::{Action, Outcome};
    use chrono::TimeZone;
    use std::path::PathBuf;

    struct FlakyActuator {
        fail_reference: &'static str,
        calls: Mutex<Vec<(String, Action)>>,
    }

    impl BayActuator for FlakyActuator {
        fn actuate(&self, bay: &Bay, action: Action) -> crate::Result<Outcome> {
            self.calls
                .lock()
                .unwrap()
                .push((bay.reference.clone(), action));
            if bay.reference == self.fail_reference {
                Err(Error::Timeout("no data from projector".to_string()))
            } else {
                Ok(Outcome::WakeSent)
            }
        }
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, h, m, 0).unwrap()
    }

    fn bay(id: &str, reference: &str) -> Bay {
        Bay {
            id: id.to_string(),
            reference: reference.to_string(),
            hardware_address: "00:11:22:33:44:55".parse().unwrap(),
            network_address: None,
            range: None,
        }
    }

    fn raw_booking(bay_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> RawBooking {
        RawBooking {
            id: format!("b-{bay_id}"),
            start,
            end,
            status: "confirmed".to_string(),
            kind: Some("bay".to_string()),
            is_block: false,
            bay_id: Some(bay_id.to_string()),
        }
    }

    fn settings() -> ReconcileSettings {
        ReconcileSettings {
            margins: BookingMargins::from_minutes(15, 35),
            lookback_hours: 2,
            lookahead_hours: 6,
            timezone: Some(chrono_tz::UTC),
            workers: 2,
            watchdog: Duration::from_secs(30),
            redundant_wake: false,
            debug_enabled: false,
        }
    }

    fn shared() -> SharedState {
        SharedState::new(
            BayDirectory::new(vec![bay("1", "BAY-1"), bay("2", "BAY-2")], at(9, 0)),
            Default::default(),
            PathBuf::from("/nonexistent/bays.json"),
            at(9, 0),
        )
    }

    #[test]
    fn test_fetch_failure_skips_cycle() {
        let mut source = MockBookingSource::new();
        source
            .expect_list_bookings()
            .return_once(|_, _| Err(Error::Connection("api down".to_string())));
        let actuator = FlakyActuator {
            fail_reference: "",
            calls: Mutex::new(Vec::new()),
        };
        let state = shared();

        let outcome = run_cycle(&source, &actuator, &state, &settings(), at(10, 0));

        assert!(matches!(outcome, CycleOutcome::Skipped(Error::Connection(_))));
        assert!(state.get_bay_states().is_empty());
        assert!(actuator.calls.lock().unwrap().is_empty());
        assert_eq!(state.health().status, "degraded");
    }

    #[test]
    fn test_failure_on_one_bay_does_not_block_commit() {
        let mut source = MockBookingSource::new();
        source.expect_list_bookings().return_once(|from, to| {
            assert_eq!(from, at(8, 0));
            assert_eq!(to, at(16, 0));
            Ok(vec![
                raw_booking("1", at(10, 0), at(11, 0)),
                raw_booking("2", at(10, 0), at(11, 0)),
            ])
        });
        let actuator = FlakyActuator {
            fail_reference: "BAY-1",
            calls: Mutex::new(Vec::new()),
        };
        let state = shared();

        let outcome = run_cycle(&source, &actuator, &state, &settings(), at(10, 0));

        let CycleOutcome::Committed(summary) = outcome else {
            panic!("cycle should commit");
        };
        assert_eq!(summary.bookings, 2);
        assert_eq!(summary.transitions, 2);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].reference, "BAY-1");
        assert_eq!(summary.failures[0].kind, "timeout");

        let states = state.get_bay_states();
        assert_eq!(states.get("BAY-1"), Some(&true));
        assert_eq!(states.get("BAY-2"), Some(&true));
        assert_eq!(actuator.calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_expired_watchdog_records_timeouts() {
        let transitions = vec![Transition {
            reference: "BAY-1".to_string(),
            from: false,
            to: true,
            action: Action::Wake,
        }];
        let actuator = FlakyActuator {
            fail_reference: "",
            calls: Mutex::new(Vec::new()),
        };
        let mut expired = settings();
        expired.watchdog = Duration::ZERO;

        let directory = BayDirectory::new(vec![bay("1", "BAY-1")], at(9, 0));
        let failures = actuate_all(&transitions, &directory, &actuator, &expired);

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, "timeout");
        assert!(actuator.calls.lock().unwrap().is_empty());
    }
}
