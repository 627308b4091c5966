//! In-process stand-ins for the booking API, the network and the neighbor table.
//!
//! Compiled for unit tests and for integration tests through the
//! `testing-support` feature.

use chrono::{DateTime, Utc};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::bays::Bay;
use crate::booking::{BookingSource, RawBooking, RemoteBay};
use crate::device::{Action, BayActuator, NeighborTable, Outcome};
use crate::error::{Error, Result};

/// Booking source serving fixed bays and bookings.
///
/// `set_failing(true)` makes every call fail with a connection error until
/// switched back.
#[derive(Default)]
pub struct StaticBookingSource {
    bays: Mutex<Vec<RemoteBay>>,
    bookings: Mutex<Vec<RawBooking>>,
    failing: AtomicBool,
    booking_windows: Mutex<Vec<(DateTime<Utc>, DateTime<Utc>)>>,
}

impl StaticBookingSource {
    pub fn new(bays: Vec<RemoteBay>, bookings: Vec<RawBooking>) -> Self {
        Self {
            bays: Mutex::new(bays),
            bookings: Mutex::new(bookings),
            ..Self::default()
        }
    }

    pub fn set_bays(&self, bays: Vec<RemoteBay>) {
        *self.bays.lock().unwrap_or_else(|e| e.into_inner()) = bays;
    }

    pub fn set_bookings(&self, bookings: Vec<RawBooking>) {
        *self.bookings.lock().unwrap_or_else(|e| e.into_inner()) = bookings;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every `[from, to]` passed to `list_bookings`, oldest first.
    pub fn booking_windows(&self) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
        self.booking_windows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(Error::Connection("booking source unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

impl BookingSource for StaticBookingSource {
    fn list_bays(&self) -> Result<Vec<RemoteBay>> {
        self.check()?;
        Ok(self.bays.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn list_bookings(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<RawBooking>> {
        self.check()?;
        self.booking_windows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((from, to));

        // Same contract as the real API: bookings starting within the window
        Ok(self
            .bookings
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|booking| booking.start >= from && booking.start <= to)
            .cloned()
            .collect())
    }
}

/// Actuator that records every call and fails for chosen bays.
#[derive(Default)]
pub struct RecordingActuator {
    calls: Mutex<Vec<(String, Action)>>,
    failing: Mutex<Vec<String>>,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make actuation of `reference` fail with a timeout.
    pub fn fail_for(&self, reference: &str) {
        self.failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(reference.to_string());
    }

    /// Calls so far, sorted by bay reference.
    pub fn calls(&self) -> Vec<(String, Action)> {
        let mut calls = self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone();
        calls.sort_by(|a, b| a.0.cmp(&b.0));
        calls
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl BayActuator for RecordingActuator {
    fn actuate(&self, bay: &Bay, action: Action) -> Result<Outcome> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((bay.reference.clone(), action));

        let failing = self.failing.lock().unwrap_or_else(|e| e.into_inner());
        if failing.contains(&bay.reference) {
            return Err(Error::Timeout(format!("{} did not answer", bay.reference)));
        }

        Ok(match action {
            Action::Wake | Action::Rewake => Outcome::WakeSent,
            Action::Sleep => Outcome::PassiveSleep,
        })
    }
}

/// Neighbor table returning canned `arp -an` output.
pub struct StaticNeighborTable(pub String);

impl NeighborTable for StaticNeighborTable {
    fn query(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Build a bay record the way the booking API would report it.
pub fn remote_bay(id: &str, reference: &str) -> RemoteBay {
    RemoteBay {
        id: id.to_string(),
        reference: reference.to_string(),
        range: None,
    }
}

/// Build a confirmed bay booking.
pub fn bay_booking(id: &str, bay_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> RawBooking {
    RawBooking {
        id: id.to_string(),
        start,
        end,
        status: "confirmed".to_string(),
        kind: Some("bay".to_string()),
        is_block: false,
        bay_id: Some(bay_id.to_string()),
    }
}
