//! Activation windows and per-bay state derivation.
//!
//! A booking keeps its bay powered from `start − pre` to `end + post`,
//! inclusive at both ends. [`compute_states`] is pure: the caller supplies
//! `now`, so the same inputs always yield the same [`BayState`].

use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};

use crate::bays::{Bay, BayState};
use crate::booking::Booking;

/// Pre/post booking margins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingMargins {
    pub pre: Duration,
    pub post: Duration,
}

impl BookingMargins {
    pub fn from_minutes(pre: i64, post: i64) -> Self {
        Self {
            pre: Duration::minutes(pre),
            post: Duration::minutes(post),
        }
    }
}

/// Span during which `booking` requires its bay.
pub fn activation_window(
    booking: &Booking,
    margins: &BookingMargins,
) -> (DateTime<Utc>, DateTime<Utc>) {
    (booking.start - margins.pre, booking.end + margins.post)
}

/// Whether `now` falls inside the booking's activation window.
pub fn window_contains(booking: &Booking, margins: &BookingMargins, now: DateTime<Utc>) -> bool {
    let (from, to) = activation_window(booking, margins);
    from <= now && now <= to
}

/// Derive the active/inactive state of every bay.
///
/// Bays with no bookings default to inactive. Scanning a bay's bookings stops
/// at the first window containing `now`.
pub fn compute_states(
    now: DateTime<Utc>,
    bays: &[Bay],
    bookings: &[Booking],
    margins: &BookingMargins,
) -> BayState {
    bays.iter()
        .map(|bay| {
            let active = bookings
                .iter()
                .filter(|booking| booking.bay_id == bay.id)
                .any(|booking| window_contains(booking, margins, now));
            (bay.reference.clone(), active)
        })
        .collect()
}

/// Booking fetch range: start of the hour `lookback` hours ago to start of the
/// hour `lookahead` hours ahead, with hours measured in `tz`.
pub fn fetch_window<Tz: TimeZone>(
    now: DateTime<Utc>,
    lookback_hours: i64,
    lookahead_hours: i64,
    tz: &Tz,
) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        start_of_hour(now - Duration::hours(lookback_hours), tz),
        start_of_hour(now + Duration::hours(lookahead_hours), tz),
    )
}

fn start_of_hour<Tz: TimeZone>(instant: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    let local = instant.with_timezone(tz);
    // Subtracting keeps the result unambiguous across DST changes
    let into_hour = Duration::minutes(i64::from(local.minute()))
        + Duration::seconds(i64::from(local.second()))
        + Duration::nanoseconds(i64::from(local.nanosecond()));
    instant - into_hour
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::BookingStatus;

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

    fn booking(bay_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Booking {
        Booking {
            id: format!("{bay_id}-{}", start.timestamp()),
            start,
            end,
            status: BookingStatus::Confirmed,
            bay_id: bay_id.to_string(),
            bay_reference: format!("BAY-{bay_id}"),
        }
    }

    fn margins() -> BookingMargins {
        BookingMargins::from_minutes(15, 35)
    }

    #[test]
    fn test_scenario_around_ten_to_eleven_booking() {
        let bays = vec![bay("1", "BAY-1")];
        let bookings = vec![booking("1", at(10, 0), at(11, 0))];

        let state = |now| compute_states(now, &bays, &bookings, &margins())["BAY-1"];
        assert!(!state(at(9, 44)));
        assert!(state(at(9, 45)));
        assert!(state(at(9, 50)));
        assert!(state(at(11, 34)));
        assert!(state(at(11, 35)));
        assert!(!state(at(11, 36)));
    }

    #[test]
    fn test_bays_without_bookings_are_inactive() {
        let bays = vec![bay("1", "BAY-1"), bay("2", "BAY-2")];
        let bookings = vec![booking("1", at(10, 0), at(11, 0))];

        let states = compute_states(at(10, 30), &bays, &bookings, &margins());
        assert_eq!(states.len(), 2);
        assert!(states["BAY-1"]);
        assert!(!states["BAY-2"]);
    }

    #[test]
    fn test_any_overlapping_booking_activates() {
        let bays = vec![bay("1", "BAY-1")];
        let bookings = vec![
            booking("1", at(8, 0), at(9, 0)),
            booking("1", at(12, 0), at(13, 0)),
        ];
        let states = compute_states(at(11, 50), &bays, &bookings, &margins());
        assert!(states["BAY-1"]);
    }

    #[test]
    fn test_zero_margins() {
        let bays = vec![bay("1", "BAY-1")];
        let bookings = vec![booking("1", at(10, 0), at(11, 0))];
        let none = BookingMargins::from_minutes(0, 0);

        assert!(compute_states(at(10, 0), &bays, &bookings, &none)["BAY-1"]);
        assert!(compute_states(at(11, 0), &bays, &bookings, &none)["BAY-1"]);
        assert!(!compute_states(at(11, 1), &bays, &bookings, &none)["BAY-1"]);
    }

    #[test]
    fn test_fetch_window_aligns_to_hours() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 10, 42, 17).unwrap();
        let (from, to) = fetch_window(now, 2, 6, &Utc);
        assert_eq!(from, at(8, 0));
        assert_eq!(to, at(16, 0));
    }

    #[test]
    fn test_fetch_window_half_hour_timezone() {
        // Kolkata is UTC+05:30, so local hour boundaries fall on :30 UTC
        let tz = chrono_tz::Asia::Kolkata;
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 10, 42, 0).unwrap();
        let (from, to) = fetch_window(now, 2, 6, &tz);
        assert_eq!(from, at(8, 30));
        assert_eq!(to, at(16, 30));
    }
}
