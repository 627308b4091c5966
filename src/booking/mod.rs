//! Booking source contract and booking qualification.
//!
//! The booking source is the system of record for bays and bookings. Only
//! bookings that can actually affect a bay's power survive [`qualify_bookings`];
//! everything downstream can assume a [`Booking`] is live and belongs to a bay
//! in the current directory.

pub mod http;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::bays::BayDirectory;
use crate::error::Result;

pub use http::HttpBookingSource;

/// Remote system of record for scheduled bay usage.
#[cfg_attr(test, mockall::automock)]
pub trait BookingSource: Send + Sync {
    /// Authoritative bay list.
    fn list_bays(&self) -> Result<Vec<RemoteBay>>;

    /// Bookings starting within `[from, to]`.
    fn list_bookings(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<RawBooking>>;
}

/// Bay record as the booking source reports it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteBay {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default, deserialize_with = "optional_flexible_id")]
    pub range: Option<String>,
}

/// Booking record as the booking source reports it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBooking {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub is_block: bool,
    #[serde(default, deserialize_with = "optional_flexible_id")]
    pub bay_id: Option<String>,
}

/// Statuses that keep a bay powered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Attended,
}

impl BookingStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "confirmed" => Some(Self::Confirmed),
            "attended" => Some(Self::Attended),
            _ => None,
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Confirmed => write!(f, "confirmed"),
            Self::Attended => write!(f, "attended"),
        }
    }
}

/// A booking that passed qualification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Booking {
    pub id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: BookingStatus,
    /// Directory id of the bay
    pub bay_id: String,
    /// Reference of the bay, for logs
    pub bay_reference: String,
}

/// Drop block bookings, non-bay bookings, unconfirmed bookings and bookings for
/// bays outside the directory.
pub fn qualify_bookings(raw: Vec<RawBooking>, directory: &BayDirectory) -> Vec<Booking> {
    raw.into_iter()
        .filter_map(|booking| {
            if booking.is_block || booking.kind.as_deref() != Some("bay") {
                return None;
            }
            let status = BookingStatus::parse(&booking.status)?;
            let bay = directory.by_id(booking.bay_id.as_deref()?)?;

            Some(Booking {
                id: booking.id,
                start: booking.start,
                end: booking.end,
                status,
                bay_id: bay.id.clone(),
                bay_reference: bay.reference.clone(),
            })
        })
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlexibleId {
    Number(serde_json::Number),
    Text(String),
}

impl From<FlexibleId> for String {
    fn from(id: FlexibleId) -> Self {
        match id {
            FlexibleId::Number(n) => n.to_string(),
            FlexibleId::Text(s) => s,
        }
    }
}

// Booking APIs disagree on numeric vs string ids; normalize to strings
fn flexible_id<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    FlexibleId::deserialize(deserializer).map(String::from)
}

fn optional_flexible_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    Option::<FlexibleId>::deserialize(deserializer).map(|id| id.map(String::from))
}
