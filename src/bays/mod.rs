//! Bay identity, hardware addresses and the per-bay activation state.
//!
//! A [`Bay`] is the join of a bay record from the booking source with an entry
//! in the local mapping table. Bays without a mapping entry never get this far.

pub mod directory;
pub mod mapping;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::error::{Error, Result};

pub use directory::BayDirectory;
pub use mapping::{BayMapping, MappingEntry};

/// Bay reference → should be powered.
pub type BayState = BTreeMap<String, bool>;

/// A 6-byte link-layer address.
///
/// Parses `:` or `-` separated hex in any case (single-digit octets are
/// accepted since BSD `arp` prints them that way). Always displays as
/// uppercase colon-separated pairs, which is also the comparison form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HardwareAddress([u8; 6]);

impl HardwareAddress {
    pub fn octets(&self) -> &[u8; 6] {
        &self.0
    }
}

impl FromStr for HardwareAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let separator = if trimmed.contains(':') { ':' } else { '-' };
        let parts: Vec<&str> = trimmed.split(separator).collect();

        if parts.len() != 6 {
            return Err(Error::InvalidAddress(format!(
                "'{s}' is not a hardware address (expected 6 octets)"
            )));
        }

        let mut octets = [0u8; 6];
        for (slot, part) in octets.iter_mut().zip(parts) {
            if part.is_empty() || part.len() > 2 {
                return Err(Error::InvalidAddress(format!(
                    "'{s}' has a malformed octet '{part}'"
                )));
            }
            *slot = u8::from_str_radix(part, 16).map_err(|_| {
                Error::InvalidAddress(format!("'{s}' has a non-hex octet '{part}'"))
            })?;
        }

        Ok(Self(octets))
    }
}

impl fmt::Display for HardwareAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl Serialize for HardwareAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for HardwareAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A bay known to the reconciliation loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bay {
    /// Opaque id assigned by the booking source
    pub id: String,
    /// Stable human-readable key used by the local mapping table
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(rename = "mac")]
    pub hardware_address: HardwareAddress,
    #[serde(rename = "ip", default, skip_serializing_if = "Option::is_none")]
    pub network_address: Option<IpAddr>,
    /// Booking source's bay range or area label, informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
}
