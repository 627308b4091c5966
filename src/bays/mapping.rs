//! Local mapping table: bay reference → hardware address and optional static IP.
//!
//! Stored as a JSON array of `{ "ref", "mac", "ip"? }` objects. The table is the
//! only place hardware addresses come from; the booking source knows nothing
//! about them.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::Write;
use std::net::IpAddr;
use std::path::Path;

use super::HardwareAddress;
use crate::error::{Error, Result};

/// One row of the mapping file, as written by operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    #[serde(rename = "ref")]
    pub reference: String,
    pub mac: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

/// Validated hardware details for one bay reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedHardware {
    pub hardware_address: HardwareAddress,
    pub network_address: Option<IpAddr>,
}

/// Validated mapping table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BayMapping {
    entries: BTreeMap<String, MappedHardware>,
}

impl BayMapping {
    /// Validate raw entries: references non-empty and unique, MACs and IPs parseable.
    pub fn from_entries(entries: &[MappingEntry]) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut validated = BTreeMap::new();

        for (index, entry) in entries.iter().enumerate() {
            let reference = entry.reference.trim();
            if reference.is_empty() {
                return Err(Error::Directory(format!(
                    "mapping entry #{} has an empty ref",
                    index + 1
                )));
            }
            if !seen.insert(reference.to_string()) {
                return Err(Error::Directory(format!(
                    "bay ref '{reference}' appears more than once"
                )));
            }

            let hardware_address: HardwareAddress = entry.mac.parse()?;
            let network_address = match entry.ip.as_deref().map(str::trim) {
                None | Some("") => None,
                Some(ip) => Some(ip.parse::<IpAddr>().map_err(|_| {
                    Error::InvalidAddress(format!("bay ref '{reference}' has invalid ip '{ip}'"))
                })?),
            };

            validated.insert(
                reference.to_string(),
                MappedHardware {
                    hardware_address,
                    network_address,
                },
            );
        }

        Ok(Self { entries: validated })
    }

    /// Load and validate the mapping file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Directory(format!("cannot read mapping file {}: {e}", path.display()))
        })?;
        let entries: Vec<MappingEntry> = serde_json::from_str(&content).map_err(|e| {
            Error::Directory(format!("mapping file {} is not valid: {e}", path.display()))
        })?;
        Self::from_entries(&entries)
    }

    /// Write the mapping atomically: temp file in the same directory, then rename.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let io_err = |e: std::io::Error| {
            Error::Directory(format!("cannot write mapping file {}: {e}", path.display()))
        };

        let json = serde_json::to_string_pretty(&self.to_entries())
            .map_err(|e| Error::Directory(format!("cannot encode mapping: {e}")))?;

        let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
        temp.write_all(json.as_bytes()).map_err(io_err)?;
        temp.write_all(b"\n").map_err(io_err)?;
        temp.as_file().sync_all().map_err(io_err)?;
        temp.persist(path).map_err(|e| io_err(e.error))?;
        Ok(())
    }

    pub fn get(&self, reference: &str) -> Option<&MappedHardware> {
        self.entries.get(reference)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Normalized rows, suitable for saving or returning to a client.
    pub fn to_entries(&self) -> Vec<MappingEntry> {
        self.entries
            .iter()
            .map(|(reference, hw)| MappingEntry {
                reference: reference.clone(),
                mac: hw.hardware_address.to_string(),
                ip: hw.network_address.map(|ip| ip.to_string()),
            })
            .collect()
    }
}
