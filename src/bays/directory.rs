//! Bay directory: the booking source's bay list joined with the local mapping.
//!
//! A directory is built whole and never edited. A failed refresh produces no
//! directory at all, so the caller keeps serving the previous snapshot.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

use super::{Bay, BayMapping};
use crate::booking::BookingSource;
use crate::device::arp::{self, NeighborTable};
use crate::error::{Error, Result};

/// Immutable snapshot of the bays under control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BayDirectory {
    bays: Vec<Bay>,
    refreshed_at: DateTime<Utc>,
}

impl BayDirectory {
    pub fn new(bays: Vec<Bay>, refreshed_at: DateTime<Utc>) -> Self {
        Self { bays, refreshed_at }
    }

    pub fn bays(&self) -> &[Bay] {
        &self.bays
    }

    pub fn by_id(&self, id: &str) -> Option<&Bay> {
        self.bays.iter().find(|bay| bay.id == id)
    }

    pub fn by_reference(&self, reference: &str) -> Option<&Bay> {
        self.bays.iter().find(|bay| bay.reference == reference)
    }

    pub fn refreshed_at(&self) -> DateTime<Utc> {
        self.refreshed_at
    }

    pub fn len(&self) -> usize {
        self.bays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bays.is_empty()
    }
}

/// Report of what a refresh did beyond building the directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Bays the booking source knows that have no mapping entry
    pub unmapped: Vec<String>,
}

/// Build a fresh directory.
///
/// Bays without a mapping entry are skipped. With `resolve_addresses` every
/// hardware address is looked up in the neighbor table and the refresh fails
/// if any of them is missing.
pub fn refresh(
    source: &dyn BookingSource,
    mapping: &BayMapping,
    neighbors: &dyn NeighborTable,
    resolve_addresses: bool,
    now: DateTime<Utc>,
) -> Result<(BayDirectory, RefreshReport)> {
    let remote = source.list_bays()?;

    let mut report = RefreshReport::default();
    let mut seen_ids = HashSet::new();
    let mut bays = Vec::with_capacity(remote.len());

    for remote_bay in remote {
        // Mapping refs are stored trimmed
        let reference = remote_bay.reference.trim().to_string();
        let Some(hardware) = mapping.get(&reference) else {
            report.unmapped.push(reference);
            continue;
        };

        if !seen_ids.insert(remote_bay.id.clone()) {
            return Err(Error::Directory(format!(
                "booking source lists bay id {} more than once",
                remote_bay.id
            )));
        }

        bays.push(Bay {
            id: remote_bay.id,
            reference,
            hardware_address: hardware.hardware_address,
            network_address: hardware.network_address,
            range: remote_bay.range,
        });
    }

    if resolve_addresses {
        let wanted: BTreeSet<_> = bays.iter().map(|bay| bay.hardware_address).collect();
        let resolved = arp::resolve(neighbors, &wanted)?;

        let missing: Vec<String> = bays
            .iter()
            .filter(|bay| !resolved.contains_key(&bay.hardware_address))
            .map(|bay| format!("{} ({})", bay.reference, bay.hardware_address))
            .collect();
        if !missing.is_empty() {
            return Err(Error::Resolution(format!(
                "not in the neighbor table: {}",
                missing.join(", ")
            )));
        }

        for bay in &mut bays {
            bay.network_address = resolved.get(&bay.hardware_address).copied();
        }
    }

    Ok((BayDirectory::new(bays, now), report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bays::MappingEntry;
    use crate::booking::{MockBookingSource, RemoteBay};
    use chrono::TimeZone;

    struct StaticTable(&'static str);

    impl NeighborTable for StaticTable {
        fn query(&self) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap()
    }

    fn remote(id: &str, reference: &str) -> RemoteBay {
        RemoteBay {
            id: id.to_string(),
            reference: reference.to_string(),
            range: None,
        }
    }

    fn mapping() -> BayMapping {
        BayMapping::from_entries(&[
            MappingEntry {
                reference: "BAY-1".to_string(),
                mac: "00:11:22:33:44:55".to_string(),
                ip: Some("192.168.1.50".to_string()),
            },
            MappingEntry {
                reference: "BAY-2".to_string(),
                mac: "66:77:88:99:aa:bb".to_string(),
                ip: None,
            },
        ])
        .unwrap()
    }

    fn source_with(bays: Vec<RemoteBay>) -> MockBookingSource {
        let mut source = MockBookingSource::new();
        source
            .expect_list_bays()
            .times(1)
            .return_once(move || Ok(bays));
        source
    }

    #[test]
    fn test_unmapped_bays_are_skipped() {
        let source = source_with(vec![
            remote("1", "BAY-1"),
            remote("2", "BAY-2"),
            remote("3", "BAY-3"),
        ]);

        let (directory, report) =
            refresh(&source, &mapping(), &StaticTable(""), false, now()).unwrap();

        assert_eq!(directory.len(), 2);
        assert_eq!(report.unmapped, vec!["BAY-3".to_string()]);
        assert_eq!(
            directory.by_reference("BAY-1").unwrap().network_address,
            Some("192.168.1.50".parse().unwrap())
        );
        assert_eq!(directory.refreshed_at(), now());
    }

    #[test]
    fn test_remote_refs_are_trimmed_before_lookup() {
        let source = source_with(vec![remote("1", " BAY-1 "), remote("2", "BAY-2\t")]);

        let (directory, report) =
            refresh(&source, &mapping(), &StaticTable(""), false, now()).unwrap();

        assert!(report.unmapped.is_empty());
        assert_eq!(directory.by_id("1").unwrap().reference, "BAY-1");
        assert!(directory.by_reference("BAY-2").is_some());
    }

    #[test]
    fn test_source_failure_propagates() {
        let mut source = MockBookingSource::new();
        source
            .expect_list_bays()
            .return_once(|| Err(Error::Connection("api down".to_string())));

        let result = refresh(&source, &mapping(), &StaticTable(""), false, now());
        assert!(matches!(result, Err(Error::Connection(_))));
    }

    #[test]
    fn test_resolution_overrides_static_addresses() {
        let source = source_with(vec![remote("1", "BAY-1"), remote("2", "BAY-2")]);
        let table = StaticTable(
            "? (10.0.0.11) at 00:11:22:33:44:55 [ether] on eth0\n\
             ? (10.0.0.12) at 66:77:88:99:aa:bb [ether] on eth0\n",
        );

        let (directory, _) = refresh(&source, &mapping(), &table, true, now()).unwrap();
        assert_eq!(
            directory.by_id("1").unwrap().network_address,
            Some("10.0.0.11".parse().unwrap())
        );
        assert_eq!(
            directory.by_id("2").unwrap().network_address,
            Some("10.0.0.12".parse().unwrap())
        );
    }

    #[test]
    fn test_partial_resolution_fails_whole_refresh() {
        let source = source_with(vec![remote("1", "BAY-1"), remote("2", "BAY-2")]);
        let table = StaticTable("? (10.0.0.11) at 00:11:22:33:44:55 [ether] on eth0\n");

        let result = refresh(&source, &mapping(), &table, true, now());
        match result {
            Err(Error::Resolution(msg)) => assert!(msg.contains("BAY-2")),
            other => panic!("expected resolution error, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_remote_id_is_directory_error() {
        let source = source_with(vec![remote("1", "BAY-1"), remote("1", "BAY-2")]);
        let result = refresh(&source, &mapping(), &StaticTable(""), false, now());
        assert!(matches!(result, Err(Error::Directory(_))));
    }
}
