//! Hardware → network address resolution from the host's neighbor table.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use std::process::Command;

use crate::bays::HardwareAddress;
use crate::error::{Error, Result};

// Matches `? (192.168.1.2) at 00:11:22:33:44:55 [ether] on eth0`
static NEIGHBOR_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\? \(([\d.]+)\) at ([0-9a-f]{1,2}(?::[0-9a-f]{1,2}){5})")
        .unwrap_or_else(|e| unreachable!("neighbor table pattern is valid: {e}"))
});

/// Source of raw neighbor-table text.
pub trait NeighborTable: Send + Sync {
    fn query(&self) -> Result<String>;
}

/// Runs `arp -an`.
pub struct ArpCommand;

impl NeighborTable for ArpCommand {
    fn query(&self) -> Result<String> {
        let output = Command::new("arp")
            .arg("-an")
            .output()
            .map_err(|e| Error::Resolution(format!("failed to run arp: {e}")))?;

        if !output.status.success() {
            return Err(Error::Resolution(format!(
                "arp exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            return Err(Error::Resolution(format!("arp reported: {}", stderr.trim())));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Extract the requested hardware addresses from neighbor-table output.
///
/// Addresses not present are absent from the result. When a hardware address
/// appears on several lines the last one wins.
pub fn parse_neighbor_table(
    output: &str,
    wanted: &BTreeSet<HardwareAddress>,
) -> BTreeMap<HardwareAddress, IpAddr> {
    let mut results = BTreeMap::new();

    for line in output.lines() {
        let Some(captures) = NEIGHBOR_LINE.captures(line) else {
            continue;
        };
        let (Ok(ip), Ok(mac)) = (
            captures[1].parse::<IpAddr>(),
            captures[2].parse::<HardwareAddress>(),
        ) else {
            continue;
        };
        if wanted.contains(&mac) {
            results.insert(mac, ip);
        }
    }

    results
}

/// Resolve hardware addresses through a neighbor table.
///
/// Fails only when the table query itself fails.
pub fn resolve(
    table: &dyn NeighborTable,
    wanted: &BTreeSet<HardwareAddress>,
) -> Result<BTreeMap<HardwareAddress, IpAddr>> {
    if wanted.is_empty() {
        return Ok(BTreeMap::new());
    }
    let output = table.query()?;
    Ok(parse_neighbor_table(&output, wanted))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINUX_OUTPUT: &str = "\
? (192.168.1.1) at a4:91:b1:0c:22:10 [ether] on eth0
? (192.168.1.2) at 00:11:22:33:44:55 [ether] on eth0
? (192.168.1.9) at <incomplete> on eth0
";

    fn wanted(macs: &[&str]) -> BTreeSet<HardwareAddress> {
        macs.iter().map(|m| m.parse().unwrap()).collect()
    }

    #[test]
    fn test_resolves_requested_address_any_case() {
        let result = parse_neighbor_table(LINUX_OUTPUT, &wanted(&["00:11:22:33:44:55"]));
        assert_eq!(result.len(), 1);
        let mac: HardwareAddress = "00:11:22:33:44:55".parse().unwrap();
        assert_eq!(result[&mac], "192.168.1.2".parse::<IpAddr>().unwrap());

        let upper = parse_neighbor_table(LINUX_OUTPUT, &wanted(&["A4:91:B1:0C:22:10"]));
        assert_eq!(upper.len(), 1);
    }

    #[test]
    fn test_missing_address_is_absent_not_error() {
        let result = parse_neighbor_table(LINUX_OUTPUT, &wanted(&["66:77:88:99:AA:BB"]));
        assert!(result.is_empty());
    }

    #[test]
    fn test_bsd_single_digit_octets() {
        let output = "? (10.0.0.7) at 0:11:22:3:44:55 on en0 ifscope [ethernet]\n";
        let result = parse_neighbor_table(output, &wanted(&["00:11:22:03:44:55"]));
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_last_line_wins_for_duplicate_mac() {
        let output = "\
? (10.0.0.7) at 00:11:22:33:44:55 [ether] on eth0
? (10.0.0.8) at 00:11:22:33:44:55 [ether] on eth1
";
        let mac: HardwareAddress = "00:11:22:33:44:55".parse().unwrap();
        let result = parse_neighbor_table(output, &wanted(&["00:11:22:33:44:55"]));
        assert_eq!(result[&mac], "10.0.0.8".parse::<IpAddr>().unwrap());
    }

    struct FailingTable;

    impl NeighborTable for FailingTable {
        fn query(&self) -> Result<String> {
            Err(Error::Resolution("arp: permission denied".to_string()))
        }
    }

    #[test]
    fn test_query_failure_rejects() {
        let result = resolve(&FailingTable, &wanted(&["00:11:22:33:44:55"]));
        assert!(matches!(result, Err(Error::Resolution(_))));
    }

    #[test]
    fn test_empty_request_skips_query() {
        assert!(resolve(&FailingTable, &BTreeSet::new()).unwrap().is_empty());
    }
}
