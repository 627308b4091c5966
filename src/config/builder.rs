//! Default configuration file generation.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::common::constants::*;

/// Write a commented default `baywake.toml` to `path`.
///
/// `api_root` and `api_key` are left commented out: they have no sensible
/// default and are often supplied through the environment instead.
pub fn create_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    fs::write(path, default_config_content())
        .with_context(|| format!("Failed to write default config to {}", path.display()))
}

pub(crate) fn default_config_content() -> String {
    let mut content = ConfigBuilder::new()
        .add_section("Booking API")
        .add_commented_setting(
            "api_root",
            "\"https://bookings.example.com/api\"",
            "Booking platform base URL (or set API_ROOT)",
        )
        .add_commented_setting("api_key", "\"\"", "Booking platform API key (or set API_KEY)")
        .add_setting(
            "http_timeout_secs",
            &DEFAULT_HTTP_TIMEOUT_SECS.to_string(),
            &format!(
                "Request timeout in seconds ({MINIMUM_HTTP_TIMEOUT_SECS}-{MAXIMUM_HTTP_TIMEOUT_SECS})"
            ),
        )
        .add_section("Booking windows")
        .add_setting(
            "pre_booking_minutes",
            &DEFAULT_PRE_BOOKING_MINUTES.to_string(),
            &format!(
                "Wake bays this long before a booking ({MINIMUM_BOOKING_MARGIN_MINUTES}-{MAXIMUM_BOOKING_MARGIN_MINUTES}) minutes"
            ),
        )
        .add_setting(
            "post_booking_minutes",
            &DEFAULT_POST_BOOKING_MINUTES.to_string(),
            &format!(
                "Keep bays on this long after a booking ({MINIMUM_BOOKING_MARGIN_MINUTES}-{MAXIMUM_BOOKING_MARGIN_MINUTES}) minutes"
            ),
        )
        .add_setting(
            "lookback_hours",
            &DEFAULT_LOOKBACK_HOURS.to_string(),
            &format!("Hours of past bookings to fetch (0-{MAXIMUM_LOOKBACK_HOURS})"),
        )
        .add_setting(
            "lookahead_hours",
            &DEFAULT_LOOKAHEAD_HOURS.to_string(),
            &format!(
                "Hours of upcoming bookings to fetch ({MINIMUM_LOOKAHEAD_HOURS}-{MAXIMUM_LOOKAHEAD_HOURS})"
            ),
        )
        .add_commented_setting(
            "timezone",
            "\"Europe/London\"",
            "Venue timezone for hour alignment and log timestamps (default: system)",
        )
        .add_section("Timers")
        .add_setting(
            "bay_fetch_interval_minutes",
            &DEFAULT_BAY_FETCH_INTERVAL_MINUTES.to_string(),
            &format!(
                "Bay directory refresh interval ({MINIMUM_BAY_FETCH_INTERVAL_MINUTES}-{MAXIMUM_BAY_FETCH_INTERVAL_MINUTES}) minutes"
            ),
        )
        .add_setting(
            "booking_fetch_interval_minutes",
            &DEFAULT_BOOKING_FETCH_INTERVAL_MINUTES.to_string(),
            &format!(
                "Reconciliation interval ({MINIMUM_BOOKING_FETCH_INTERVAL_MINUTES}-{MAXIMUM_BOOKING_FETCH_INTERVAL_MINUTES}) minutes"
            ),
        )
        .add_setting(
            "cycle_watchdog_secs",
            &DEFAULT_CYCLE_WATCHDOG_SECS.to_string(),
            &format!(
                "Stop starting new actuations after this long ({MINIMUM_CYCLE_WATCHDOG_SECS}-{MAXIMUM_CYCLE_WATCHDOG_SECS}) seconds"
            ),
        )
        .add_setting(
            "actuation_workers",
            &DEFAULT_ACTUATION_WORKERS.to_string(),
            &format!(
                "Bays actuated in parallel ({MINIMUM_ACTUATION_WORKERS}-{MAXIMUM_ACTUATION_WORKERS})"
            ),
        )
        .add_section("Bays")
        .add_setting(
            "bay_mapping",
            &format!("\"{DEFAULT_BAY_MAPPING_FILE}\""),
            "Bay mapping file, relative to this directory",
        )
        .add_setting(
            "resolve_addresses",
            &DEFAULT_RESOLVE_ADDRESSES.to_string(),
            "Look up projector IPs in the neighbor table on refresh",
        )
        .add_setting(
            "redundant_wake",
            &DEFAULT_REDUNDANT_WAKE.to_string(),
            "Re-send Wake-on-LAN to bays that are already active",
        )
        .add_section("Devices")
        .add_setting(
            "wol_broadcast",
            &format!("\"{DEFAULT_WOL_BROADCAST}\""),
            "Wake-on-LAN broadcast address",
        )
        .add_setting(
            "wol_port",
            &DEFAULT_WOL_PORT.to_string(),
            "Wake-on-LAN UDP port",
        )
        .add_setting(
            "pjlink_port",
            &DEFAULT_PJLINK_PORT.to_string(),
            "PJLink TCP port",
        )
        .add_setting(
            "pjlink_timeout_ms",
            &DEFAULT_PJLINK_TIMEOUT_MS.to_string(),
            &format!(
                "PJLink connect/read timeout ({MINIMUM_PJLINK_TIMEOUT_MS}-{MAXIMUM_PJLINK_TIMEOUT_MS}) ms"
            ),
        )
        .add_setting(
            "power_on_after_wake",
            &DEFAULT_POWER_ON_AFTER_WAKE.to_string(),
            "Send PJLink power on after Wake-on-LAN when the IP is known",
        )
        .build();
    content.push('\n');
    content
}

struct ConfigBuilder {
    entries: Vec<ConfigEntry>,
}

enum ConfigEntry {
    Section(String),
    Setting { line: String, comment: String },
}

impl ConfigBuilder {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn add_section(mut self, title: &str) -> Self {
        self.entries.push(ConfigEntry::Section(format!("#[{title}]")));
        self
    }

    fn add_setting(mut self, key: &str, value: &str, comment: &str) -> Self {
        self.entries.push(ConfigEntry::Setting {
            line: format!("{key} = {value}"),
            comment: format!("# {comment}"),
        });
        self
    }

    /// A setting the user has to uncomment to use.
    fn add_commented_setting(mut self, key: &str, value: &str, comment: &str) -> Self {
        self.entries.push(ConfigEntry::Setting {
            line: format!("#{key} = {value}"),
            comment: format!("# {comment}"),
        });
        self
    }

    fn build(self) -> String {
        // Comments line up one space past the longest setting
        let max_width = self
            .entries
            .iter()
            .filter_map(|entry| match entry {
                ConfigEntry::Setting { line, .. } => Some(line.len()),
                ConfigEntry::Section(_) => None,
            })
            .max()
            .unwrap_or(0)
            + 1;

        let mut result = Vec::new();
        for entry in self.entries {
            match entry {
                ConfigEntry::Section(title) => {
                    if !result.is_empty() {
                        result.push(String::new());
                    }
                    result.push(title);
                }
                ConfigEntry::Setting { line, comment } => {
                    let padding = " ".repeat(max_width - line.len());
                    result.push(format!("{line}{padding}{comment}"));
                }
            }
        }

        result.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_default_content_parses_with_defaults() {
        let config: Config = toml::from_str(&default_config_content()).unwrap();
        assert_eq!(config.api_root, None);
        assert_eq!(config.api_key, None);
        assert_eq!(
            config.pre_booking_minutes,
            Some(DEFAULT_PRE_BOOKING_MINUTES)
        );
        assert_eq!(config.pjlink_port, Some(DEFAULT_PJLINK_PORT));
        assert_eq!(config.bay_mapping.as_deref(), Some(DEFAULT_BAY_MAPPING_FILE));
        assert_eq!(config.timezone, None);
    }

    #[test]
    fn test_comments_are_aligned() {
        let content = default_config_content();
        let columns: Vec<usize> = content
            .lines()
            .filter(|line| line.contains(" = "))
            .filter_map(|line| line.find(" # "))
            .collect();
        assert!(!columns.is_empty());
        assert!(columns.iter().all(|&c| c == columns[0]));
    }
}
