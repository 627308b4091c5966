//! Configuration validation.
//!
//! Runs on the fully merged configuration and reports the first violation,
//! naming the offending key and value.

use anyhow::Result;
use std::fmt::Display;
use std::net::Ipv4Addr;
use std::ops::RangeInclusive;

use super::Config;
use crate::common::constants::*;

pub fn validate_config(config: &Config) -> Result<()> {
    validate_api(config)?;

    check_range(
        "pre_booking_minutes",
        config.pre_booking_minutes,
        MINIMUM_BOOKING_MARGIN_MINUTES..=MAXIMUM_BOOKING_MARGIN_MINUTES,
        "minutes",
    )?;
    check_range(
        "post_booking_minutes",
        config.post_booking_minutes,
        MINIMUM_BOOKING_MARGIN_MINUTES..=MAXIMUM_BOOKING_MARGIN_MINUTES,
        "minutes",
    )?;
    check_range(
        "bay_fetch_interval_minutes",
        config.bay_fetch_interval_minutes,
        MINIMUM_BAY_FETCH_INTERVAL_MINUTES..=MAXIMUM_BAY_FETCH_INTERVAL_MINUTES,
        "minutes",
    )?;
    check_range(
        "booking_fetch_interval_minutes",
        config.booking_fetch_interval_minutes,
        MINIMUM_BOOKING_FETCH_INTERVAL_MINUTES..=MAXIMUM_BOOKING_FETCH_INTERVAL_MINUTES,
        "minutes",
    )?;
    check_range(
        "lookback_hours",
        config.lookback_hours,
        0..=MAXIMUM_LOOKBACK_HOURS,
        "hours",
    )?;
    check_range(
        "lookahead_hours",
        config.lookahead_hours,
        MINIMUM_LOOKAHEAD_HOURS..=MAXIMUM_LOOKAHEAD_HOURS,
        "hours",
    )?;
    check_range(
        "pjlink_timeout_ms",
        config.pjlink_timeout_ms,
        MINIMUM_PJLINK_TIMEOUT_MS..=MAXIMUM_PJLINK_TIMEOUT_MS,
        "milliseconds",
    )?;
    check_range(
        "actuation_workers",
        config.actuation_workers,
        MINIMUM_ACTUATION_WORKERS..=MAXIMUM_ACTUATION_WORKERS,
        "workers",
    )?;
    check_range(
        "cycle_watchdog_secs",
        config.cycle_watchdog_secs,
        MINIMUM_CYCLE_WATCHDOG_SECS..=MAXIMUM_CYCLE_WATCHDOG_SECS,
        "seconds",
    )?;
    check_range(
        "http_timeout_secs",
        config.http_timeout_secs,
        MINIMUM_HTTP_TIMEOUT_SECS..=MAXIMUM_HTTP_TIMEOUT_SECS,
        "seconds",
    )?;

    for (key, port) in [("wol_port", config.wol_port), ("pjlink_port", config.pjlink_port)] {
        if port == Some(0) {
            anyhow::bail!("{key} (0) must be between 1 and 65535");
        }
    }

    if let Some(ref broadcast) = config.wol_broadcast
        && broadcast.parse::<Ipv4Addr>().is_err()
    {
        anyhow::bail!("wol_broadcast ({broadcast:?}) must be an IPv4 address");
    }

    if let Some(ref tz) = config.timezone
        && tz.parse::<chrono_tz::Tz>().is_err()
    {
        anyhow::bail!("timezone ({tz:?}) is not a known IANA timezone name, e.g. \"Europe/London\"");
    }

    if let Some(ref mapping) = config.bay_mapping
        && mapping.trim().is_empty()
    {
        anyhow::bail!("bay_mapping must not be empty (remove it to use {DEFAULT_BAY_MAPPING_FILE})");
    }

    Ok(())
}

fn validate_api(config: &Config) -> Result<()> {
    let api_root = config.api_root.as_deref().map(str::trim).unwrap_or_default();
    if api_root.is_empty() {
        anyhow::bail!("api_root is not set (add it to baywake.toml or set API_ROOT)");
    }
    if !(api_root.starts_with("http://") || api_root.starts_with("https://")) {
        anyhow::bail!("api_root ({api_root:?}) must be an http:// or https:// URL");
    }

    let api_key = config.api_key.as_deref().map(str::trim).unwrap_or_default();
    if api_key.is_empty() {
        anyhow::bail!("api_key is not set (add it to baywake.toml or set API_KEY)");
    }

    Ok(())
}

fn check_range<T>(key: &str, value: Option<T>, range: RangeInclusive<T>, unit: &str) -> Result<()>
where
    T: PartialOrd + Display + Copy,
{
    if let Some(value) = value
        && !range.contains(&value)
    {
        anyhow::bail!(
            "{} ({} {}) must be between {} and {} {}",
            key,
            value,
            unit,
            range.start(),
            range.end(),
            unit
        );
    }
    Ok(())
}
