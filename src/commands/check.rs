//! Check command - a dry run of one reconciliation cycle.
//!
//! Refreshes the bay directory, fetches bookings and computes which bays
//! should be powered, exactly as the daemon would, then prints the result.
//! Nothing is woken or powered off and a running daemon is not consulted.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::bays::{BayMapping, directory};
use crate::booking::HttpBookingSource;
use crate::config;
use crate::core::reconcile::evaluate;
use crate::device::ArpCommand;
use crate::time_source::{self, FixedTimeSource};

/// Handle the check command.
///
/// # Arguments
/// * `at` - Evaluate at this RFC 3339 instant instead of now
pub fn handle_check_command(at: Option<&str>, debug_enabled: bool) -> Result<()> {
    log_version!();

    if let Some(at) = at {
        let instant = time_source::parse_instant(at).map_err(anyhow::Error::msg)?;
        time_source::init_time_source(Arc::new(FixedTimeSource::new(instant)));
    }
    let now = time_source::now();

    let config = config::load()?;
    crate::logger::Log::set_timezone(config.venue_timezone());
    let mapping_path = config.mapping_path()?;
    let mapping = BayMapping::load(&mapping_path)?;

    let source = HttpBookingSource::new(config.api_root(), config.api_key(), config.http_timeout())
        .context("Failed to create booking API client")?;

    let (bay_directory, report) = directory::refresh(
        &source,
        &mapping,
        &ArpCommand,
        config.resolve_addresses(),
        now,
    )
    .context("Bay directory refresh failed")?;

    log_block_start!(
        "Evaluating {} bays at {}",
        bay_directory.len(),
        now.to_rfc3339()
    );
    if !report.unmapped.is_empty() {
        log_indented!("Not in the mapping: {}", report.unmapped.join(", "));
    }

    let settings = config.reconcile_settings(debug_enabled);
    let (states, bookings) =
        evaluate(&source, &bay_directory, &settings, now).context("Booking fetch failed")?;

    log_block_start!("{} qualifying bookings", bookings);
    for (reference, active) in &states {
        let bay = bay_directory.by_reference(reference);
        let address = bay
            .and_then(|bay| bay.network_address)
            .map(|ip| format!(" ({ip})"))
            .unwrap_or_default();
        log_indented!(
            "{reference}{address}: {}",
            if *active { "active" } else { "idle" }
        );
    }

    let active = states.values().filter(|active| **active).count();
    log_block_start!("{active} of {} bays would be powered", states.len());
    log_end!();
    Ok(())
}

pub fn display_help() {
    log_version!();
    log_block_start!("check - Compute bay states without actuating");
    log_block_start!("Usage: baywake check [--at <RFC3339>]");
    log_block_start!("Options:");
    log_indented!("--at <time>  Evaluate at this instant, e.g. 2026-10-19T18:45:00+01:00");
    log_block_start!("Description:");
    log_indented!("Runs the directory refresh and booking evaluation of one cycle");
    log_indented!("and prints which bays would be powered. No packets are sent.");
    log_indented!("With --debug every qualifying booking and its window is listed.");
    log_end!();
}
