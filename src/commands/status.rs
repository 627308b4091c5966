//! Status command - display committed bay states via IPC.
//!
//! Reads the states the running daemon last committed, so the output always
//! matches what was actually actuated.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::bays::BayState;
use crate::common::utils::format_duration;
use crate::ipc::{IpcClient, Request};

/// Handle the status command.
///
/// # Arguments
/// * `json` - Print the raw `{ref: bool}` map instead of the table
pub fn handle_status_command(json: bool) -> Result<()> {
    let states = match IpcClient::connect() {
        Ok(client) => client.request(&Request::BayStates)?,
        Err(_) => {
            log_error_standalone!("baywake isn't running");
            println!("  Start it with 'baywake' or check the socket permissions");
            std::process::exit(crate::common::constants::EXIT_FAILURE);
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&states)?);
        return Ok(());
    }

    let states: BayState =
        serde_json::from_value(states).context("Daemon sent malformed bay states")?;
    let health = IpcClient::connect()
        .and_then(|client| client.request(&Request::Health))
        .and_then(|value| serde_json::from_value::<HealthView>(value).map_err(Into::into))
        .ok();

    display_human_readable(&states, health.as_ref());
    Ok(())
}

/// The parts of the daemon's health report the table shows.
#[derive(Debug, serde::Deserialize)]
struct HealthView {
    status: String,
    started_at: DateTime<Utc>,
    bays: usize,
    last_refresh_error: Option<String>,
    last_cycle_error: Option<String>,
    last_cycle: Option<Value>,
}

fn display_human_readable(states: &BayState, health: Option<&HealthView>) {
    if let Some(health) = health {
        let uptime = (Utc::now() - health.started_at).to_std().unwrap_or_default();
        println!("        Daemon: {} ({} bays)", health.status, health.bays);
        println!("        Uptime: {}", format_duration(uptime));
        if let Some(completed) = health
            .last_cycle
            .as_ref()
            .and_then(|cycle| cycle.get("completed_at"))
            .and_then(Value::as_str)
        {
            println!("    Last cycle: {completed}");
        }
        if let Some(error) = &health.last_cycle_error {
            println!("   Cycle error: {error}");
        }
        if let Some(error) = &health.last_refresh_error {
            println!("Refresh error: {error}");
        }
        println!();
    }

    if states.is_empty() {
        println!("No bay states committed yet");
        return;
    }

    let width = states.keys().map(String::len).max().unwrap_or(0);
    for (reference, active) in states {
        let label = if *active { "active" } else { "idle" };
        println!("{reference:>width$}  {label}");
    }

    let active = states.values().filter(|active| **active).count();
    println!();
    println!("{active} of {} bays active", states.len());
}

/// Display detailed help for the status command (help subcommand)
pub fn display_help() {
    log_version!();
    log_block_start!("status - Show committed bay states");
    log_block_start!("Usage: baywake status [--json]");
    log_block_start!("Options:");
    log_indented!("--json  Print the raw state map, e.g. {{\"BAY-1\": true}}");
    log_block_start!("Description:");
    log_indented!("Asks the running daemon for the bay states it last committed,");
    log_indented!("along with its health and the outcome of the last cycle.");
    log_end!();
}
